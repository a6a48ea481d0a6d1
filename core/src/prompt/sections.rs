//! Structured view over the flat system prompt document.
//!
//! The stored prompt is plain text where every line starting with `## `
//! opens a new section. The prompt builder edits a list of sections and
//! writes them back with [`serialize`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Prefix that opens a section header line.
pub const HEADER_MARKER: &str = "## ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSection {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub content: String,
}

impl PromptSection {
    fn placeholder(position: usize) -> Self {
        Self {
            id: position.to_string(),
            name: fallback_name(position),
            content: String::new(),
        }
    }
}

/// Result of asking a [`PromptDocument`] to drop a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoveOutcome {
    Removed,
    /// The document would have been left empty, nothing was removed.
    KeptLastSection,
    NotFound,
}

/// Split a flat prompt into sections.
///
/// Text before the first header is dropped. A document with no header at
/// all becomes a single `Section 1`. Never returns an empty list.
pub fn parse(document: &str) -> Vec<PromptSection> {
    let mut preamble: Vec<&str> = Vec::new();
    let mut chunks: Vec<(&str, Vec<&str>)> = Vec::new();

    for line in document.lines() {
        if let Some(title) = header_title(line) {
            chunks.push((title, Vec::new()));
        } else if let Some((_, body)) = chunks.last_mut() {
            body.push(line);
        } else {
            preamble.push(line);
        }
    }

    let mut sections = Vec::new();
    if chunks.is_empty() {
        let content = preamble.join("\n");
        let content = content.trim();
        if !content.is_empty() {
            sections.push(PromptSection {
                id: "1".to_string(),
                name: fallback_name(1),
                content: content.to_string(),
            });
        }
    } else {
        for (title, body) in chunks {
            let content = body.join("\n");
            let content = content.trim();
            if title.is_empty() && content.is_empty() {
                continue;
            }
            let position = sections.len() + 1;
            let name = if title.is_empty() {
                fallback_name(position)
            } else {
                title.to_string()
            };
            sections.push(PromptSection {
                id: position.to_string(),
                name,
                content: content.to_string(),
            });
        }
    }

    if sections.is_empty() {
        sections.push(PromptSection::placeholder(1));
    }
    sections
}

/// Render sections back into the flat document, in list order. Names are
/// collapsed onto one line so each stays a single header.
pub fn serialize(sections: &[PromptSection]) -> String {
    sections
        .iter()
        .map(|section| {
            let name = single_line(&section.name);
            let content = section.content.trim();
            if content.is_empty() {
                format!("{HEADER_MARKER}{name}")
            } else {
                format!("{HEADER_MARKER}{name}\n\n{content}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Title of a header line, or `None` for ordinary text. `###` is not a header.
fn header_title(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("##")?;
    if rest.is_empty() || rest.starts_with([' ', '\t']) {
        Some(rest.trim())
    } else {
        None
    }
}

fn fallback_name(position: usize) -> String {
    format!("Section {position}")
}

/// Editable, never-empty list of sections backing the prompt builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptDocument {
    sections: Vec<PromptSection>,
}

impl PromptDocument {
    pub fn parse(document: &str) -> Self {
        Self {
            sections: parse(document),
        }
    }

    /// Adopt sections supplied by an editor. Blank names get their
    /// positional fallback and an empty list becomes one placeholder.
    /// Missing or repeated ids are replaced with fresh ones past the
    /// highest numeric id, so every id stays unique.
    pub fn from_sections(sections: Vec<PromptSection>) -> Self {
        let mut next_id = max_numeric_id(&sections) + 1;
        let mut seen = HashSet::new();
        let mut sections: Vec<PromptSection> = sections
            .into_iter()
            .enumerate()
            .map(|(index, mut section)| {
                section.id = section.id.trim().to_string();
                if section.id.is_empty() || seen.contains(&section.id) {
                    section.id = next_id.to_string();
                    next_id += 1;
                }
                seen.insert(section.id.clone());
                section.name = single_line(&section.name);
                if section.name.is_empty() {
                    section.name = fallback_name(index + 1);
                }
                section
            })
            .collect();
        if sections.is_empty() {
            sections.push(PromptSection::placeholder(1));
        }
        Self { sections }
    }

    pub fn sections(&self) -> &[PromptSection] {
        &self.sections
    }

    pub fn into_sections(self) -> Vec<PromptSection> {
        self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&PromptSection> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Append a section with a fresh id (one past the highest numeric id).
    pub fn add_section(&mut self, name: Option<&str>) -> &PromptSection {
        let next_id = max_numeric_id(&self.sections) + 1;
        let name = name.map(single_line).filter(|n| !n.is_empty());
        let position = self.sections.len() + 1;
        self.sections.push(PromptSection {
            id: next_id.to_string(),
            name: name.unwrap_or_else(|| fallback_name(position)),
            content: String::new(),
        });
        &self.sections[self.sections.len() - 1]
    }

    /// Returns `false` when no section has that id. A blank name keeps the
    /// positional fallback.
    pub fn rename(&mut self, id: &str, name: &str) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        let name = single_line(name);
        self.sections[index].name = if name.is_empty() {
            fallback_name(index + 1)
        } else {
            name
        };
        true
    }

    pub fn set_content(&mut self, id: &str, content: &str) -> bool {
        match self.position(id) {
            Some(index) => {
                self.sections[index].content = content.to_string();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> RemoveOutcome {
        let Some(index) = self.position(id) else {
            return RemoveOutcome::NotFound;
        };
        if self.sections.len() == 1 {
            log::warn!("refusing to remove the only prompt section (id {id})");
            return RemoveOutcome::KeptLastSection;
        }
        self.sections.remove(index);
        RemoveOutcome::Removed
    }

    pub fn flatten(&self) -> String {
        serialize(&self.sections)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.id == id)
    }
}

fn max_numeric_id(sections: &[PromptSection]) -> u64 {
    sections
        .iter()
        .filter_map(|s| s.id.trim().parse::<u64>().ok())
        .max()
        .unwrap_or(0)
}

fn single_line(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}
