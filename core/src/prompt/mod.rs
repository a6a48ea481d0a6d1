//! Editable system prompt, stored flat and edited as named sections.

pub mod sections;

pub use sections::{parse, serialize, PromptDocument, PromptSection, RemoveOutcome, HEADER_MARKER};
