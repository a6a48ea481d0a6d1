use thiserror::Error;

use crate::agents::ProviderKind;

/// Terminal outcomes of a gateway invocation that cross the API boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("The AI assistant is not configured yet. An administrator needs to add an OpenAI or Anthropic API key.")]
    ConfigurationMissing,
    #[error("{} did not return a response. Please try again later.", .provider.display_name())]
    ProviderCallFailed { provider: ProviderKind },
    #[error("{}", all_failed_message(.attempted))]
    AllProvidersFailed { attempted: Vec<ProviderKind> },
    #[error("{0}")]
    InputInvalid(String),
}

impl GatewayError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigurationMissing => "AI-1001",
            Self::ProviderCallFailed { .. } => "AI-1002",
            Self::AllProvidersFailed { .. } => "AI-1003",
            Self::InputInvalid(_) => "AI-1004",
        }
    }
    pub fn explain(&self) -> &'static str {
        match self {
            Self::ConfigurationMissing => "No provider credential is stored in site settings.",
            Self::ProviderCallFailed { .. } => "The only eligible provider failed and no fallback applies.",
            Self::AllProvidersFailed { .. } => "Every configured provider was attempted and failed.",
            Self::InputInvalid(_) => "The request was rejected before any provider was called.",
        }
    }
}

fn all_failed_message(attempted: &[ProviderKind]) -> String {
    match attempted {
        [only] => format!(
            "{} did not return a response and no fallback provider is configured. Please try again later.",
            only.display_name()
        ),
        _ => {
            let names: Vec<&str> = attempted.iter().map(|p| p.display_name()).collect();
            format!(
                "All configured AI providers ({}) failed to respond. Please try again later.",
                names.join(", ")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_failed_names_a_single_attempt() {
        let err = GatewayError::AllProvidersFailed {
            attempted: vec![ProviderKind::OpenAi],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("OpenAI did not return a response"));
        assert!(msg.contains("no fallback provider"));
    }

    #[test]
    fn all_failed_names_both_attempts() {
        let err = GatewayError::AllProvidersFailed {
            attempted: vec![ProviderKind::OpenAi, ProviderKind::Anthropic],
        };
        assert!(err.to_string().contains("(OpenAI, Anthropic)"));
        assert_eq!(err.code(), "AI-1003");
    }
}
