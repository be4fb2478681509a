use thiserror::Error;

pub type Result<T> = std::result::Result<T, BindwireError>;

/// Every way a bind, resolve or signal operation can fail.
///
/// All variants describe programming or configuration mistakes. They are
/// returned at the point of detection and never retried or defaulted.
#[derive(Debug, Error)]
pub enum BindwireError {
    #[error("Invalid binding for {contract}: {message}")]
    BindingType { contract: String, message: String },

    #[error("Unable to resolve {contract}{}: no matching binding", fmt_id(.identifier))]
    MissingBinding {
        contract: String,
        identifier: Option<String>,
    },

    #[error(
        "Ambiguous bindings for {contract}{}: found {} candidates [{}]",
        fmt_id(.identifier),
        .candidates.len(),
        .candidates.join(", ")
    )]
    AmbiguousBinding {
        contract: String,
        identifier: Option<String>,
        candidates: Vec<String>,
    },

    #[error("Circular dependency detected: {}", .chain.join(" -> "))]
    CyclicDependency { chain: Vec<String> },

    #[error("Failed to resolve {contract}{}: {message}", fmt_id(.identifier))]
    Resolution {
        contract: String,
        identifier: Option<String>,
        message: String,
    },

    #[error("Tried to add listener '{listener}' to signal '{signal}' but it has already been added")]
    DuplicateListener { signal: String, listener: String },

    #[error("Tried to remove listener '{listener}' from signal '{signal}' without adding it first")]
    ListenerNotFound { signal: String, listener: String },

    #[error(
        "Signal '{signal}' was fired but no handlers were attached and the signal is marked to require a handler"
    )]
    UnhandledSignal { signal: String },

    #[error("Failed to downcast type: {type_name}")]
    DowncastFailed { type_name: String },

    #[error("Container was dropped before {type_name} could be resolved")]
    ContainerDropped { type_name: String },
}

fn fmt_id(identifier: &Option<String>) -> String {
    match identifier {
        Some(id) => format!(" with identifier {}", id),
        None => String::new(),
    }
}

impl BindwireError {
    pub(crate) fn binding_type(contract: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BindingType {
            contract: contract.into(),
            message: message.into(),
        }
    }

    /// True for the error raised when nothing matched a lookup.
    pub fn is_missing_binding(&self) -> bool {
        matches!(self, Self::MissingBinding { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_contract_and_identifier() {
        let err = BindwireError::MissingBinding {
            contract: "dyn Clock".into(),
            identifier: Some("\"utc\"".into()),
        };
        assert_eq!(
            err.to_string(),
            "Unable to resolve dyn Clock with identifier \"utc\": no matching binding"
        );

        let err = BindwireError::AmbiguousBinding {
            contract: "dyn Clock".into(),
            identifier: None,
            candidates: vec!["A".into(), "B".into()],
        };
        assert_eq!(
            err.to_string(),
            "Ambiguous bindings for dyn Clock: found 2 candidates [A, B]"
        );
    }

    #[test]
    fn test_cycle_message_lists_chain() {
        let err = BindwireError::CyclicDependency {
            chain: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(err.to_string(), "Circular dependency detected: A -> B -> A");
    }
}
