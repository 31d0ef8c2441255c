use thiserror::Error;

/// Errors raised while registering, validating, ordering or executing actions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("action '{0}' not found in registry")]
    ActionNotFound(String),

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("required input '{input}' not provided [action: {action}]")]
    MissingInput { action: String, input: String },

    #[error("invalid input '{input}' [action: {action}]: {reason}")]
    InvalidInput {
        action: String,
        input: String,
        reason: String,
    },

    #[error("action '{action}' failed: {message}")]
    ActionFailed { action: String, message: String },

    #[error("dependency '{dependency}' failed [action: {action}]")]
    DependencyFailed { action: String, dependency: String },

    #[error("action '{action}' conflicts with '{other}'")]
    ConflictDetected { action: String, other: String },

    #[error("cyclic dependency detected: {}", .0.join(", "))]
    CyclicDependency(Vec<String>),

    #[error("action '{0}' appears more than once in the call set")]
    DuplicateCall(String),

    #[error("action task '{action}' aborted: {message}")]
    Join { action: String, message: String },
}

impl ActionError {
    /// Stable kind name used by the dispatch boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ActionNotFound(_) => "ActionNotFound",
            Self::InvalidAction(_) => "InvalidAction",
            Self::MissingInput { .. } => "MissingInput",
            Self::InvalidInput { .. } => "InvalidInput",
            Self::ActionFailed { .. } => "ActionFailed",
            Self::DependencyFailed { .. } => "DependencyFailed",
            Self::ConflictDetected { .. } => "ConflictDetected",
            Self::CyclicDependency(_) => "CyclicDependency",
            Self::DuplicateCall(_) => "DuplicateCall",
            Self::Join { .. } => "ActionFailed",
        }
    }

    /// True for errors detected before any action ran. The caller can fix the
    /// call set and retry without worrying about side effects.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ActionNotFound(_)
                | Self::ConflictDetected { .. }
                | Self::CyclicDependency(_)
                | Self::DuplicateCall(_)
                | Self::MissingInput { .. }
                | Self::InvalidInput { .. }
        )
    }

    /// Name of the action the error is attached to, if any.
    pub fn action(&self) -> Option<&str> {
        match self {
            Self::ActionNotFound(name) | Self::DuplicateCall(name) => Some(name),
            Self::MissingInput { action, .. }
            | Self::InvalidInput { action, .. }
            | Self::ActionFailed { action, .. }
            | Self::DependencyFailed { action, .. }
            | Self::ConflictDetected { action, .. }
            | Self::Join { action, .. } => Some(action),
            Self::InvalidAction(_) | Self::CyclicDependency(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cyclic_dependency_lists_members() {
        let err = ActionError::CyclicDependency(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "cyclic dependency detected: a, b");
        assert_eq!(err.kind(), "CyclicDependency");
        assert!(err.is_validation());
    }

    #[test]
    fn execution_errors_are_not_validation() {
        let err = ActionError::ActionFailed {
            action: "setup_db".into(),
            message: "boom".into(),
        };
        assert!(!err.is_validation());
        assert_eq!(err.action(), Some("setup_db"));
        assert_eq!(err.to_string(), "action 'setup_db' failed: boom");
    }
}
