//! Common result and error types for the strata passes.

/// The standard result type for fallible internal operations.
///
/// `Err` is reserved for broken pass invariants (a bug in strata). Problems
/// in the input circuit are reported through the diagnostic sink and the
/// pass reports failure through its own outcome type.
pub type StrataResult<T> = Result<T, InternalError>;

/// An internal compiler error: a lowering invariant was violated.
#[derive(Debug, thiserror::Error)]
#[error("internal compiler error: {message}")]
pub struct InternalError {
    /// Description of the violated invariant.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for InternalError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Whether a pass lowered every module.
///
/// User-facing problems have already been emitted as diagnostics when a
/// pass reports [`PassOutcome::Failure`]; the caller must not run the next
/// stage on the result.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PassOutcome {
    /// Every module was lowered.
    Success,
    /// At least one module failed to lower.
    Failure,
}

impl PassOutcome {
    /// `Failure` if `failed` is set.
    pub fn from_failed(failed: bool) -> Self {
        if failed {
            PassOutcome::Failure
        } else {
            PassOutcome::Success
        }
    }

    /// Returns `true` for [`PassOutcome::Success`].
    pub fn is_success(self) -> bool {
        self == PassOutcome::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let err = InternalError::new("value lowered twice");
        assert_eq!(
            format!("{err}"),
            "internal compiler error: value lowered twice"
        );
    }

    #[test]
    fn question_mark_converts_strings() {
        fn fails() -> StrataResult<()> {
            Err(format!("backedge {} resolved twice", 3))?
        }
        let err = fails().unwrap_err();
        assert_eq!(err.message, "backedge 3 resolved twice");
    }

    #[test]
    fn outcome_from_flag() {
        assert!(PassOutcome::from_failed(false).is_success());
        assert_eq!(PassOutcome::from_failed(true), PassOutcome::Failure);
    }
}
