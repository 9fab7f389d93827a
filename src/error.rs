use std::fmt;

use crate::value::{Kind, ObjId};

/// Errors raised by the runtime.
///
/// Bookkeeping failures (`StackUnderflow`, `DoubleFree`, `OutOfMemory`) are
/// fatal and propagate to the caller of `Machine::evaluate_top_level`. The
/// value-level kinds are recovered where they occur: the machine logs them,
/// records them, and substitutes `Void`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LispError {
    /// Pop from an empty operand stack.
    StackUnderflow,

    /// Freeing a slot that holds no object.
    DoubleFree(ObjId),

    /// No free slot left even after a collection pass.
    OutOfMemory,

    /// Accessor or operation invoked on the wrong variant.
    UnsupportedOperation { op: &'static str, kind: Kind },

    /// Builtin called with the wrong number of arguments.
    ArityMismatch {
        name: String,
        expected: &'static str,
        got: usize,
    },

    /// Symbol with no binding in the global environment.
    UnboundVariable(String),

    /// Argument chain not terminated by nil or void.
    MalformedList,

    /// Reader error.
    ReadError(String),

    /// Handle to an empty slot, or other broken runtime bookkeeping.
    Internal(String),
}

impl LispError {
    /// Fatal errors abort the current top-level evaluation and are not
    /// replaced by a placeholder value.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LispError::StackUnderflow
                | LispError::DoubleFree(_)
                | LispError::OutOfMemory
                | LispError::Internal(_)
        )
    }
}

impl fmt::Display for LispError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LispError::StackUnderflow => write!(f, "stack underflow"),
            LispError::DoubleFree(id) => write!(f, "double free of slot {}", id.0),
            LispError::OutOfMemory => write!(f, "out of memory"),
            LispError::UnsupportedOperation { op, kind } => {
                write!(f, "{} does not have {}", kind, op)
            }
            LispError::ArityMismatch {
                name,
                expected,
                got,
            } => write!(
                f,
                "{} expects {} argument(s), got {}",
                name, expected, got
            ),
            LispError::UnboundVariable(name) => write!(f, "variable {} not found", name),
            LispError::MalformedList => write!(f, "malformed argument list"),
            LispError::ReadError(msg) => write!(f, "read error: {}", msg),
            LispError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for LispError {}

pub type LispResult<T> = Result<T, LispError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bookkeeping_errors_are_fatal() {
        assert!(LispError::StackUnderflow.is_fatal());
        assert!(LispError::DoubleFree(ObjId(3)).is_fatal());
        assert!(LispError::OutOfMemory.is_fatal());
    }

    #[test]
    fn value_errors_are_recoverable() {
        let errs = [
            LispError::UnsupportedOperation {
                op: "car",
                kind: Kind::Integer,
            },
            LispError::ArityMismatch {
                name: "car".into(),
                expected: "1",
                got: 2,
            },
            LispError::UnboundVariable("x".into()),
            LispError::MalformedList,
        ];
        for e in &errs {
            assert!(!e.is_fatal(), "{} should be recoverable", e);
        }
    }

    #[test]
    fn display_names_the_variant() {
        let e = LispError::UnsupportedOperation {
            op: "cdr",
            kind: Kind::Bool,
        };
        assert_eq!(e.to_string(), "Bool does not have cdr");
    }
}
