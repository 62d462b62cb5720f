use std::io;
use std::sync::Arc;

use rowbind_shape::{AnalysisError, PlanError};

/// The terminal error of a decoding session.
///
/// A session stops at its first error and keeps it; every later call
/// reports the same value, which is why `Error` is `Clone` and wraps
/// non-clonable causes in an `Arc`.
///
/// Error hierarchy:
///
/// ```text
///   Error
///   ├── Config(ConfigError)       ← contradictory options
///   ├── Analysis(AnalysisError)   ← the row shape cannot be decoded
///   ├── Plan(PlanError)           ← header or row could not be decoded
///   ├── Csv(csv::Error)           ← tokenizer failure, text preserved
///   ├── FieldCount { line }       ← row length differs from Exact(n)
///   ├── Io(io::Error)             ← source could not be opened
///   ├── Close(io::Error)          ← source failed to close
///   └── Visitor(anyhow::Error)    ← visitor stopped with an error
/// ```
#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("{0}")]
    Csv(Arc<csv::Error>),

    #[error("record on line {line}: wrong number of fields")]
    FieldCount { line: u64 },

    #[error("{0}")]
    Io(Arc<io::Error>),

    #[error("{0}")]
    Close(Arc<io::Error>),

    /// Any error a visitor returned other than [`Break`].
    #[error("{0}")]
    Visitor(Arc<anyhow::Error>),
}

impl Error {
    /// The error raised by user code: a converter that rejected a column,
    /// or a visitor that stopped iteration.
    #[must_use]
    pub fn cause(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Plan(err) => err.cause(),
            Self::Visitor(err) => Some(&**err),
            _ => None,
        }
    }

    /// Downcast [`cause`](Self::cause) to a concrete error type.
    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        self.cause().and_then(anyhow::Error::downcast_ref::<E>)
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Self::Csv(Arc::new(err))
    }
}

/// Options that cannot be used together.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("You can not set both AutoIndex and AutoName")]
    AutoIndexAndAutoName,
}

/// Returned by a visitor to stop iteration without reporting an error.
///
/// ```rust
/// use rowbind_reader::{Break, Options, Reader};
///
/// let mut reader = Reader::new("1\n2\n3\n".as_bytes(), Options::default());
/// let mut seen = Vec::new();
/// reader
///     .for_each(|row: Vec<i32>| {
///         seen.push(row[0]);
///         if row[0] == 2 { Err(Break) } else { Ok(()) }
///     })
///     .unwrap();
/// assert_eq!(seen, [1, 2]);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, thiserror::Error)]
#[error("break")]
pub struct Break;
