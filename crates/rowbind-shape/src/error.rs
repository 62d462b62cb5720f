use std::sync::Arc;

use rowbind_convert::ShapeError;

/// Every problem found while analyzing one row shape.
///
/// The analyzer never stops at the first bad field. It walks the whole
/// binding table and reports all problems together, one per line, in
/// field declaration order. A shape-wide problem (mixed binding modes)
/// comes last.
///
/// ```text
///   Please specify name or index to the struct field: Name
///   Failed to parse index of field Age: "hello"
///   Fields with name and fields with index are mixed
/// ```
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{}", join_lines(.errors))]
pub struct AnalysisError {
    errors: Vec<ShapeError>,
}

impl AnalysisError {
    /// The individual problems, in the order they were found.
    #[must_use]
    pub fn errors(&self) -> &[ShapeError] {
        &self.errors
    }
}

impl From<Vec<ShapeError>> for AnalysisError {
    fn from(errors: Vec<ShapeError>) -> Self {
        Self { errors }
    }
}

impl From<ShapeError> for AnalysisError {
    fn from(error: ShapeError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

fn join_lines(errors: &[ShapeError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Errors raised by a [`DecodingPlan`](crate::DecodingPlan) once it is
/// built: header resolution failures and per-row failures.
///
/// ```text
/// ┌─────────────────┬──────────────────────────────────────────────────┐
/// │ Variant         │ Cause                                            │
/// ├─────────────────┼──────────────────────────────────────────────────┤
/// │ MissingColumns  │ Named columns absent from the header row         │
/// │ IndexOutOfRange │ Bound column index is past the end of the row    │
/// │ Convert         │ A converter rejected the column text             │
/// │ Unresolved      │ Row decoded before the header was consumed       │
/// └─────────────────┴──────────────────────────────────────────────────┘
/// ```
///
/// `Clone` so a session can hand the same terminal error out more than
/// once; converter errors are shared behind an `Arc` for that reason.
#[derive(Clone, Debug, thiserror::Error)]
pub enum PlanError {
    /// The header row lacks one or more names the shape binds to.
    /// Names are listed in field declaration order.
    #[error("{} did not appear in the first line", .names.join(", "))]
    MissingColumns { names: Vec<String> },

    #[error("Accessed index {index} though the size of the row is {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// A converter failed. Displays exactly as the converter's own error.
    #[error("{cause}")]
    Convert {
        column: usize,
        cause: Arc<anyhow::Error>,
    },

    #[error("row decoded before the header row was consumed")]
    Unresolved,
}

impl PlanError {
    /// The converter's error, for [`Convert`](Self::Convert).
    #[must_use]
    pub fn cause(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Convert { cause, .. } => Some(&**cause),
            _ => None,
        }
    }
}
