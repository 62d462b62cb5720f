use std::fmt;
use std::sync::Arc;

use rowbind_convert::Converter;

use crate::error::PlanError;
use crate::shape::FieldSetter;

/// The operations every compiled row decoder supports.
///
/// Two implementations exist: [`RecordDecoder`] for shapes with a
/// binding table and [`SequenceDecoder`] for `Vec<T>` shapes.
pub(crate) trait RowDecoder<S>: Send + Sync {
    fn needs_header(&self) -> bool;
    fn consume_header(&mut self, header: &[&str]) -> Result<(), PlanError>;
    fn decode(&self, row: &[&str]) -> Result<S, PlanError>;
}

/// A reusable strategy for turning raw rows into values of `S`.
///
/// Built once per shape by [`analyze`](crate::analyze). A plan whose
/// fields are bound by header name starts unresolved and must see the
/// header row before it can decode anything:
///
/// ```text
///   Unresolved ──consume_header(ok)──▶ Resolved ──decode(row)──▶ S
///       │
///       └──────consume_header(missing names)──▶ Failed (permanent)
/// ```
///
/// Index-bound and sequence plans start `Resolved`.
pub struct DecodingPlan<S> {
    decoder: Box<dyn RowDecoder<S>>,
}

impl<S> DecodingPlan<S> {
    pub(crate) fn new(decoder: Box<dyn RowDecoder<S>>) -> Self {
        Self { decoder }
    }

    /// True while the plan still waits for its header row.
    #[must_use]
    pub fn needs_header(&self) -> bool {
        self.decoder.needs_header()
    }

    /// Resolve header names to column positions.
    ///
    /// When a name occurs in several columns the leftmost one wins. A
    /// resolved plan ignores further headers.
    ///
    /// # Errors
    ///
    /// [`PlanError::MissingColumns`] listing every bound name the header
    /// lacks. The plan stays failed and repeats this error on later calls.
    pub fn consume_header(&mut self, header: &[&str]) -> Result<(), PlanError> {
        self.decoder.consume_header(header)
    }

    /// Decode one row into a fresh value.
    ///
    /// # Errors
    ///
    /// - [`PlanError::IndexOutOfRange`] when a bound column is past the
    ///   end of `row`.
    /// - [`PlanError::Convert`] with the first converter failure; later
    ///   columns are not converted.
    /// - [`PlanError::Unresolved`] when the header was never consumed.
    pub fn decode(&self, row: &[&str]) -> Result<S, PlanError> {
        self.decoder.decode(row)
    }
}

impl<S> fmt::Debug for DecodingPlan<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodingPlan")
            .field("needs_header", &self.needs_header())
            .finish_non_exhaustive()
    }
}

/// Where a bound field reads its text from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Column {
    Index(usize),
    /// Header name, rewritten to `Index` once the header is consumed.
    Name(String),
}

pub(crate) struct Binding<S> {
    pub(crate) field: &'static str,
    pub(crate) column: Column,
    pub(crate) setter: FieldSetter<S>,
}

enum HeaderState {
    Pending,
    Resolved,
    Failed(Vec<String>),
}

/// Decoder for shapes declared field by field.
pub(crate) struct RecordDecoder<S> {
    bindings: Vec<Binding<S>>,
    header: HeaderState,
}

impl<S> RecordDecoder<S> {
    pub(crate) fn new(bindings: Vec<Binding<S>>) -> Self {
        let by_name = bindings
            .iter()
            .any(|b| matches!(b.column, Column::Name(_)));
        Self {
            bindings,
            header: if by_name {
                HeaderState::Pending
            } else {
                HeaderState::Resolved
            },
        }
    }
}

impl<S: Default> RowDecoder<S> for RecordDecoder<S> {
    fn needs_header(&self) -> bool {
        matches!(self.header, HeaderState::Pending)
    }

    fn consume_header(&mut self, header: &[&str]) -> Result<(), PlanError> {
        match &self.header {
            HeaderState::Resolved => return Ok(()),
            HeaderState::Failed(names) => {
                return Err(PlanError::MissingColumns {
                    names: names.clone(),
                });
            }
            HeaderState::Pending => {}
        }

        let mut missing: Vec<String> = Vec::new();
        let mut positions = Vec::with_capacity(self.bindings.len());
        for binding in &self.bindings {
            let pos = match &binding.column {
                Column::Index(i) => Some(*i),
                Column::Name(name) => {
                    let pos = header.iter().position(|col| *col == name.as_str());
                    if pos.is_none() && !missing.contains(name) {
                        missing.push(name.clone());
                    }
                    pos
                }
            };
            positions.push(pos);
        }

        if !missing.is_empty() {
            tracing::debug!(missing = ?missing, "header lacks bound columns");
            self.header = HeaderState::Failed(missing.clone());
            return Err(PlanError::MissingColumns { names: missing });
        }

        for (binding, pos) in self.bindings.iter_mut().zip(positions) {
            if let Some(pos) = pos {
                binding.column = Column::Index(pos);
            }
        }
        self.header = HeaderState::Resolved;
        tracing::debug!(columns = header.len(), "header resolved");
        Ok(())
    }

    fn decode(&self, row: &[&str]) -> Result<S, PlanError> {
        if !matches!(self.header, HeaderState::Resolved) {
            return Err(PlanError::Unresolved);
        }
        let mut out = S::default();
        for binding in &self.bindings {
            let Column::Index(index) = binding.column else {
                return Err(PlanError::Unresolved);
            };
            let raw = row.get(index).copied().ok_or(PlanError::IndexOutOfRange {
                index,
                len: row.len(),
            })?;
            (binding.setter)(&mut out, raw).map_err(|cause| {
                tracing::trace!(field = binding.field, column = index, "converter failed");
                PlanError::Convert {
                    column: index,
                    cause: Arc::new(cause),
                }
            })?;
        }
        Ok(out)
    }
}

/// Decoder for `Vec<T>` shapes: one converter applied to every column.
pub(crate) struct SequenceDecoder<T> {
    conv: Converter<T>,
}

impl<T> SequenceDecoder<T> {
    pub(crate) fn new(conv: Converter<T>) -> Self {
        Self { conv }
    }
}

impl<T> RowDecoder<Vec<T>> for SequenceDecoder<T> {
    fn needs_header(&self) -> bool {
        false
    }

    fn consume_header(&mut self, _header: &[&str]) -> Result<(), PlanError> {
        Ok(())
    }

    fn decode(&self, row: &[&str]) -> Result<Vec<T>, PlanError> {
        row.iter()
            .enumerate()
            .map(|(column, raw)| {
                self.conv.convert(raw).map_err(|cause| PlanError::Convert {
                    column,
                    cause: Arc::new(cause),
                })
            })
            .collect()
    }
}
