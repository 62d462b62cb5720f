use rowbind_convert::{ConverterRegistry, ShapeError, type_label};

use crate::error::AnalysisError;
use crate::plan::{Binding, Column, DecodingPlan, RecordDecoder, RowDecoder};
use crate::shape::{FieldDecl, RowShape, Shape};

/// Build the decoding plan for `S`.
///
/// Runs [`RowShape::describe`] and checks the resulting binding table:
///
///   1. The shape declares at least one field (sequence shapes excepted).
///   2. Each field has exactly one of index or name.
///   3. Each field's converter resolves through `registry`.
///   4. Each index tag parses as a non-negative integer.
///   5. Index-bound and name-bound fields are not mixed.
///
/// Checks 2–4 run for every field, in declaration order, and check 5
/// runs once at the end, so a single call reports every problem.
///
/// # Errors
///
/// [`AnalysisError`] carrying all problems found.
pub fn analyze<S: RowShape>(registry: &ConverterRegistry) -> Result<DecodingPlan<S>, AnalysisError> {
    let mut shape = Shape::<S>::new();
    S::describe(&mut shape);

    let decoder: Box<dyn RowDecoder<S>> = match shape.sequence {
        Some(bind) => bind(registry)?,
        None => Box::new(analyze_fields(shape.fields, registry)?),
    };
    let plan = DecodingPlan::new(decoder);
    tracing::debug!(
        shape = %type_label::<S>(),
        needs_header = plan.needs_header(),
        "decoding plan built"
    );
    Ok(plan)
}

fn analyze_fields<S: Default>(
    fields: Vec<FieldDecl<S>>,
    registry: &ConverterRegistry,
) -> Result<RecordDecoder<S>, AnalysisError> {
    if fields.is_empty() {
        return Err(ShapeError::NoFields.into());
    }

    let mut errors = Vec::new();
    let mut bindings = Vec::with_capacity(fields.len());
    let mut by_index = false;
    let mut by_name = false;

    for decl in fields {
        let field = decl.name;
        let tag = match (decl.index, decl.column) {
            (None, None) => {
                errors.push(ShapeError::MissingBinding { field });
                continue;
            }
            (Some(_), Some(_)) => {
                errors.push(ShapeError::ConflictingBinding { field });
                continue;
            }
            (Some(raw), None) => Err(raw),
            (None, Some(name)) => Ok(name),
        };

        let setter = match (decl.bind)(registry, decl.encoding.as_deref()) {
            Ok(setter) => Some(setter),
            Err(mut errs) => {
                errors.append(&mut errs);
                None
            }
        };

        let column = match tag {
            Ok(name) => {
                by_name = true;
                Column::Name(name)
            }
            Err(raw) => match raw.parse::<usize>() {
                Ok(index) => {
                    by_index = true;
                    Column::Index(index)
                }
                Err(_) => {
                    errors.push(ShapeError::InvalidIndex { field, raw });
                    continue;
                }
            },
        };

        if let Some(setter) = setter {
            tracing::trace!(
                field,
                ty = %decl.type_name,
                column = ?column,
                encoding = decl.encoding.as_deref(),
                "field bound"
            );
            bindings.push(Binding {
                field,
                column,
                setter,
            });
        }
    }

    if by_index && by_name {
        errors.push(ShapeError::MixedBindings);
    }
    if !errors.is_empty() {
        return Err(errors.into());
    }
    Ok(RecordDecoder::new(bindings))
}
