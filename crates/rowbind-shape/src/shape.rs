use std::fmt::Display;

use rowbind_convert::{ConverterRegistry, ShapeError, type_label};

use crate::error::AnalysisError;
use crate::plan::{RowDecoder, SequenceDecoder};

/// A type that rows can be decoded into.
///
/// Implementors describe themselves once, by filling in a [`Shape`]: a
/// binding table that ties each field to a column (by position or by
/// header name), optionally through a named encoding. The analyzer turns
/// that table into a [`DecodingPlan`](crate::DecodingPlan).
///
/// Every `Vec<T>` is already a row shape: each column of the row is
/// decoded with the converter for `T`.
///
/// # Example
///
/// ```rust
/// use rowbind_shape::{RowShape, Shape};
///
/// #[derive(Default)]
/// struct Entry {
///     name: String,
///     age: u32,
/// }
///
/// impl RowShape for Entry {
///     fn describe(shape: &mut Shape<Self>) {
///         shape.field("Name", |e| &mut e.name).index(0);
///         shape.field("Age", |e| &mut e.age).index(1);
///     }
/// }
/// ```
pub trait RowShape: Default + 'static {
    fn describe(shape: &mut Shape<Self>);
}

impl<T: 'static> RowShape for Vec<T> {
    fn describe(shape: &mut Shape<Self>) {
        shape.sequence();
    }
}

pub(crate) type FieldSetter<S> =
    Box<dyn Fn(&mut S, &str) -> anyhow::Result<()> + Send + Sync>;

type FieldBinder<S> = Box<
    dyn FnOnce(&ConverterRegistry, Option<&str>) -> Result<FieldSetter<S>, Vec<ShapeError>>,
>;

type SequenceBinder<S> =
    Box<dyn FnOnce(&ConverterRegistry) -> Result<Box<dyn RowDecoder<S>>, AnalysisError>>;

/// The binding table of one row shape, as declared by
/// [`RowShape::describe`].
///
/// Declarations are recorded as written; nothing is validated here. The
/// analyzer checks the whole table afterwards so it can report every
/// problem at once.
pub struct Shape<S> {
    pub(crate) fields: Vec<FieldDecl<S>>,
    pub(crate) sequence: Option<SequenceBinder<S>>,
}

impl<S: 'static> Shape<S> {
    pub(crate) fn new() -> Self {
        Self {
            fields: Vec::new(),
            sequence: None,
        }
    }

    /// Declare a field named `name`, reached through `access`.
    ///
    /// The returned declaration needs exactly one of
    /// [`index`](FieldDecl::index) or [`name`](FieldDecl::name).
    pub fn field<T, F>(&mut self, name: &'static str, access: F) -> &mut FieldDecl<S>
    where
        T: 'static,
        F: Fn(&mut S) -> &mut T + Send + Sync + 'static,
    {
        let bind: FieldBinder<S> =
            Box::new(move |registry: &ConverterRegistry, encoding: Option<&str>| {
                let conv = registry.resolve::<T>(name, encoding)?;
                let setter: FieldSetter<S> = Box::new(move |out: &mut S, raw: &str| {
                    *access(out) = conv.convert(raw)?;
                    Ok(())
                });
                Ok(setter)
            });
        self.fields.push(FieldDecl {
            name,
            type_name: type_label::<T>(),
            index: None,
            column: None,
            encoding: None,
            bind,
        });
        let last = self.fields.len() - 1;
        &mut self.fields[last]
    }
}

impl<T: 'static> Shape<Vec<T>> {
    /// Decode every column of the row with the converter for `T`.
    pub fn sequence(&mut self) {
        self.sequence = Some(Box::new(|registry: &ConverterRegistry| {
            let conv = registry.resolve_type::<T>().ok_or_else(|| {
                AnalysisError::from(ShapeError::UnsupportedElement {
                    type_name: type_label::<T>(),
                })
            })?;
            Ok(Box::new(SequenceDecoder::new(conv)) as Box<dyn RowDecoder<Vec<T>>>)
        }));
    }
}

/// One field of a [`Shape`]: its name, its column tag and its encoding.
pub struct FieldDecl<S> {
    pub(crate) name: &'static str,
    pub(crate) type_name: String,
    pub(crate) index: Option<String>,
    pub(crate) column: Option<String>,
    pub(crate) encoding: Option<String>,
    pub(crate) bind: FieldBinder<S>,
}

impl<S> FieldDecl<S> {
    /// Bind to a fixed column position.
    ///
    /// The tag is kept as text and parsed during analysis, so `index(2)`
    /// and `index("2")` are equivalent and a tag such as `"-1"` is reported
    /// as an analysis error rather than rejected here.
    pub fn index(&mut self, tag: impl Display) -> &mut Self {
        self.index = Some(tag.to_string());
        self
    }

    /// Bind to the column whose header text is `column`.
    pub fn name(&mut self, column: impl Into<String>) -> &mut Self {
        self.column = Some(column.into());
        self
    }

    /// Convert this field with the named encoding instead of the
    /// converter for its type.
    pub fn encoding(&mut self, encoding: impl Into<String>) -> &mut Self {
        self.encoding = Some(encoding.into());
        self
    }
}
