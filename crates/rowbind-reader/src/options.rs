use rowbind_convert::ConverterRegistry;

use crate::error::ConfigError;

/// Configuration for a decoding session.
///
/// Every option is optional; `Options::default()` reads comma-separated
/// text with RFC 4180 quoting, no comment lines, and uniform row length.
///
/// ```text
/// ┌───────────────────┬──────────────────────────────────────────────────┐
/// │ Field             │ Purpose                                          │
/// ├───────────────────┼──────────────────────────────────────────────────┤
/// │ delimiter         │ Field separator byte, `,` when unset             │
/// │ comment           │ Lines starting with this byte are skipped        │
/// │ lenient_quotes    │ Tolerate stray quotes inside unquoted fields     │
/// │ fields_per_record │ Row length policy, `Uniform` when unset          │
/// │ converters        │ Named encodings and per-type decoder overrides   │
/// │ auto_index        │ Reserved, exclusive with `auto_name`             │
/// │ auto_name         │ Reserved, exclusive with `auto_index`            │
/// └───────────────────┴──────────────────────────────────────────────────┘
/// ```
///
/// Several option sets combine with [`merge`](Self::merge).
#[derive(Clone, Debug, Default)]
pub struct Options {
    pub delimiter: Option<u8>,

    /// Comment lines are invisible to the session: they are neither
    /// decoded nor counted by [`line_number`](crate::Reader::line_number).
    pub comment: Option<u8>,

    /// Quoted fields are honoured either way. The tokenizer already keeps
    /// a quote that appears inside an unquoted field as plain content, so
    /// this switch is carried through `merge` but changes no row.
    pub lenient_quotes: bool,

    pub fields_per_record: Option<FieldCount>,

    /// User converters. Encodings are selected by name from a field
    /// declaration; type decoders replace the built-in converter for
    /// every field of their type.
    pub converters: ConverterRegistry,

    pub auto_index: bool,
    pub auto_name: bool,
}

/// How many fields each row must have.
///
/// ```text
///   Uniform   every row as long as the first one
///   Flexible  any length
///   Exact(n)  exactly n fields
///
/// A row that breaks `Uniform` or `Exact(n)` fails the session with
/// "record on line L: wrong number of fields".
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FieldCount {
    #[default]
    Uniform,
    Flexible,
    Exact(usize),
}

impl Options {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    #[must_use]
    pub fn comment(mut self, comment: u8) -> Self {
        self.comment = Some(comment);
        self
    }

    #[must_use]
    pub fn lenient_quotes(mut self) -> Self {
        self.lenient_quotes = true;
        self
    }

    #[must_use]
    pub fn fields_per_record(mut self, count: FieldCount) -> Self {
        self.fields_per_record = Some(count);
        self
    }

    /// Register a named encoding producing `T`.
    #[must_use]
    pub fn encoding<T, F, E>(mut self, name: impl Into<String>, func: F) -> Self
    where
        T: 'static,
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
        E: Into<anyhow::Error>,
    {
        self.converters.register_encoding(name, func);
        self
    }

    /// Replace the converter for every field of type `T`.
    #[must_use]
    pub fn type_decoder<T, F, E>(mut self, func: F) -> Self
    where
        T: 'static,
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
        E: Into<anyhow::Error>,
    {
        self.converters.register_type(func);
        self
    }

    #[must_use]
    pub fn auto_index(mut self) -> Self {
        self.auto_index = true;
        self
    }

    #[must_use]
    pub fn auto_name(mut self) -> Self {
        self.auto_name = true;
        self
    }

    /// Combine option sets left to right.
    ///
    /// A later `Some` or `true` replaces an earlier value; converters are
    /// merged name by name and type by type, later registrations winning.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if the merged set is contradictory.
    pub fn merge<'a>(options: impl IntoIterator<Item = &'a Options>) -> Result<Self, ConfigError> {
        let mut merged = Self::default();
        for opts in options {
            merged.merge_from(opts);
        }
        merged.validate()?;
        Ok(merged)
    }

    fn merge_from(&mut self, other: &Options) {
        if other.delimiter.is_some() {
            self.delimiter = other.delimiter;
        }
        if other.comment.is_some() {
            self.comment = other.comment;
        }
        if other.fields_per_record.is_some() {
            self.fields_per_record = other.fields_per_record;
        }
        self.lenient_quotes |= other.lenient_quotes;
        self.auto_index |= other.auto_index;
        self.auto_name |= other.auto_name;
        self.converters.extend(&other.converters);
    }

    /// # Errors
    ///
    /// [`ConfigError::AutoIndexAndAutoName`] when both switches are set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auto_index && self.auto_name {
            return Err(ConfigError::AutoIndexAndAutoName);
        }
        Ok(())
    }

    pub(crate) fn field_count(&self) -> FieldCount {
        self.fields_per_record.unwrap_or_default()
    }

    /// Tokenizer settings. The session reads the header row itself, so
    /// the tokenizer never treats the first row specially.
    pub(crate) fn csv_builder(&self) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .has_headers(false)
            .delimiter(self.delimiter.unwrap_or(b','))
            .comment(self.comment)
            .flexible(true);
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = Options::default();
        assert_eq!(opts.field_count(), FieldCount::Uniform);
        assert!(opts.converters.is_empty());
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn merge_later_values_win() {
        let first = Options::new().delimiter(b';').comment(b'#');
        let second = Options::new()
            .delimiter(b'\t')
            .fields_per_record(FieldCount::Flexible);
        let merged = Options::merge([&first, &second]).unwrap();
        assert_eq!(merged.delimiter, Some(b'\t'));
        assert_eq!(merged.comment, Some(b'#'));
        assert_eq!(merged.field_count(), FieldCount::Flexible);
    }

    #[test]
    fn merge_keeps_flags_once_set() {
        let first = Options::new().lenient_quotes().auto_index();
        let merged = Options::merge([&first, &Options::new()]).unwrap();
        assert!(merged.lenient_quotes);
        assert!(merged.auto_index);
    }

    #[test]
    fn merge_combines_converters() {
        let first = Options::new()
            .encoding("a", |s: &str| s.parse::<i32>())
            .encoding("b", |s: &str| s.parse::<i32>());
        let second = Options::new().encoding("c", |s: &str| s.parse::<u8>());
        let merged = Options::merge([&first, &second]).unwrap();
        for name in ["a", "b", "c"] {
            assert!(merged.converters.has_encoding(name), "missing {name}");
        }
    }

    #[test]
    fn auto_index_and_auto_name_are_exclusive() {
        let err = Options::merge([&Options::new().auto_index(), &Options::new().auto_name()])
            .unwrap_err();
        assert_eq!(err, ConfigError::AutoIndexAndAutoName);
        assert_eq!(err.to_string(), "You can not set both AutoIndex and AutoName");
    }
}
