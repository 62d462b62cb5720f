use std::any::TypeId;
use std::collections::HashMap;

use crate::builtin;
use crate::converter::{Converter, ErasedConverter, type_label};
use crate::error::ShapeError;

/// User overrides layered over the built-in converter tables.
///
/// Resolution order for a field of type `T`:
///
/// ```text
///   field names an encoding?
///   ├── yes ── user encoding registered under that name?
///   │          ├── yes ── returns T?  yes → use it
///   │          │                      no  → EncodingTypeMismatch, fall back ─┐
///   │          └── no ─── built-in encoding (deci/oct/hex)?                  │
///   │                     ├── yes ── supports T? yes → use it                │
///   │                     │                      no  → UnsupportedEncoding, ─┤
///   │                     │                            fall back             │
///   │                     └── no ─── UndefinedEncoding (stop)                │
///   └── no ───────────────────────────────────────────────────────────────── ▼
///                        user type override for T? → use it
///                        built-in default for T?   → use it
///                        otherwise                 → UnsupportedType
/// ```
///
/// Every converter stored here was registered through a typed function
/// (`Fn(&str) -> Result<T, E>`), so argument and return arity are checked
/// by the compiler. The one check left for analysis time is whether an
/// encoding's result type matches the field it is attached to.
#[derive(Clone, Debug, Default)]
pub struct ConverterRegistry {
    encodings: HashMap<String, ErasedConverter>,
    types: HashMap<TypeId, ErasedConverter>,
}

impl ConverterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `func` under the encoding `name`, replacing any previous
    /// converter with that name. User encodings shadow the built-in ones.
    pub fn register_encoding<T, F, E>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        T: 'static,
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
        E: Into<anyhow::Error>,
    {
        self.insert_encoding(name, ErasedConverter::from_fn(func))
    }

    /// Register `func` as the converter for every field of type `T` that
    /// names no encoding. Also applies to `Vec<T>` row shapes.
    pub fn register_type<T, F, E>(&mut self, func: F) -> &mut Self
    where
        T: 'static,
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
        E: Into<anyhow::Error>,
    {
        self.insert_type(ErasedConverter::from_fn(func))
    }

    pub fn insert_encoding(&mut self, name: impl Into<String>, conv: ErasedConverter) -> &mut Self {
        self.encodings.insert(name.into(), conv);
        self
    }

    /// Store `conv` as the type override for the type it produces.
    pub fn insert_type(&mut self, conv: ErasedConverter) -> &mut Self {
        self.types.insert(conv.target(), conv);
        self
    }

    /// Merge `other` into `self` key by key; entries of `other` win.
    pub fn extend(&mut self, other: &ConverterRegistry) {
        self.encodings
            .extend(other.encodings.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.types
            .extend(other.types.iter().map(|(k, v)| (*k, v.clone())));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.encodings.is_empty() && self.types.is_empty()
    }

    #[must_use]
    pub fn has_encoding(&self, name: &str) -> bool {
        self.encodings.contains_key(name)
    }

    /// Resolve the converter for `field` of type `T`.
    ///
    /// # Errors
    ///
    /// Every problem found for this field, in the order it was found. A
    /// mismatched or unsupported encoding still falls back to the type's
    /// converter, so the error list names the encoding problem even when
    /// the fallback would have worked.
    pub fn resolve<T: 'static>(
        &self,
        field: &'static str,
        encoding: Option<&str>,
    ) -> Result<Converter<T>, Vec<ShapeError>> {
        let mut errors = Vec::new();

        if let Some(name) = encoding {
            match self.resolve_encoding::<T>(field, name) {
                Ok(conv) => return Ok(conv),
                Err(err @ ShapeError::UndefinedEncoding { .. }) => return Err(vec![err]),
                Err(err) => errors.push(err),
            }
        }

        match self.resolve_type::<T>() {
            Some(conv) if errors.is_empty() => Ok(conv),
            Some(_) => Err(errors),
            None => {
                errors.push(ShapeError::UnsupportedType {
                    field,
                    type_name: type_label::<T>(),
                });
                Err(errors)
            }
        }
    }

    /// The type override for `T`, or else the built-in default.
    #[must_use]
    pub fn resolve_type<T: 'static>(&self) -> Option<Converter<T>> {
        self.types
            .get(&TypeId::of::<T>())
            .and_then(ErasedConverter::downcast::<T>)
            .or_else(builtin::default_converter::<T>)
    }

    fn resolve_encoding<T: 'static>(
        &self,
        field: &'static str,
        name: &str,
    ) -> Result<Converter<T>, ShapeError> {
        if let Some(user) = self.encodings.get(name) {
            return user
                .downcast::<T>()
                .ok_or_else(|| ShapeError::EncodingTypeMismatch {
                    field,
                    field_type: type_label::<T>(),
                    encoding: name.to_owned(),
                    returns: user.target_name().to_owned(),
                });
        }
        match builtin::named_converter::<T>(name) {
            Some(Some(conv)) => Ok(conv),
            Some(None) => Err(ShapeError::UnsupportedEncoding {
                encoding: name.to_owned(),
                type_name: type_label::<T>(),
            }),
            None => Err(ShapeError::UndefinedEncoding {
                encoding: name.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Celsius(f64);

    fn celsius(s: &str) -> anyhow::Result<Celsius> {
        let raw = s
            .strip_suffix("C")
            .ok_or_else(|| anyhow::anyhow!("missing unit in {s:?}"))?;
        Ok(Celsius(raw.parse()?))
    }

    // ── Without overrides ────────────────────────────────────────────────

    #[test]
    fn defaults_without_encoding() {
        let reg = ConverterRegistry::new();
        let conv = reg.resolve::<i32>("Count", None).unwrap();
        assert_eq!(conv.convert("0x20").unwrap(), 32);
    }

    #[test]
    fn builtin_encoding() {
        let reg = ConverterRegistry::new();
        let conv = reg.resolve::<u32>("Mask", Some("hex")).unwrap();
        assert_eq!(conv.convert("ff").unwrap(), 255);
    }

    #[test]
    fn unsupported_type_names_field() {
        let reg = ConverterRegistry::new();
        let errs = reg.resolve::<Celsius>("Temp", None).unwrap_err();
        assert_eq!(
            errs,
            vec![ShapeError::UnsupportedType {
                field: "Temp",
                type_name: "Celsius".into(),
            }]
        );
        assert_eq!(errs[0].to_string(), "Unexpected field type for Temp: Celsius");
    }

    #[test]
    fn undefined_encoding_stops_resolution() {
        let reg = ConverterRegistry::new();
        let errs = reg.resolve::<Celsius>("Temp", Some("kelvin")).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].to_string(), "Encoding \"kelvin\" is not defined");
    }

    #[test]
    fn builtin_encoding_rejects_non_integer() {
        let reg = ConverterRegistry::new();
        let errs = reg.resolve::<f64>("Ratio", Some("oct")).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].to_string(), "Encoding \"oct\" does not support f64");
    }

    // ── With overrides ───────────────────────────────────────────────────

    #[test]
    fn user_encoding_and_type_override() {
        let mut reg = ConverterRegistry::new();
        reg.register_encoding("celsius", celsius)
            .register_type(|s: &str| celsius(&format!("{s}C")));

        let by_name = reg.resolve::<Celsius>("Temp", Some("celsius")).unwrap();
        assert_eq!(by_name.convert("21.5C").unwrap(), Celsius(21.5));
        assert!(by_name.convert("21.5").is_err());

        let by_type = reg.resolve::<Celsius>("Temp", None).unwrap();
        assert_eq!(by_type.convert("3").unwrap(), Celsius(3.0));
    }

    #[test]
    fn user_encoding_shadows_builtin() {
        let mut reg = ConverterRegistry::new();
        reg.register_encoding("hex", |s: &str| i32::from_str_radix(s.trim_start_matches("0x"), 16));
        let conv = reg.resolve::<i32>("Id", Some("hex")).unwrap();
        assert_eq!(conv.convert("0x10").unwrap(), 16);
    }

    #[test]
    fn encoding_type_mismatch_reported_once() {
        let mut reg = ConverterRegistry::new();
        reg.register_encoding("ratio", |s: &str| s.parse::<f32>());
        let errs = reg.resolve::<String>("F3", Some("ratio")).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(
            errs[0].to_string(),
            "The type of field \"F3\" is String, but enc \"ratio\" returns \"f32\""
        );
    }

    #[test]
    fn mismatch_and_unsupported_fallback_both_reported() {
        let mut reg = ConverterRegistry::new();
        reg.register_encoding("ratio", |s: &str| s.parse::<f32>());
        let errs = reg.resolve::<Celsius>("Temp", Some("ratio")).unwrap_err();
        assert_eq!(errs.len(), 2);
        assert!(matches!(errs[0], ShapeError::EncodingTypeMismatch { .. }));
        assert!(matches!(errs[1], ShapeError::UnsupportedType { .. }));
    }

    #[test]
    fn type_override_replaces_default() {
        let mut reg = ConverterRegistry::new();
        reg.register_type(|s: &str| s.parse::<i32>().map(|v| v * 100));
        assert_eq!(reg.resolve_type::<i32>().unwrap().convert("3").unwrap(), 300);
        assert_eq!(reg.resolve_type::<i64>().unwrap().convert("3").unwrap(), 3);
    }

    #[test]
    fn extend_merges_key_wise() {
        let mut base = ConverterRegistry::new();
        base.register_encoding("a", |s: &str| s.parse::<i32>())
            .register_encoding("b", |s: &str| s.parse::<i32>());
        let mut later = ConverterRegistry::new();
        later.register_encoding("b", |s: &str| s.parse::<i32>().map(|v| -v));

        base.extend(&later);
        assert!(base.has_encoding("a"));
        let b = base.resolve::<i32>("B", Some("b")).unwrap();
        assert_eq!(b.convert("4").unwrap(), -4);
    }
}
