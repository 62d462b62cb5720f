use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// A shared string-to-value conversion function for one target type.
///
/// Converters are pure: they receive the raw text of one column and
/// either produce a `T` or an error. The error is an [`anyhow::Error`] so
/// user-supplied converters can fail with any error type; the decoding
/// engine passes it through to the caller untouched.
///
/// Cloning a `Converter` is cheap (one `Arc` bump), which is how a single
/// registered function ends up shared by every row of every session that
/// uses it.
///
/// # Example
///
/// ```rust
/// use rowbind_convert::Converter;
///
/// let bracket = Converter::new(|s: &str| Ok::<_, std::convert::Infallible>(format!("[{s}]")));
/// assert_eq!(bracket.convert("x").unwrap(), "[x]");
/// ```
pub struct Converter<T> {
    func: Arc<dyn Fn(&str) -> anyhow::Result<T> + Send + Sync>,
}

impl<T> Converter<T> {
    /// Wrap a conversion function.
    ///
    /// The function's error type only has to convert into
    /// [`anyhow::Error`], so `str::parse`-style closures work directly.
    pub fn new<F, E>(func: F) -> Self
    where
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
        E: Into<anyhow::Error>,
    {
        Self {
            func: Arc::new(move |s: &str| func(s).map_err(Into::into)),
        }
    }

    /// Run the conversion on one raw column.
    ///
    /// # Errors
    ///
    /// Whatever the wrapped function reports, unchanged.
    pub fn convert(&self, raw: &str) -> anyhow::Result<T> {
        (self.func)(raw)
    }
}

impl<T> Clone for Converter<T> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
        }
    }
}

impl<T> fmt::Debug for Converter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Converter<{}>", type_label::<T>())
    }
}

/// A [`Converter`] with its target type erased.
///
/// The registry stores converters for many target types in one map, so
/// the concrete `Converter<T>` is kept behind `dyn Any` together with the
/// `TypeId` and a printable name of `T`. Getting the typed converter back
/// is a checked downcast; a failed downcast is how a registered encoding
/// is found to return the wrong type for a field.
#[derive(Clone)]
pub struct ErasedConverter {
    target: TypeId,
    target_name: String,
    inner: Arc<dyn Any + Send + Sync>,
}

impl ErasedConverter {
    pub fn new<T: 'static>(converter: Converter<T>) -> Self {
        Self {
            target: TypeId::of::<T>(),
            target_name: type_label::<T>(),
            inner: Arc::new(converter),
        }
    }

    /// Build directly from a function, see [`Converter::new`].
    pub fn from_fn<T, F, E>(func: F) -> Self
    where
        T: 'static,
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
        E: Into<anyhow::Error>,
    {
        Self::new(Converter::new(func))
    }

    #[must_use]
    pub fn target(&self) -> TypeId {
        self.target
    }

    /// Printable name of the produced type, without module paths.
    #[must_use]
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Recover the typed converter, or `None` if it produces another type.
    #[must_use]
    pub fn downcast<T: 'static>(&self) -> Option<Converter<T>> {
        self.inner.downcast_ref::<Converter<T>>().cloned()
    }
}

impl fmt::Debug for ErasedConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedConverter")
            .field("target", &self.target_name)
            .finish_non_exhaustive()
    }
}

/// `std::any::type_name` with every module path stripped.
///
/// `alloc::string::String` becomes `String`, and
/// `alloc::vec::Vec<chrono::naive::date::NaiveDate>` becomes
/// `Vec<NaiveDate>`. Used in error messages, where full paths are noise.
#[must_use]
pub fn type_label<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let mut out = String::with_capacity(full.len());
    // Start of the identifier currently being copied into `out`.
    let mut segment = 0;
    let mut chars = full.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            out.truncate(segment);
            continue;
        }
        out.push(c);
        if !(c.is_alphanumeric() || c == '_') {
            segment = out.len();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converter_passes_errors_through() {
        let conv = Converter::new(|s: &str| s.parse::<i32>());
        assert_eq!(conv.convert("42").unwrap(), 42);
        let err = conv.convert("x").unwrap_err();
        assert_eq!(err.to_string(), "invalid digit found in string");
    }

    #[test]
    fn erased_downcast_checks_target() {
        let erased = ErasedConverter::from_fn(|s: &str| s.parse::<f64>());
        assert_eq!(erased.target(), TypeId::of::<f64>());
        assert_eq!(erased.target_name(), "f64");
        assert!(erased.downcast::<f32>().is_none());
        let conv = erased.downcast::<f64>().unwrap();
        assert!((conv.convert("1.5").unwrap() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn type_label_strips_paths() {
        assert_eq!(type_label::<String>(), "String");
        assert_eq!(type_label::<u8>(), "u8");
        assert_eq!(type_label::<Vec<String>>(), "Vec<String>");
        assert_eq!(type_label::<Option<Vec<u8>>>(), "Option<Vec<u8>>");
    }
}
