//! Built-in converters.
//!
//! Two read-only tables, both built once on first use:
//!
//! ```text
//! ┌─────────────────┬───────────────────────────────────────────────────┐
//! │ Table           │ Contents                                          │
//! ├─────────────────┼───────────────────────────────────────────────────┤
//! │ default table   │ TypeId → converter, used when a field names no    │
//! │                 │ encoding: every integer width (auto-base), f32,   │
//! │                 │ f64, bool, String                                 │
//! │ named encodings │ "deci" → base 10, "oct" → base 8, "hex" → base 16 │
//! │                 │ each available for every integer width            │
//! └─────────────────┴───────────────────────────────────────────────────┘
//! ```
//!
//! Auto-base integer parsing reads an optional sign, then a prefix:
//! `0x`/`0X` selects base 16, `0o`/`0O` base 8, `0b`/`0B` base 2, any other
//! leading `0` base 8, and no prefix base 10. `"010"` is therefore 8 and
//! `"021"` is 17. Auto-base input may also group digits with `_`; the
//! named encodings take plain digits only.

use std::any::TypeId;
use std::collections::HashMap;
use std::convert::Infallible;
use std::num::ParseIntError;
use std::sync::LazyLock;

use crate::converter::{Converter, ErasedConverter};
use crate::error::InvalidBool;

/// Integer types that can be parsed from text in an arbitrary base.
pub trait Integer: Sized + 'static {
    /// Parse `digits` in `radix`. Same contract as the inherent
    /// `from_str_radix` of the primitive integer types.
    ///
    /// # Errors
    ///
    /// Returns the standard library's [`ParseIntError`] unchanged.
    fn from_radix(digits: &str, radix: u32) -> Result<Self, ParseIntError>;
}

macro_rules! integer_types {
    ($($t:ty),* $(,)?) => {
        $(
            impl Integer for $t {
                fn from_radix(digits: &str, radix: u32) -> Result<Self, ParseIntError> {
                    <$t>::from_str_radix(digits, radix)
                }
            }
        )*

        fn insert_integer_defaults(table: &mut HashMap<TypeId, ErasedConverter>) {
            $(
                table.insert(
                    TypeId::of::<$t>(),
                    ErasedConverter::from_fn(parse_auto_base::<$t>),
                );
            )*
        }

        /// A fixed-radix converter for `target`, or `None` if `target` is not
        /// an integer type.
        #[must_use]
        pub fn radix_converter(target: TypeId, radix: u32) -> Option<ErasedConverter> {
            $(
                if target == TypeId::of::<$t>() {
                    return Some(ErasedConverter::from_fn(move |s: &str| <$t>::from_radix(s, radix)));
                }
            )*
            None
        }
    };
}

integer_types!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

/// Built-in named encodings and the base each one parses integers in.
pub const NAMED_ENCODINGS: &[(&str, u32)] = &[("deci", 10), ("oct", 8), ("hex", 16)];

static DEFAULTS: LazyLock<HashMap<TypeId, ErasedConverter>> = LazyLock::new(|| {
    let mut table = HashMap::new();
    insert_integer_defaults(&mut table);
    table.insert(
        TypeId::of::<f32>(),
        ErasedConverter::from_fn(|s: &str| s.parse::<f32>()),
    );
    table.insert(
        TypeId::of::<f64>(),
        ErasedConverter::from_fn(|s: &str| s.parse::<f64>()),
    );
    table.insert(TypeId::of::<bool>(), ErasedConverter::from_fn(parse_bool));
    table.insert(
        TypeId::of::<String>(),
        ErasedConverter::from_fn(|s: &str| Ok::<_, Infallible>(s.to_owned())),
    );
    table
});

/// The default converter for `T`, if `T` is one of the built-in scalars.
#[must_use]
pub fn default_converter<T: 'static>() -> Option<Converter<T>> {
    DEFAULTS.get(&TypeId::of::<T>())?.downcast::<T>()
}

/// A converter for `T` under the built-in encoding `name`.
///
/// Outer `None`: `name` is not a built-in encoding. Inner `None`: it is,
/// but it cannot produce a `T`.
#[must_use]
pub fn named_converter<T: 'static>(name: &str) -> Option<Option<Converter<T>>> {
    let (_, radix) = NAMED_ENCODINGS.iter().find(|(n, _)| *n == name)?;
    Some(radix_converter(TypeId::of::<T>(), *radix).and_then(|c| c.downcast::<T>()))
}

/// Parse an integer, choosing the base from its prefix.
///
/// `_` may separate digits, or follow a base prefix: `1_000`, `0x_ff`.
///
/// # Errors
///
/// [`ParseIntError`] for empty input, bad digits, misplaced `_`, or
/// overflow.
pub fn parse_auto_base<T: Integer>(s: &str) -> Result<T, ParseIntError> {
    if s.contains('_') {
        if !underscores_ok(s) {
            return T::from_radix(s, 10);
        }
        return parse_prefixed(&s.replace('_', ""));
    }
    parse_prefixed(s)
}

fn parse_prefixed<T: Integer>(s: &str) -> Result<T, ParseIntError> {
    let (negative, body) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let (radix, digits) = split_radix(body);
    if digits.starts_with(['+', '-']) {
        // A second sign is never valid; let the parser report it.
        return T::from_radix(s, 10);
    }
    if negative {
        T::from_radix(&format!("-{digits}"), radix)
    } else {
        T::from_radix(digits, radix)
    }
}

/// Every `_` sits between two digits, or between a base prefix and a
/// digit.
fn underscores_ok(s: &str) -> bool {
    #[derive(PartialEq)]
    enum Saw {
        Start,
        Digit,
        Underscore,
        Other,
    }

    let bytes = s.strip_prefix(['+', '-']).unwrap_or(s).as_bytes();
    let mut saw = Saw::Start;
    let mut rest = bytes;
    let mut hex = false;
    if let [b'0', prefix, tail @ ..] = bytes {
        if matches!(prefix.to_ascii_lowercase(), b'b' | b'o' | b'x') {
            hex = prefix.eq_ignore_ascii_case(&b'x');
            saw = Saw::Digit;
            rest = tail;
        }
    }
    for &b in rest {
        if b.is_ascii_digit() || (hex && b.is_ascii_hexdigit()) {
            saw = Saw::Digit;
        } else if b == b'_' {
            if saw != Saw::Digit {
                return false;
            }
            saw = Saw::Underscore;
        } else {
            if saw == Saw::Underscore {
                return false;
            }
            saw = Saw::Other;
        }
    }
    saw != Saw::Underscore
}

fn split_radix(s: &str) -> (u32, &str) {
    let bytes = s.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'0' {
        return (10, s);
    }
    match bytes[1] {
        b'x' | b'X' => (16, &s[2..]),
        b'o' | b'O' => (8, &s[2..]),
        b'b' | b'B' => (2, &s[2..]),
        _ => (8, &s[1..]),
    }
}

/// Parse a boolean from the usual spellings.
///
/// # Errors
///
/// [`InvalidBool`] for anything outside `1 t T TRUE true True` and
/// `0 f F FALSE false False`.
pub fn parse_bool(s: &str) -> Result<bool, InvalidBool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(InvalidBool {
            input: s.to_owned(),
        }),
    }
}
