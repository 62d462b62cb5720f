#![warn(clippy::pedantic)]

pub mod builtin;
pub mod converter;
pub mod error;
pub mod registry;

pub use converter::{Converter, ErasedConverter, type_label};
pub use error::{InvalidBool, ShapeError};
pub use registry::ConverterRegistry;
