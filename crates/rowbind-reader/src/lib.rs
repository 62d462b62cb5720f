#![warn(clippy::pedantic)]

pub mod error;
pub mod options;
pub mod reader;
pub mod source;

pub use error::{Break, ConfigError, Error};
pub use options::{FieldCount, Options};
pub use reader::{Reader, VisitOutcome};
pub use source::ReadClose;

pub use rowbind_convert::{Converter, ConverterRegistry};
pub use rowbind_shape::{AnalysisError, FieldDecl, PlanError, RowShape, Shape};
