#![warn(clippy::pedantic)]

pub mod analyze;
pub mod error;
pub mod plan;
pub mod shape;

pub use analyze::analyze;
pub use error::{AnalysisError, PlanError};
pub use plan::DecodingPlan;
pub use shape::{FieldDecl, RowShape, Shape};
