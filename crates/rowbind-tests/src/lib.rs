//! Shared helpers for the rowbind integration tests and benchmarks.

use std::path::PathBuf;
use std::sync::Once;

use rowbind_reader::{RowShape, Shape};

static INIT: Once = Once::new();

/// Install a `tracing` subscriber for the test binary. Safe to call from
/// every test; only the first call has an effect.
///
/// The filter comes from `RUST_LOG` and defaults to `warn`, so
/// `RUST_LOG=rowbind_reader=trace cargo test` shows every row read.
pub fn init_tracing() {
    INIT.call_once(|| {
        use tracing_subscriber::filter::EnvFilter;
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_test_writer()
            .init();
    });
}

/// Path of a file under `tests/fixtures/`.
#[must_use]
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// A roster row, bound by header name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Person {
    pub name: String,
    pub age: u32,
}

impl RowShape for Person {
    fn describe(shape: &mut Shape<Self>) {
        shape.field("Name", |p| &mut p.name).name("name");
        shape.field("Age", |p| &mut p.age).name("age");
    }
}

/// An integer and a float, bound by position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Measurement {
    pub int: i64,
    pub float: f32,
}

impl RowShape for Measurement {
    fn describe(shape: &mut Shape<Self>) {
        shape.field("Int", |m| &mut m.int).index(0);
        shape.field("Float", |m| &mut m.float).index(1);
    }
}
