#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rowbind_reader::{FieldCount, Options, Reader, RowShape, Shape};

// Fuzz target: whole sessions over arbitrary bytes and options.
//
// Catches panics in header resolution, row decoding and finalization,
// and checks that `done` keeps returning the same result.
#[derive(Debug, Arbitrary)]
struct Input {
    delimiter: u8,
    comment: Option<u8>,
    lenient_quotes: bool,
    flexible: bool,
    by_name: bool,
    data: Vec<u8>,
}

#[derive(Default)]
struct Named {
    id: u32,
    label: String,
    ok: bool,
}

impl RowShape for Named {
    fn describe(shape: &mut Shape<Self>) {
        shape.field("Id", |n| &mut n.id).name("id");
        shape.field("Label", |n| &mut n.label).name("label");
        shape.field("Ok", |n| &mut n.ok).name("ok");
    }
}

fuzz_target!(|input: Input| {
    let mut opts = Options::new().delimiter(input.delimiter);
    if let Some(comment) = input.comment {
        opts = opts.comment(comment);
    }
    if input.lenient_quotes {
        opts = opts.lenient_quotes();
    }
    if input.flexible {
        opts = opts.fields_per_record(FieldCount::Flexible);
    }

    let mut reader = Reader::new(std::io::Cursor::new(input.data), opts);
    let first = if input.by_name {
        let mut rows: Vec<Named> = Vec::new();
        reader.read_all(&mut rows).map_err(|e| e.to_string())
    } else {
        let mut rows: Vec<Vec<i16>> = Vec::new();
        reader.read_all(&mut rows).map_err(|e| e.to_string())
    };
    let again = reader.done().map_err(|e| e.to_string());
    assert_eq!(first, again);
});
