//! Resolving name-bound shapes against the header row.

use rowbind_reader::{Error, Options, PlanError, Reader, RowShape, Shape};
use rowbind_tests::{Person, init_tracing};

fn collect<S: RowShape>(input: &'static str) -> Result<Vec<S>, Error> {
    let mut reader = Reader::new(input.as_bytes(), Options::default());
    let mut rows = Vec::new();
    reader.read_all(&mut rows).map(|()| rows)
}

#[test]
fn header_order_does_not_change_rows() {
    init_tracing();
    let by_name_first = collect::<Person>("name,age\nAlice,10\nBob,20\n").unwrap();
    let by_age_first = collect::<Person>("age,name\n10,Alice\n20,Bob\n").unwrap();
    assert_eq!(by_name_first, by_age_first);
    assert_eq!(by_name_first[1], Person { name: "Bob".into(), age: 20 });
}

#[test]
fn unbound_columns_are_ignored() {
    init_tracing();
    let rows = collect::<Person>("id,name,city,age\n7,Alice,Oslo,10\n").unwrap();
    assert_eq!(rows, [Person { name: "Alice".into(), age: 10 }]);
}

#[test]
fn missing_column_is_named() {
    init_tracing();
    let err = collect::<Person>("name,years\nAlice,10\n").unwrap_err();
    match &err {
        Error::Plan(PlanError::MissingColumns { names }) => assert_eq!(names, &["age"]),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.to_string(), "age did not appear in the first line");
}

#[test]
fn every_missing_column_is_listed() {
    init_tracing();
    let err = collect::<Person>("id,city\n1,Oslo\n").unwrap_err();
    assert_eq!(err.to_string(), "name, age did not appear in the first line");
}

#[derive(Debug, Default, PartialEq)]
struct Twice {
    first: String,
    second: String,
}

impl RowShape for Twice {
    fn describe(shape: &mut Shape<Self>) {
        shape.field("First", |t| &mut t.first).name("key");
        shape.field("Second", |t| &mut t.second).name("key");
    }
}

#[test]
fn two_fields_may_share_a_column() {
    init_tracing();
    let rows = collect::<Twice>("key,key\nleft,right\n").unwrap();
    assert_eq!(
        rows,
        [Twice {
            first: "left".into(),
            second: "left".into()
        }]
    );
}

#[test]
fn header_only_input_has_no_rows() {
    init_tracing();
    assert!(collect::<Person>("name,age\n").unwrap().is_empty());
}

#[test]
fn empty_input_has_no_rows() {
    init_tracing();
    assert!(collect::<Person>("").unwrap().is_empty());
}

#[test]
fn pull_with_missing_column_fails_every_call() {
    init_tracing();
    let mut reader = Reader::new("name\nAlice\n".as_bytes(), Options::default());
    let mut person = Person::default();
    assert!(!reader.read(&mut person));
    assert!(!reader.read(&mut person));
    assert_eq!(reader.line_number(), 1);
    assert_eq!(
        reader.done().unwrap_err().to_string(),
        "age did not appear in the first line"
    );
}
