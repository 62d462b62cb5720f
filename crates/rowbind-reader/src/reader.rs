use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::Arc;

use csv::StringRecord;
use rowbind_convert::{ConverterRegistry, type_label};
use rowbind_shape::{DecodingPlan, RowShape, analyze};

use crate::error::{Break, Error};
use crate::options::{FieldCount, Options};
use crate::source::{NoClose, ReadClose};

/// What a visitor passed to [`Reader::for_each`] may return.
///
/// ```text
/// ┌──────────────────┬──────────────────────────────────────────────────┐
/// │ Return type      │ Effect                                           │
/// ├──────────────────┼──────────────────────────────────────────────────┤
/// │ ()               │ Keep going until the input ends or fails         │
/// │ bool             │ `false` stops cleanly                            │
/// │ Result<(), E>    │ `Err` stops; surfaced unless it is `Break`       │
/// └──────────────────┴──────────────────────────────────────────────────┘
/// ```
pub trait VisitOutcome {
    fn into_control_flow(self) -> ControlFlow<Option<anyhow::Error>>;
}

impl VisitOutcome for () {
    fn into_control_flow(self) -> ControlFlow<Option<anyhow::Error>> {
        ControlFlow::Continue(())
    }
}

impl VisitOutcome for bool {
    fn into_control_flow(self) -> ControlFlow<Option<anyhow::Error>> {
        if self {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(None)
        }
    }
}

impl<E: Into<anyhow::Error>> VisitOutcome for Result<(), E> {
    fn into_control_flow(self) -> ControlFlow<Option<anyhow::Error>> {
        match self {
            Ok(()) => ControlFlow::Continue(()),
            Err(err) => ControlFlow::Break(Some(err.into())),
        }
    }
}

enum End {
    Eof,
    Failed(Error),
}

/// A decoding session over one delimited-text source.
///
/// The session owns its byte source and a tokenizer over it, and decodes
/// rows into any [`RowShape`]. It has three ways of being driven:
///
/// - [`read`](Self::read) pulls one row at a time and returns `false`
///   once there is nothing more to read; [`done`](Self::done) then says
///   whether that was the end of input or an error.
/// - [`for_each`](Self::for_each) hands every row to a visitor.
/// - [`read_all`](Self::read_all) collects every row into a `Vec`.
///
/// The first error ends the session and is kept; end-of-input is never
/// reported as an error. `for_each` and `read_all` finalize the session
/// themselves, a pulling caller calls `done`.
///
/// ```rust
/// use rowbind_reader::{Options, Reader, RowShape, Shape};
///
/// #[derive(Default)]
/// struct Entry {
///     name: String,
///     age: u32,
/// }
///
/// impl RowShape for Entry {
///     fn describe(shape: &mut Shape<Self>) {
///         shape.field("Name", |e| &mut e.name).name("name");
///         shape.field("Age", |e| &mut e.age).name("age");
///     }
/// }
///
/// let input = "name,age\nAlice,10\nBob,20\n";
/// let mut reader = Reader::new(input.as_bytes(), Options::default());
/// let mut entry = Entry::default();
/// let mut total = 0;
/// while reader.read(&mut entry) {
///     total += entry.age;
/// }
/// reader.done().unwrap();
/// assert_eq!(total, 30);
/// ```
pub struct Reader {
    csv: Option<csv::Reader<Box<dyn ReadClose>>>,
    converters: ConverterRegistry,
    field_count: FieldCount,
    /// One `DecodingPlan<S>` per shape type `S` used on this session.
    plans: HashMap<TypeId, Box<dyn Any>>,
    end: Option<End>,
    finished: bool,
    line: usize,
    first_line: Option<StringRecord>,
    record: StringRecord,
}

impl Reader {
    /// Read from any byte source. There is nothing to close.
    pub fn new<R: Read + 'static>(source: R, opts: Options) -> Self {
        Self::with_closer(NoClose(source), opts)
    }

    /// Read from `source` and close it when the session finishes.
    pub fn with_closer<R: ReadClose + 'static>(source: R, opts: Options) -> Self {
        let source: Box<dyn ReadClose> = Box::new(source);
        let mut reader = Self::idle(&opts);
        reader.csv = Some(opts.csv_builder().from_reader(source));
        if let Err(err) = opts.validate() {
            reader.end = Some(End::Failed(err.into()));
        }
        reader
    }

    /// Read the file at `path`.
    ///
    /// A file that cannot be opened is not reported here: it becomes the
    /// session error, seen by the first read and by `done`.
    pub fn from_path(path: impl AsRef<Path>, opts: Options) -> Self {
        let path = path.as_ref();
        match File::open(path) {
            Ok(file) => Self::with_closer(file, opts),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "cannot open source");
                let mut reader = Self::idle(&opts);
                reader.end = Some(End::Failed(Error::Io(Arc::new(err))));
                reader
            }
        }
    }

    fn idle(opts: &Options) -> Self {
        Self {
            csv: None,
            converters: opts.converters.clone(),
            field_count: opts.field_count(),
            plans: HashMap::new(),
            end: None,
            finished: false,
            line: 0,
            first_line: None,
            record: StringRecord::new(),
        }
    }

    /// Decode the next row into `out`.
    ///
    /// Returns `false` at end of input or on any error, leaving `out`
    /// untouched; call [`done`](Self::done) to tell the two apart.
    pub fn read<S: RowShape>(&mut self, out: &mut S) -> bool {
        let Some(mut plan) = self.take_plan::<S>() else {
            return false;
        };
        let decoded = if self.resolve(&mut plan) && self.read_row() {
            self.decode_row(&plan)
        } else {
            None
        };
        self.keep_plan(plan);
        match decoded {
            Some(row) => {
                *out = row;
                true
            }
            None => false,
        }
    }

    /// Decode every remaining row and hand each one to `visitor`, then
    /// finalize the session.
    ///
    /// # Errors
    ///
    /// The session error, as returned by [`done`](Self::done). An error
    /// returned by the visitor is the session error unless it is
    /// [`Break`].
    pub fn for_each<S, F, O>(&mut self, mut visitor: F) -> Result<(), Error>
    where
        S: RowShape,
        F: FnMut(S) -> O,
        O: VisitOutcome,
    {
        self.visit(&mut visitor);
        self.done()
    }

    /// Append every remaining row to `out`, then finalize the session.
    ///
    /// Stops at the first error; rows decoded before it stay in `out`.
    ///
    /// # Errors
    ///
    /// The session error, as returned by [`done`](Self::done).
    pub fn read_all<S: RowShape>(&mut self, out: &mut Vec<S>) -> Result<(), Error> {
        self.visit(&mut |row: S| out.push(row));
        self.done()
    }

    /// Finish the session: drop the tokenizer and close the source.
    ///
    /// Only the first call closes anything. Every call returns the same
    /// result: `Ok(())` when the input was read to the end (or reading
    /// stopped early without error), otherwise the first error.
    ///
    /// # Errors
    ///
    /// The session's first error. A failing close is reported only when
    /// no other error was recorded before it.
    pub fn done(&mut self) -> Result<(), Error> {
        if !self.finished {
            self.finished = true;
            if let Some(csv) = self.csv.take() {
                let mut source = csv.into_inner();
                if let Err(err) = source.close() {
                    if matches!(self.end, Some(End::Failed(_))) {
                        tracing::warn!(error = %err, "dropping close error, an earlier error is pending");
                    } else {
                        self.end = Some(End::Failed(Error::Close(Arc::new(err))));
                    }
                }
            }
            tracing::debug!(
                lines = self.line,
                failed = matches!(self.end, Some(End::Failed(_))),
                "session finished"
            );
        }
        match &self.end {
            Some(End::Failed(err)) => Err(err.clone()),
            Some(End::Eof) | None => Ok(()),
        }
    }

    /// Run [`done`](Self::done) and store its error in `slot`, unless
    /// `slot` already holds an error.
    pub fn done_into<T>(&mut self, slot: &mut Result<T, Error>) {
        if let Err(err) = self.done() {
            if slot.is_ok() {
                *slot = Err(err);
            }
        }
    }

    /// How many rows have been read so far, the header row included.
    ///
    /// Comment lines are not counted. The value is meaningful only after
    /// a successful read.
    #[must_use]
    pub fn line_number(&self) -> usize {
        self.line
    }

    fn visit<S, F, O>(&mut self, visitor: &mut F)
    where
        S: RowShape,
        F: FnMut(S) -> O,
        O: VisitOutcome,
    {
        let Some(mut plan) = self.take_plan::<S>() else {
            return;
        };
        if self.resolve(&mut plan) {
            while self.read_row() {
                let Some(row) = self.decode_row(&plan) else {
                    break;
                };
                match visitor(row).into_control_flow() {
                    ControlFlow::Continue(()) => {}
                    ControlFlow::Break(None) => break,
                    ControlFlow::Break(Some(err)) => {
                        if !err.is::<Break>() {
                            self.fail(Error::Visitor(Arc::new(err)));
                        }
                        break;
                    }
                }
            }
        }
        self.keep_plan(plan);
    }

    /// Take the cached plan for `S` out of the session, building it on
    /// first use. `None` once the session has ended.
    fn take_plan<S: RowShape>(&mut self) -> Option<DecodingPlan<S>> {
        if self.end.is_some() {
            return None;
        }
        let cached = self
            .plans
            .remove(&TypeId::of::<S>())
            .and_then(|plan| plan.downcast::<DecodingPlan<S>>().ok());
        match cached {
            Some(plan) => Some(*plan),
            None => match analyze::<S>(&self.converters) {
                Ok(plan) => Some(plan),
                Err(err) => {
                    tracing::debug!(shape = %type_label::<S>(), "row shape rejected");
                    self.fail(err.into());
                    None
                }
            },
        }
    }

    fn keep_plan<S: RowShape>(&mut self, plan: DecodingPlan<S>) {
        self.plans.insert(TypeId::of::<S>(), Box::new(plan));
    }

    /// Resolve `plan` against the first row of the input, reading that
    /// row if nothing has been read yet.
    fn resolve<S>(&mut self, plan: &mut DecodingPlan<S>) -> bool {
        if !plan.needs_header() {
            return true;
        }
        if self.line == 0 && !self.read_row() {
            return false;
        }
        let resolved = {
            let header: Vec<&str> = self.first_line.iter().flat_map(StringRecord::iter).collect();
            plan.consume_header(&header)
        };
        match resolved {
            Ok(()) => true,
            Err(err) => {
                self.fail(err.into());
                false
            }
        }
    }

    /// Read the next row into `self.record`.
    fn read_row(&mut self) -> bool {
        if self.end.is_some() {
            return false;
        }
        let Some(csv) = self.csv.as_mut() else {
            self.end = Some(End::Eof);
            return false;
        };
        match csv.read_record(&mut self.record) {
            Ok(true) => {}
            Ok(false) => {
                self.end = Some(End::Eof);
                return false;
            }
            Err(err) => {
                self.fail(err.into());
                return false;
            }
        }
        if let Some(expected) = self.expected_fields() {
            if self.record.len() != expected {
                let line = self
                    .record
                    .position()
                    .map_or(self.line as u64 + 1, csv::Position::line);
                self.fail(Error::FieldCount { line });
                return false;
            }
        }
        self.line += 1;
        if self.line == 1 {
            self.first_line = Some(self.record.clone());
        }
        tracing::trace!(line = self.line, fields = self.record.len(), "row read");
        true
    }

    /// Row length required by the field count policy. `Uniform` takes it
    /// from the first row, so the first row itself is never rejected.
    fn expected_fields(&self) -> Option<usize> {
        match self.field_count {
            FieldCount::Exact(n) => Some(n),
            FieldCount::Uniform => self.first_line.as_ref().map(StringRecord::len),
            FieldCount::Flexible => None,
        }
    }

    fn decode_row<S>(&mut self, plan: &DecodingPlan<S>) -> Option<S> {
        let decoded = {
            let row: Vec<&str> = self.record.iter().collect();
            plan.decode(&row)
        };
        match decoded {
            Ok(row) => Some(row),
            Err(err) => {
                tracing::debug!(line = self.line, error = %err, "row rejected");
                self.fail(err.into());
                None
            }
        }
    }

    /// Record `err` as the session error. An earlier error is kept.
    fn fail(&mut self, err: Error) {
        if !matches!(self.end, Some(End::Failed(_))) {
            self.end = Some(End::Failed(err));
        }
    }
}

impl fmt::Debug for Reader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader")
            .field("line", &self.line)
            .field("plans", &self.plans.len())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
