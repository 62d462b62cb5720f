use std::fs::File;
use std::io::{self, Read};

/// A byte source the session owns and releases when it finishes.
///
/// [`Reader::done`](crate::Reader::done) calls `close` exactly once and
/// then drops the source. A failing `close` becomes the session error
/// unless an earlier error is already recorded.
pub trait ReadClose: Read {
    /// Release the source.
    ///
    /// # Errors
    ///
    /// Whatever the source reports while flushing or releasing.
    fn close(&mut self) -> io::Result<()>;
}

/// The descriptor is released when the session drops it after `close`.
impl ReadClose for File {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Adapter for sources with nothing to release.
pub(crate) struct NoClose<R>(pub(crate) R);

impl<R: Read> Read for NoClose<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl<R: Read> ReadClose for NoClose<R> {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}
