use std::fs::File;
use std::io;
use std::path::Path;

use fastcsv_core::{
    QuoteStyle, Writer as CoreWriter, WriterBuilder as CoreWriterBuilder,
};
#[cfg(feature = "serde")]
use serde::Serialize;
use tracing::debug;

use crate::buffered::{OutputBuffer, DEFAULT_OUTPUT_CAPACITY};
use crate::cell::ToCell;
use crate::error::{Error, IntoInnerError, Result};
use crate::scope::{Scope, Scoped};
#[cfg(feature = "serde")]
use crate::serializer::serialize;
use crate::stream::{IoSink, Sink};

/// Builds a CSV writer with various configuration knobs.
///
/// This builder can be used to tweak the row terminator, the quoting style
/// and the size of the output buffer. Once a `Writer` is built, its
/// configuration cannot be changed.
#[derive(Debug)]
pub struct WriterBuilder {
    builder: CoreWriterBuilder,
    newline: String,
    capacity: usize,
}

impl Default for WriterBuilder {
    fn default() -> WriterBuilder {
        WriterBuilder {
            builder: CoreWriterBuilder::default(),
            newline: "\r\n".to_string(),
            capacity: DEFAULT_OUTPUT_CAPACITY,
        }
    }
}

impl WriterBuilder {
    /// Create a new builder for configuring CSV writing.
    ///
    /// To convert a builder into a writer, call one of the methods starting
    /// with `from_`.
    ///
    /// # Example
    ///
    /// ```
    /// use fastcsv::WriterBuilder;
    ///
    /// # fn main() { example().unwrap(); }
    /// fn example() -> Result<(), Box<dyn std::error::Error>> {
    ///     let mut wtr = WriterBuilder::new().newline("\n").from_sink(String::new());
    ///     wtr.write_row(&["a", "b", "c"])?;
    ///     wtr.write_row(&["x", "y", "z"])?;
    ///
    ///     let data = wtr.into_inner()?;
    ///     assert_eq!(data, "\"a\",\"b\",\"c\"\n\"x\",\"y\",\"z\"\n");
    ///     Ok(())
    /// }
    /// ```
    pub fn new() -> WriterBuilder {
        WriterBuilder::default()
    }

    /// Build a CSV writer from this configuration that writes to `sink`.
    pub fn from_sink<K: Sink>(&self, sink: K) -> Writer<K> {
        Writer::new_inner(self, sink)
    }

    /// Build a CSV writer from this configuration that writes UTF-8 data to
    /// `wtr`.
    ///
    /// Note that the writer does its own buffering, so there is no need to
    /// wrap `wtr` in an `io::BufWriter`.
    pub fn from_writer<W: io::Write>(&self, wtr: W) -> Writer<IoSink<W>> {
        self.from_sink(IoSink::new(wtr))
    }

    /// Build a CSV writer from this configuration that writes data to the
    /// given file path. The file is truncated if it already exists.
    ///
    /// If there was a problem opening the file, then this returns the
    /// corresponding error.
    pub fn from_path<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<Writer<IoSink<File>>> {
        Ok(self.from_writer(File::create(path)?))
    }

    /// The text written after every row.
    ///
    /// The default is `\r\n`. Any string is accepted, including an empty one.
    pub fn newline(&mut self, newline: &str) -> &mut WriterBuilder {
        self.newline = newline.to_string();
        self
    }

    /// The quoting style to use when writing CSV.
    ///
    /// By default, this is set to `QuoteStyle::Always`, which quotes every
    /// field. `QuoteStyle::Necessary` is accepted here, but every row
    /// written with it fails with `Error::NotImplemented`.
    pub fn quote_style(&mut self, style: QuoteStyle) -> &mut WriterBuilder {
        self.builder.quote_style(style);
        self
    }

    /// Set the capacity (in bytes) of the buffer used in the CSV writer.
    ///
    /// The default is 1024. Values below 4 are raised to 4 so that any
    /// character fits.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut WriterBuilder {
        self.capacity = capacity;
        self
    }
}

/// A buffered CSV writer.
///
/// Every field is quoted, and quotes inside a field are doubled. `None` and
/// `Cell::Null` are written as an empty quoted field. Rows end with the
/// configured newline, `\r\n` by default.
///
/// Output is collected in a fixed size buffer and handed to the sink when
/// the buffer is full, on `flush` and when a scope entered with `enter`
/// ends. Dropping a writer does not flush it. Use `flush`, `into_inner` or
/// `enter` to make sure the data reaches the sink.
///
/// If a row fails part way through, the part of it still in the buffer is
/// discarded, so a failed row never leaves half a row behind unless the
/// buffer had to be flushed while writing it.
///
/// # Example
///
/// ```
/// use fastcsv::Writer;
///
/// # fn main() { example().unwrap(); }
/// fn example() -> fastcsv::Result<()> {
///     let mut out = String::new();
///     {
///         let mut wtr = Writer::from_sink(&mut out);
///         let mut scope = wtr.enter()?;
///         scope.write_row(&["a", "say \"hi\""])?;
///         scope.write_row(vec![Some(1), None])?;
///         scope.close()?;
///     }
///     assert_eq!(out, "\"a\",\"say \"\"hi\"\"\"\r\n\"1\",\"\"\r\n");
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Writer<K> {
    core: CoreWriter,
    buf: OutputBuffer,
    newline: String,
    sink: K,
    entered: bool,
}

impl<K: Sink> Writer<K> {
    /// Create a new CSV writer with a default configuration that writes to
    /// `sink`.
    pub fn from_sink(sink: K) -> Writer<K> {
        WriterBuilder::new().from_sink(sink)
    }

    fn new_inner(builder: &WriterBuilder, sink: K) -> Writer<K> {
        Writer {
            core: builder.builder.build(),
            buf: OutputBuffer::new(builder.capacity),
            newline: builder.newline.clone(),
            sink,
            entered: false,
        }
    }

    /// Write a single row.
    ///
    /// `row` can be anything that iterates over values implementing
    /// `ToCell`: slices and vectors of strings or numbers, a `Row`, an
    /// iterator of `Cell`s, and so on.
    ///
    /// # Errors
    ///
    /// Conversion errors (`Error::InvalidValue`), an unimplemented quoting
    /// style (`Error::NotImplemented`) and I/O errors from the sink are
    /// returned. The unflushed part of a failed row is discarded.
    pub fn write_row<I, T>(&mut self, row: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: ToCell,
    {
        self.write_row_with(|wtr| {
            for value in row {
                value.with_cell(|cell| wtr.write_cell(cell))?;
            }
            Ok(())
        })
    }

    /// Write every row produced by `rows`, in order.
    ///
    /// This stops at the first row that fails. Rows before it stay written.
    pub fn write_rows<I, R, T>(&mut self, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = T>,
        T: ToCell,
    {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }

    /// Serialize a single row with Serde.
    ///
    /// A struct, tuple or sequence becomes one row with a field per member.
    /// Any other scalar becomes a row with a single field. `None` and `()`
    /// are written as null.
    ///
    /// # Errors
    ///
    /// Nested compound values (a `Vec` inside a struct, for instance), maps
    /// and enum variants with data that isn't a single value cannot be
    /// written as a row and fail with `Error::InvalidValue`.
    ///
    /// # Example
    ///
    /// ```
    /// use fastcsv::Writer;
    /// use serde::Serialize;
    ///
    /// #[derive(Serialize)]
    /// struct City<'a> {
    ///     name: &'a str,
    ///     population: Option<u64>,
    /// }
    ///
    /// # fn main() { example().unwrap(); }
    /// fn example() -> Result<(), Box<dyn std::error::Error>> {
    ///     let mut wtr = Writer::from_sink(String::new());
    ///     wtr.serialize(City { name: "Boston", population: Some(4628910) })?;
    ///     wtr.serialize(City { name: "Concord", population: None })?;
    ///     assert_eq!(
    ///         wtr.into_inner()?,
    ///         "\"Boston\",\"4628910\"\r\n\"Concord\",\"\"\r\n"
    ///     );
    ///     Ok(())
    /// }
    /// ```
    #[cfg(feature = "serde")]
    pub fn serialize<S: Serialize>(&mut self, value: S) -> Result<()> {
        self.write_row_with(|wtr| serialize(wtr, &value))
    }

    /// Run `fill` to write the fields of one row, then end the row. The
    /// buffered part of the row is taken back out if anything fails.
    fn write_row_with<F>(&mut self, fill: F) -> Result<()>
    where
        F: FnOnce(&mut Writer<K>) -> Result<()>,
    {
        self.core.start_row()?;
        self.buf.mark();
        let res = fill(&mut *self).and_then(|()| self.end_row());
        match res {
            Ok(()) => self.buf.commit(),
            Err(ref err) => {
                debug!(error = %err, "discarding partially written row");
                self.buf.rollback();
                self.core.end_row();
            }
        }
        res
    }

    /// Escape one cell into the output buffer.
    pub(crate) fn write_cell(&mut self, cell: Option<&str>) -> Result<()> {
        for piece in self.core.field(cell) {
            self.buf.push_str(piece, &mut self.sink)?;
        }
        Ok(())
    }

    fn end_row(&mut self) -> Result<()> {
        self.buf.push_str(&self.newline, &mut self.sink)?;
        self.core.end_row();
        Ok(())
    }

    /// Flush the contents of the internal buffer to the sink, then flush
    /// the sink.
    ///
    /// Calling `flush` with nothing buffered writes nothing.
    pub fn flush(&mut self) -> Result<()> {
        self.buf.flush(&mut self.sink)?;
        Ok(())
    }

    /// Enter a scope for this writer. When the returned guard is dropped or
    /// closed, the writer is flushed and its sink is closed.
    ///
    /// # Errors
    ///
    /// A writer can only be entered once. Later calls fail with
    /// `Error::AlreadyEntered`.
    pub fn enter(&mut self) -> Result<Scope<'_, Writer<K>>> {
        if self.entered {
            return Err(Error::AlreadyEntered);
        }
        self.entered = true;
        Ok(Scope::new(self))
    }

    /// The text written after every row.
    pub fn newline(&self) -> &str {
        &self.newline
    }

    /// The configured quoting style.
    pub fn quote_style(&self) -> QuoteStyle {
        self.core.quote_style()
    }

    /// The text buffered but not yet written to the sink.
    pub fn buffered(&self) -> &str {
        self.buf.as_str()
    }

    /// Returns a reference to the underlying sink.
    pub fn get_ref(&self) -> &K {
        &self.sink
    }

    /// Returns a mutable reference to the underlying sink.
    ///
    /// Writing to it directly interleaves with whatever is still buffered.
    pub fn get_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    /// Flush the contents of the internal buffer and return the underlying
    /// sink.
    pub fn into_inner(
        mut self,
    ) -> std::result::Result<K, IntoInnerError<Writer<K>>> {
        match self.flush() {
            Ok(()) => Ok(self.sink),
            Err(err) => Err(IntoInnerError::new(self, err)),
        }
    }
}

impl<W: io::Write> Writer<IoSink<W>> {
    /// Create a new CSV writer with a default configuration that writes
    /// UTF-8 data to `wtr`.
    pub fn from_writer(wtr: W) -> Writer<IoSink<W>> {
        WriterBuilder::new().from_writer(wtr)
    }
}

impl Writer<IoSink<File>> {
    /// Create a new CSV writer with a default configuration that writes to
    /// the given file path. The file is truncated if it already exists.
    pub fn from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<Writer<IoSink<File>>> {
        WriterBuilder::new().from_path(path)
    }
}

impl<K: Sink> Scoped for Writer<K> {
    fn exit(&mut self) -> Result<()> {
        debug!(buffered = self.buf.as_str().len(), "closing CSV sink");
        let flushed = self.flush();
        let closed = self.sink.close().map_err(Error::from);
        flushed.and(closed)
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use fastcsv_core::{QuoteStyle, WriteError};

    use super::{Writer, WriterBuilder};
    use crate::cell::Cell;
    use crate::error::Error;
    use crate::row::Row;
    use crate::stream::Sink;

    fn written(wtr: Writer<String>) -> String {
        wtr.into_inner().unwrap()
    }

    #[test]
    fn always_quotes() {
        let mut wtr = Writer::from_sink(String::new());
        wtr.write_row(&["a", "b,c"]).unwrap();
        wtr.write_row(vec![Some("x"), None]).unwrap();
        assert_eq!(written(wtr), "\"a\",\"b,c\"\r\n\"x\",\"\"\r\n");
    }

    #[test]
    fn doubles_quotes_and_keeps_newlines() {
        let mut wtr = Writer::from_sink(String::new());
        wtr.write_row(&["say \"hi\"", "l1\nl2"]).unwrap();
        assert_eq!(written(wtr), "\"say \"\"hi\"\"\",\"l1\nl2\"\r\n");
    }

    #[test]
    fn empty_row_is_just_a_newline() {
        let mut wtr = Writer::from_sink(String::new());
        wtr.write_row(Vec::<&str>::new()).unwrap();
        assert_eq!(written(wtr), "\r\n");
    }

    #[test]
    fn custom_newline() {
        let mut wtr = WriterBuilder::new().newline("|").from_sink(String::new());
        wtr.write_rows(vec![vec!["a"], vec!["b"]]).unwrap();
        assert_eq!(wtr.newline(), "|");
        assert_eq!(written(wtr), "\"a\"|\"b\"|");
    }

    #[test]
    fn mixed_cells() {
        let mut wtr = Writer::from_sink(String::new());
        let row = vec![
            Cell::from("a"),
            Cell::from(-3i32),
            Cell::from(2.5),
            Cell::from(true),
            Cell::Null,
        ];
        wtr.write_row(&row).unwrap();
        assert_eq!(
            written(wtr),
            "\"a\",\"-3\",\"2.5\",\"true\",\"\"\r\n"
        );
    }

    #[test]
    fn writes_rows_read_back() {
        let row = Row::from(vec!["1", "two"]);
        let mut wtr = Writer::from_sink(String::new());
        wtr.write_row(&row).unwrap();
        assert_eq!(written(wtr), "\"1\",\"two\"\r\n");
    }

    #[test]
    fn nothing_reaches_sink_before_flush() {
        let mut wtr = Writer::from_sink(String::new());
        wtr.write_row(&["a"]).unwrap();
        assert_eq!(wtr.get_ref(), "");
        assert_eq!(wtr.buffered(), "\"a\"\r\n");
        wtr.flush().unwrap();
        assert_eq!(wtr.get_ref(), "\"a\"\r\n");
        assert_eq!(wtr.buffered(), "");
    }

    #[test]
    fn small_buffer_flushes_as_it_goes() {
        let mut wtr =
            WriterBuilder::new().buffer_capacity(4).from_sink(String::new());
        wtr.write_row(&["abcdef"]).unwrap();
        assert_eq!(wtr.get_ref(), "\"abcdef\"");
        assert_eq!(written(wtr), "\"abcdef\"\r\n");
    }

    #[test]
    fn strict_is_not_implemented() {
        let mut wtr = WriterBuilder::new()
            .quote_style(QuoteStyle::Necessary)
            .from_sink(String::new());
        match wtr.write_row(&["a"]).unwrap_err() {
            Error::NotImplemented(WriteError::NotImplemented(style)) => {
                assert_eq!(style, QuoteStyle::Necessary)
            }
            err => panic!("unexpected error: {:?}", err),
        }
        assert_eq!(written(wtr), "");
    }

    #[test]
    fn failed_row_is_rolled_back() {
        let mut wtr = Writer::from_sink(String::new());
        wtr.write_row(&["ok"]).unwrap();
        let bad = vec![&b"fine"[..], &b"\xFF"[..]];
        match wtr.write_row(&bad).unwrap_err() {
            Error::InvalidValue(_) => {}
            err => panic!("unexpected error: {:?}", err),
        }
        wtr.write_row(&["next"]).unwrap();
        assert_eq!(written(wtr), "\"ok\"\r\n\"next\"\r\n");
    }

    #[derive(Debug, Default)]
    struct Counting {
        out: String,
        writes: usize,
        flushes: usize,
        closes: usize,
    }

    impl Sink for Counting {
        fn write(&mut self, s: &str) -> io::Result<()> {
            self.writes += 1;
            self.out.push_str(s);
            Ok(())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            Ok(())
        }

        fn close(&mut self) -> io::Result<()> {
            self.closes += 1;
            Ok(())
        }
    }

    #[test]
    fn flush_is_idempotent() {
        let mut wtr = Writer::from_sink(Counting::default());
        wtr.write_row(&["a"]).unwrap();
        wtr.flush().unwrap();
        wtr.flush().unwrap();
        assert_eq!(wtr.get_ref().writes, 1);
        assert_eq!(wtr.get_ref().out, "\"a\"\r\n");
    }

    #[test]
    fn scope_flushes_then_closes_once() {
        let mut wtr = Writer::from_sink(Counting::default());
        {
            let mut scope = wtr.enter().unwrap();
            scope.write_row(&["a"]).unwrap();
        }
        assert_eq!(wtr.get_ref().out, "\"a\"\r\n");
        assert_eq!(wtr.get_ref().closes, 1);
        assert!(wtr.enter().is_err());
        assert_eq!(wtr.get_ref().closes, 1);
    }

    struct Broken;

    impl Sink for Broken {
        fn write(&mut self, _: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken"))
        }
    }

    #[test]
    fn into_inner_returns_writer_on_error() {
        let mut wtr = Writer::from_sink(Broken);
        wtr.write_row(&["a"]).unwrap();
        let err = match wtr.into_inner() {
            Ok(_) => panic!("flushing to a broken sink succeeded"),
            Err(err) => err,
        };
        assert!(err.error().is_io_error());
        assert_eq!(err.into_inner().buffered(), "\"a\"\r\n");
    }
}
