use std::fs::File;
use std::io;
use std::iter::FusedIterator;
use std::path::Path;

use fastcsv_core::{
    NewlineMode, ParseError, ReadRowResult, Reader as CoreReader,
    ReaderBuilder as CoreReaderBuilder,
};
use tracing::debug;

use crate::buffered::{ChunkBuffer, DEFAULT_CHUNK_SIZE};
use crate::error::{Error, Result};
use crate::row::Row;
use crate::scope::{Scope, Scoped};
use crate::stream::{IoSource, Source, StrSource};

/// Builds a CSV reader with various configuration knobs.
///
/// This builder can be used to tweak the line ending convention and the
/// size of the chunks pulled from the source. Once a `Reader` is built, its
/// configuration cannot be changed.
#[derive(Debug)]
pub struct ReaderBuilder {
    builder: CoreReaderBuilder,
    chunk_size: usize,
}

impl Default for ReaderBuilder {
    fn default() -> ReaderBuilder {
        ReaderBuilder {
            builder: CoreReaderBuilder::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ReaderBuilder {
    /// Create a new builder for configuring CSV parsing.
    ///
    /// To convert a builder into a reader, call one of the methods starting
    /// with `from_`.
    ///
    /// # Example
    ///
    /// ```
    /// use fastcsv::{ReaderBuilder, Row};
    ///
    /// # fn main() { example().unwrap(); }
    /// fn example() -> fastcsv::Result<()> {
    ///     let data = "city,country\rBoston,United States\r";
    ///     let mut rdr = ReaderBuilder::new().newline(Some("\r"))?.from_str(data);
    ///     let mut row = Row::new();
    ///     assert!(rdr.read_row(&mut row)?);
    ///     assert_eq!(row, vec!["city", "country"]);
    ///     assert!(rdr.read_row(&mut row)?);
    ///     assert_eq!(row, vec!["Boston", "United States"]);
    ///     assert!(!rdr.read_row(&mut row)?);
    ///     Ok(())
    /// }
    /// ```
    pub fn new() -> ReaderBuilder {
        ReaderBuilder::default()
    }

    /// Build a CSV parser from this configuration that reads from `src`.
    pub fn from_source<S: Source>(&self, src: S) -> Reader<S> {
        Reader::new_inner(self, src)
    }

    /// Build a CSV parser from this configuration that reads `text`.
    pub fn from_str<'a>(&self, text: &'a str) -> Reader<StrSource<'a>> {
        self.from_source(StrSource::new(text))
    }

    /// Build a CSV parser from this configuration that reads UTF-8 data
    /// from `rdr`.
    ///
    /// Note that the reader does its own buffering, so there is no need to
    /// wrap `rdr` in an `io::BufReader`.
    pub fn from_reader<R: io::Read>(&self, rdr: R) -> Reader<IoSource<R>> {
        self.from_source(IoSource::new(rdr))
    }

    /// Build a CSV parser from this configuration that reads data from the
    /// given file path.
    ///
    /// If there was a problem opening the file, then this returns the
    /// corresponding error.
    pub fn from_path<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<Reader<IoSource<File>>> {
        Ok(self.from_reader(File::open(path)?))
    }

    /// The line ending convention, given as it would appear in the data.
    ///
    /// `None` selects universal newlines: `\r`, `\n` and `\r\n` all end a
    /// row. Otherwise the value must be exactly one of `"\r"`, `"\n"` or
    /// `"\r\n"`, and only that sequence ends a row.
    ///
    /// # Errors
    ///
    /// Any other value is rejected with `Error::InvalidConfiguration`.
    pub fn newline(
        &mut self,
        newline: Option<&str>,
    ) -> Result<&mut ReaderBuilder> {
        let mode = NewlineMode::from_config(newline)?;
        Ok(self.newline_mode(mode))
    }

    /// The line ending convention, as an already resolved mode.
    pub fn newline_mode(&mut self, mode: NewlineMode) -> &mut ReaderBuilder {
        self.builder.newline(mode);
        self
    }

    /// The maximum number of bytes requested from the source at a time.
    ///
    /// The default is 1024. Values below 1 are treated as 1. The chunk size
    /// never changes what is parsed, only how often the source is read.
    pub fn chunk_size(&mut self, chunk_size: usize) -> &mut ReaderBuilder {
        self.chunk_size = chunk_size;
        self
    }
}

/// A position in CSV data.
///
/// A position is used to report errors in CSV data. The byte offset counts
/// the text consumed before the position, the line starts at 1 and counts
/// `\n` characters, and the row is the number of rows read before the
/// position.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Position {
    byte: u64,
    line: u64,
    row: u64,
}

impl Default for Position {
    fn default() -> Position {
        Position::new()
    }
}

impl Position {
    /// Returns a new position at the very start of CSV data.
    pub fn new() -> Position {
        Position { byte: 0, line: 1, row: 0 }
    }

    /// The byte offset, starting at `0`, of this position.
    pub fn byte(&self) -> u64 {
        self.byte
    }

    /// The line number, starting at `1`, of this position.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// The row index, starting at `0`, of this position.
    pub fn row(&self) -> u64 {
        self.row
    }

    fn advance(&mut self, consumed: &str) {
        self.byte += consumed.len() as u64;
        self.line += memchr::memchr_iter(b'\n', consumed.as_bytes()).count()
            as u64;
    }
}

#[derive(Debug)]
struct ReaderState {
    /// The position of the next unread row.
    pos: Position,
    /// Set once the end of the data or an error has been reached.
    done: bool,
    /// Set by the first call to `enter`.
    entered: bool,
}

/// A streaming CSV reader.
///
/// The reader pulls text from a `Source` in chunks and yields one `Row` at a
/// time. Cells may be quoted with `"`, in which case they can contain
/// separators, line endings and doubled quotes. A quoted cell must be
/// closed, and the last row must end with a line ending: data that stops
/// part way through a row is reported as `Error::Truncated`.
///
/// After the end of the data, or after any error, the reader yields no more
/// rows.
///
/// # Example
///
/// ```
/// use fastcsv::Reader;
///
/// # fn main() { example().unwrap(); }
/// fn example() -> fastcsv::Result<()> {
///     let mut rdr = Reader::from_str("a,\"b,c\"\r\n\"say \"\"hi\"\"\",d\n");
///     let rows = rdr.rows().collect::<fastcsv::Result<Vec<_>>>()?;
///     assert_eq!(rows[0], vec!["a", "b,c"]);
///     assert_eq!(rows[1], vec!["say \"hi\"", "d"]);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Reader<S> {
    core: CoreReader,
    buf: ChunkBuffer,
    src: S,
    state: ReaderState,
}

impl<'a> Reader<StrSource<'a>> {
    /// Create a new CSV parser with a default configuration for the given
    /// text.
    pub fn from_str(text: &'a str) -> Reader<StrSource<'a>> {
        ReaderBuilder::new().from_str(text)
    }
}

impl<R: io::Read> Reader<IoSource<R>> {
    /// Create a new CSV parser with a default configuration for the given
    /// reader of UTF-8 data.
    pub fn from_reader(rdr: R) -> Reader<IoSource<R>> {
        ReaderBuilder::new().from_reader(rdr)
    }
}

impl Reader<IoSource<File>> {
    /// Create a new CSV parser with a default configuration for the given
    /// file path.
    pub fn from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<Reader<IoSource<File>>> {
        ReaderBuilder::new().from_path(path)
    }
}

impl<S: Source> Reader<S> {
    /// Create a new CSV parser over `src` with the given line ending
    /// convention. See `ReaderBuilder::newline` for the accepted values.
    pub fn new(src: S, newline: Option<&str>) -> Result<Reader<S>> {
        Ok(ReaderBuilder::new().newline(newline)?.from_source(src))
    }

    /// Create a new CSV parser with a default configuration for the given
    /// source.
    pub fn from_source(src: S) -> Reader<S> {
        ReaderBuilder::new().from_source(src)
    }

    fn new_inner(builder: &ReaderBuilder, src: S) -> Reader<S> {
        Reader {
            core: builder.builder.build(),
            buf: ChunkBuffer::new(builder.chunk_size),
            src,
            state: ReaderState {
                pos: Position::new(),
                done: false,
                entered: false,
            },
        }
    }

    /// Read a single row into the given `Row`. Returns `false` when no more
    /// rows could be read.
    ///
    /// The row is cleared first and its allocations are reused, which makes
    /// this the fastest way to read many rows.
    ///
    /// # Errors
    ///
    /// I/O errors from the source, quoting violations and data that ends
    /// part way through a row are returned as errors. The row is left empty
    /// and the reader returns `Ok(false)` from then on.
    pub fn read_row(&mut self, row: &mut Row) -> Result<bool> {
        row.clear();
        if self.state.done {
            return Ok(false);
        }
        let res = self.read_row_imp(row);
        if res.is_err() {
            row.clear();
            self.state.done = true;
        }
        res
    }

    fn read_row_imp(&mut self, row: &mut Row) -> Result<bool> {
        let (fields, ends) = row.as_parts();
        let start = self.state.pos.clone();
        loop {
            let input = self.buf.fill_buf(&mut self.src)?;
            let (res, nin) = match self.core.read_row(input, fields, ends) {
                Ok(res) => res,
                Err(err) => {
                    let pos = start;
                    debug!(
                        row = pos.row(),
                        line = pos.line(),
                        error = %err,
                        "malformed CSV data"
                    );
                    return Err(match err {
                        ParseError::UnexpectedEof => Error::Truncated { pos },
                        err => Error::Malformed { pos, err },
                    });
                }
            };
            self.state.pos.advance(&input[..nin]);
            self.buf.consume(nin);
            match res {
                ReadRowResult::InputEmpty => continue,
                ReadRowResult::Row => {
                    self.state.pos.row += 1;
                    return Ok(true);
                }
                ReadRowResult::End => {
                    self.state.done = true;
                    return Ok(false);
                }
            }
        }
    }

    /// Returns a borrowed iterator over all rows as owned `Row`s.
    ///
    /// The iterator stops after the last row or after the first error.
    pub fn rows(&mut self) -> RowsIter<'_, S> {
        RowsIter { rdr: self }
    }

    /// Returns an owned iterator over all rows as owned `Row`s.
    pub fn into_rows(self) -> RowsIntoIter<S> {
        RowsIntoIter { rdr: self }
    }

    /// Enter a scope for this reader. When the returned guard is dropped or
    /// closed, the source is closed.
    ///
    /// # Errors
    ///
    /// A reader can only be entered once. Later calls fail with
    /// `Error::AlreadyEntered`.
    pub fn enter(&mut self) -> Result<Scope<'_, Reader<S>>> {
        if self.state.entered {
            return Err(Error::AlreadyEntered);
        }
        self.state.entered = true;
        Ok(Scope::new(self))
    }

    /// The position of the next row to be read.
    pub fn position(&self) -> &Position {
        &self.state.pos
    }

    /// Returns true if and only if this reader will yield no more rows,
    /// either because the data ended or because of an error.
    pub fn is_done(&self) -> bool {
        self.state.done
    }

    /// The line ending convention this reader recognizes.
    pub fn newline(&self) -> NewlineMode {
        self.core.newline()
    }

    /// Returns a reference to the underlying source.
    pub fn get_ref(&self) -> &S {
        &self.src
    }

    /// Returns a mutable reference to the underlying source.
    ///
    /// Reading from it directly skips data that the CSV parser then never
    /// sees.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.src
    }

    /// Unwraps this CSV reader, returning the underlying source.
    ///
    /// Any text that was already pulled from the source but not yet parsed
    /// is lost.
    pub fn into_inner(self) -> S {
        self.src
    }
}

impl<S: Source> Scoped for Reader<S> {
    fn exit(&mut self) -> Result<()> {
        debug!(row = self.state.pos.row(), "closing CSV source");
        self.src.close()?;
        Ok(())
    }
}

/// An owned iterator over rows.
///
/// The type parameter `S` refers to the underlying `Source` type.
#[derive(Debug)]
pub struct RowsIntoIter<S> {
    rdr: Reader<S>,
}

impl<S: Source> RowsIntoIter<S> {
    /// Return a reference to the underlying CSV reader.
    pub fn reader(&self) -> &Reader<S> {
        &self.rdr
    }

    /// Drop this iterator and return the underlying CSV reader.
    pub fn into_reader(self) -> Reader<S> {
        self.rdr
    }
}

impl<S: Source> Iterator for RowsIntoIter<S> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Result<Row>> {
        next_row(&mut self.rdr)
    }
}

impl<S: Source> FusedIterator for RowsIntoIter<S> {}

/// A borrowed iterator over rows.
///
/// The lifetime parameter `'r` refers to the lifetime of the underlying
/// CSV `Reader`.
#[derive(Debug)]
pub struct RowsIter<'r, S: 'r> {
    rdr: &'r mut Reader<S>,
}

impl<'r, S: Source> RowsIter<'r, S> {
    /// Return a reference to the underlying CSV reader.
    pub fn reader(&self) -> &Reader<S> {
        &self.rdr
    }

    /// Return a mutable reference to the underlying CSV reader.
    pub fn reader_mut(&mut self) -> &mut Reader<S> {
        &mut self.rdr
    }
}

impl<'r, S: Source> Iterator for RowsIter<'r, S> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Result<Row>> {
        next_row(self.rdr)
    }
}

impl<'r, S: Source> FusedIterator for RowsIter<'r, S> {}

fn next_row<S: Source>(rdr: &mut Reader<S>) -> Option<Result<Row>> {
    let mut row = Row::new();
    match rdr.read_row(&mut row) {
        Err(err) => Some(Err(err)),
        Ok(true) => Some(Ok(row)),
        Ok(false) => None,
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use fastcsv_core::{NewlineMode, ParseError};

    use super::{Position, Reader, ReaderBuilder};
    use crate::error::Error;
    use crate::row::Row;
    use crate::stream::{Source, StrSource};

    fn rows(rdr: &mut Reader<StrSource>) -> Vec<Vec<String>> {
        rdr.rows()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect()
    }

    macro_rules! row {
        ($($field:expr),*) => { vec![$(String::from($field)),*] };
    }

    #[test]
    fn universal_newlines() {
        let mut rdr = Reader::from_str("a,b\r\nc,d\re,f\n");
        assert_eq!(
            rows(&mut rdr),
            vec![row!["a", "b"], row!["c", "d"], row!["e", "f"]]
        );
        assert!(rdr.is_done());
    }

    #[test]
    fn explicit_newline() {
        let mut rdr =
            ReaderBuilder::new().newline(Some("\n")).unwrap().from_str("a\rb\n");
        assert_eq!(rdr.newline(), NewlineMode::LF);
        assert_eq!(rows(&mut rdr), vec![row!["a\rb"]]);
    }

    #[test]
    fn invalid_newline() {
        let err = Reader::new(StrSource::new(""), Some("\n\r")).unwrap_err();
        match err {
            Error::InvalidConfiguration(ref e) => {
                assert_eq!(e.value(), "\n\r")
            }
            err => panic!("unexpected error: {:?}", err),
        }
    }

    #[test]
    fn quoted_cells_span_chunks() {
        let data = "\"a,\r\nb\"\"c\",d\r\n";
        for chunk_size in 1..data.len() + 1 {
            let mut rdr =
                ReaderBuilder::new().chunk_size(chunk_size).from_str(data);
            assert_eq!(rows(&mut rdr), vec![row!["a,\r\nb\"c", "d"]]);
        }
    }

    #[test]
    fn position_tracks_rows() {
        let mut rdr = Reader::from_str("a\r\n\"b\nc\"\nd\n");
        let mut row = Row::new();
        assert_eq!(rdr.position(), &Position::new());

        assert!(rdr.read_row(&mut row).unwrap());
        assert_eq!(
            (rdr.position().byte(), rdr.position().line(), rdr.position().row()),
            (3, 2, 1)
        );
        assert!(rdr.read_row(&mut row).unwrap());
        assert_eq!(
            (rdr.position().byte(), rdr.position().line(), rdr.position().row()),
            (9, 4, 2)
        );
        assert!(rdr.read_row(&mut row).unwrap());
        assert!(!rdr.read_row(&mut row).unwrap());
        assert_eq!(rdr.position().row(), 3);
    }

    #[test]
    fn malformed_reports_row_start() {
        for chunk_size in 1..9 {
            let mut rdr = ReaderBuilder::new()
                .chunk_size(chunk_size)
                .from_str("a\nbb\"c\nd\n");
            let mut row = Row::new();
            assert!(rdr.read_row(&mut row).unwrap());
            match rdr.read_row(&mut row).unwrap_err() {
                Error::Malformed { pos, err } => {
                    assert_eq!(err, ParseError::ContentBeforeQuote);
                    assert_eq!((pos.byte(), pos.line(), pos.row()), (2, 2, 1));
                }
                err => panic!("unexpected error: {:?}", err),
            }
            assert!(rdr.is_done());
            assert!(!rdr.read_row(&mut row).unwrap());
        }
    }

    #[test]
    fn truncated() {
        for data in &["a,b", "\"a", "\"a\"", "a\n\"b\nc"] {
            let mut rdr = Reader::from_str(data);
            let res: Result<Vec<Row>, _> = rdr.rows().collect();
            match res {
                Err(Error::Truncated { .. }) => {}
                res => panic!("{:?}: unexpected result {:?}", data, res),
            }
        }
    }

    #[test]
    fn empty_input() {
        let mut rdr = Reader::from_str("");
        assert_eq!(rows(&mut rdr), Vec::<Vec<String>>::new());
        assert!(rdr.is_done());
    }

    #[test]
    fn empty_line_is_one_empty_field() {
        let mut rdr = Reader::from_str("\n\n");
        assert_eq!(rows(&mut rdr), vec![row![""], row![""]]);
    }

    #[test]
    fn iterator_is_fused_after_error() {
        let mut rdr = Reader::from_str("\"a\"b\nc\n");
        let mut it = rdr.rows();
        assert!(it.next().unwrap().is_err());
        assert!(it.next().is_none());
        assert!(it.next().is_none());
    }

    #[test]
    fn into_rows_owns_reader() {
        let rdr = Reader::from_str("x\ny\n");
        let rows: Vec<Row> =
            rdr.into_rows().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows, vec![Row::from(vec!["x"]), Row::from(vec!["y"])]);
    }

    #[test]
    fn from_reader_decodes_utf8() {
        let data = "é,ü\n".as_bytes();
        let mut rdr = Reader::from_reader(data);
        let row = rdr.rows().next().unwrap().unwrap();
        assert_eq!(row, vec!["é", "ü"]);
    }

    #[test]
    fn invalid_utf8_is_io_error() {
        let mut rdr = Reader::from_reader(&b"a,\xFF\n"[..]);
        match rdr.rows().next().unwrap().unwrap_err() {
            Error::Io(err) => assert_eq!(err.kind(), io::ErrorKind::InvalidData),
            err => panic!("unexpected error: {:?}", err),
        }
    }

    #[derive(Debug, Default)]
    struct Closing {
        closes: usize,
    }

    impl Source for Closing {
        fn read(&mut self, _: usize, _: &mut String) -> io::Result<usize> {
            Ok(0)
        }

        fn close(&mut self) -> io::Result<()> {
            self.closes += 1;
            Ok(())
        }
    }

    #[test]
    fn scope_closes_source_once() {
        let mut rdr = Reader::from_source(Closing::default());
        {
            let mut scope = rdr.enter().unwrap();
            assert!(scope.rows().next().is_none());
        }
        assert_eq!(rdr.get_ref().closes, 1);
        match rdr.enter() {
            Err(Error::AlreadyEntered) => {}
            res => panic!("unexpected result: {:?}", res.map(|_| ())),
        }
        assert_eq!(rdr.get_ref().closes, 1);
    }
}
