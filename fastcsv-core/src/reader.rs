use std::error;
use std::fmt;
use std::str::FromStr;

use memchr::{memchr, memchr3};

/// A line ending convention.
///
/// The default is `Universal`, which treats `\r`, `\n` or `\r\n` as a single
/// row terminator. The other modes accept exactly one literal form.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NewlineMode {
    /// Parses `\r`, `\n` or `\r\n` as a single row terminator.
    Universal,
    /// Parses only `\n` as a row terminator.
    LF,
    /// Parses only `\r` as a row terminator.
    CR,
    /// Parses only `\r\n` as a row terminator. A lone `\r` is cell text.
    CRLF,
}

impl NewlineMode {
    /// Resolve a newline configuration value.
    ///
    /// An absent value selects `Universal`. Otherwise the value must be one
    /// of `"\r"`, `"\n"` or `"\r\n"`.
    pub fn from_config(
        newline: Option<&str>,
    ) -> Result<NewlineMode, InvalidNewline> {
        match newline {
            None => Ok(NewlineMode::Universal),
            Some("\n") => Ok(NewlineMode::LF),
            Some("\r") => Ok(NewlineMode::CR),
            Some("\r\n") => Ok(NewlineMode::CRLF),
            Some(other) => Err(InvalidNewline { got: other.to_string() }),
        }
    }

    /// The literal this mode accepts, or `None` for `Universal`.
    pub fn as_str(&self) -> Option<&'static str> {
        match *self {
            NewlineMode::Universal => None,
            NewlineMode::LF => Some("\n"),
            NewlineMode::CR => Some("\r"),
            NewlineMode::CRLF => Some("\r\n"),
        }
    }

    #[inline]
    fn accepts_cr_alone(&self) -> bool {
        match *self {
            NewlineMode::Universal | NewlineMode::CR => true,
            NewlineMode::LF | NewlineMode::CRLF => false,
        }
    }
}

impl Default for NewlineMode {
    fn default() -> NewlineMode {
        NewlineMode::Universal
    }
}

impl FromStr for NewlineMode {
    type Err = InvalidNewline;

    fn from_str(s: &str) -> Result<NewlineMode, InvalidNewline> {
        NewlineMode::from_config(Some(s))
    }
}

/// The error returned when a newline configuration value is not one of
/// `"\r"`, `"\n"` or `"\r\n"`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InvalidNewline {
    got: String,
}

impl InvalidNewline {
    /// The rejected configuration value.
    pub fn value(&self) -> &str {
        &self.got
    }
}

impl fmt::Display for InvalidNewline {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "invalid newline {:?}, expected one of \"\\r\", \"\\n\" \
             or \"\\r\\n\"",
            self.got
        )
    }
}

impl error::Error for InvalidNewline {}

/// Why a call to `seek` stopped scanning.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BreakReason {
    /// A `,` was found outside of quotes.
    Separator,
    /// A row terminator was found outside of quotes.
    LineEnding,
    /// A `"` was found.
    Quote,
    /// The input ran out before any significant character was found.
    EndOfBuffer,
    /// The last character of the input is a `\r` that may or may not be
    /// followed by a `\n` in input that has not been read yet.
    CrAtEndOfBuffer,
}

/// The result of scanning a slice of input with `seek`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Seek {
    /// The reason scanning stopped.
    pub reason: BreakReason,
    /// The length of the scanned fragment, which excludes the terminator.
    pub end: usize,
    /// The offset at which the next scan should start. This is `end` plus
    /// the width of the terminator (zero, one or two bytes).
    pub next: usize,
}

impl Seek {
    #[inline]
    fn new(reason: BreakReason, end: usize, width: usize) -> Seek {
        Seek { reason, end, next: end + width }
    }
}

/// Scan `input` up to the next structurally significant character.
///
/// A quote is always significant. When `in_quote` is false, so are `,` and
/// any line ending accepted by `mode`.
pub fn seek(input: &str, mode: NewlineMode, in_quote: bool) -> Seek {
    let bytes = input.as_bytes();
    if in_quote {
        return match memchr(b'"', bytes) {
            Some(i) => Seek::new(BreakReason::Quote, i, 1),
            None => Seek::new(BreakReason::EndOfBuffer, bytes.len(), 0),
        };
    }
    let mut from = 0;
    loop {
        let hay = &bytes[from..];
        let hit = match mode {
            NewlineMode::LF => memchr3(b'"', b',', b'\n', hay),
            NewlineMode::CR | NewlineMode::CRLF => {
                memchr3(b'"', b',', b'\r', hay)
            }
            NewlineMode::Universal => {
                let hit = memchr3(b'"', b',', b'\r', hay);
                let bound = hit.unwrap_or(hay.len());
                memchr(b'\n', &hay[..bound]).or(hit)
            }
        };
        let i = match hit {
            None => {
                return Seek::new(BreakReason::EndOfBuffer, bytes.len(), 0)
            }
            Some(i) => from + i,
        };
        match bytes[i] {
            b'"' => return Seek::new(BreakReason::Quote, i, 1),
            b',' => return Seek::new(BreakReason::Separator, i, 1),
            b'\n' => return Seek::new(BreakReason::LineEnding, i, 1),
            _ => {}
        }
        // We're looking at a `\r`.
        match bytes.get(i + 1) {
            Some(&b'\n') if mode != NewlineMode::CR => {
                return Seek::new(BreakReason::LineEnding, i, 2);
            }
            None if mode != NewlineMode::CR => {
                return Seek::new(BreakReason::CrAtEndOfBuffer, i, 1);
            }
            _ if mode.accepts_cr_alone() => {
                return Seek::new(BreakReason::LineEnding, i, 1);
            }
            _ => from = i + 1,
        }
    }
}

/// A violation of CSV quoting rules, or input that ended mid-row.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseError {
    /// Unquoted text was followed by a quote in the same cell.
    ContentBeforeQuote,
    /// A closing quote was followed by something other than a separator,
    /// a line ending or another quote.
    ContentAfterQuote,
    /// The input ended inside a quote or part way through a row.
    UnexpectedEof,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ParseError::ContentBeforeQuote => write!(f, "content before quote"),
            ParseError::ContentAfterQuote => write!(f, "content after quote"),
            ParseError::UnexpectedEof => write!(f, "unexpected end of data"),
        }
    }
}

impl error::Error for ParseError {}

/// The result of parsing at most one row.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReadRowResult {
    /// The caller provided input was exhausted before the end of a row was
    /// found. Call `read_row` again with more input.
    InputEmpty,
    /// A complete row was parsed.
    Row,
    /// All CSV data has been read.
    ///
    /// This can only be returned when an empty input slice is provided.
    End,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    /// At the start of a cell.
    ExpectCell,
    /// An unquoted cell that spans more than one scan.
    Continuing,
    /// Inside an open quote.
    InQuote,
    /// Just past a closing (or escaping) quote.
    AfterQuote,
}

/// What kind of cell a trailing `\r` closed, in case it has to be reopened.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum PendingCr {
    Unquoted,
    Quoted,
}

/// Builds a row assembler.
#[derive(Debug, Default)]
pub struct ReaderBuilder {
    rdr: Reader,
}

impl ReaderBuilder {
    /// Create a new builder.
    pub fn new() -> ReaderBuilder {
        ReaderBuilder::default()
    }

    /// Build a row assembler from this configuration.
    pub fn build(&self) -> Reader {
        let mut rdr = self.rdr.clone();
        rdr.reset();
        rdr
    }

    /// The line ending convention to recognize.
    ///
    /// The default is `NewlineMode::Universal`.
    pub fn newline(&mut self, mode: NewlineMode) -> &mut ReaderBuilder {
        self.rdr.mode = mode;
        self
    }
}

/// A push based CSV row assembler.
///
/// Callers feed it consecutive slices of CSV text with `read_row`. Field data
/// is appended to a caller owned `String` and the end offset of every field
/// is pushed onto a caller owned `Vec<usize>`. Fragments of one cell that
/// arrive in different slices are simply appended, so the caller never has
/// to join them.
///
/// A row is only reported once its terminator has been seen. A stream must
/// not end part way through a row: the final row needs a terminator and
/// every quote must be closed.
#[derive(Clone, Debug)]
pub struct Reader {
    mode: NewlineMode,
    state: State,
    pending: Option<PendingCr>,
}

impl Default for Reader {
    fn default() -> Reader {
        Reader {
            mode: NewlineMode::default(),
            state: State::ExpectCell,
            pending: None,
        }
    }
}

impl Reader {
    /// Create a new row assembler with the default configuration.
    pub fn new() -> Reader {
        ReaderBuilder::new().build()
    }

    /// The line ending convention this assembler recognizes.
    pub fn newline(&self) -> NewlineMode {
        self.mode
    }

    /// Reset the assembler such that it behaves as if it had never been used.
    pub fn reset(&mut self) {
        self.state = State::ExpectCell;
        self.pending = None;
    }

    /// Parse CSV text in `input`, appending cell data to `fields` and cell
    /// end offsets (relative to the start of `fields`) to `ends`.
    ///
    /// Returns the result along with the number of bytes of `input` that
    /// were consumed. On `ReadRowResult::Row`, `fields` and `ends` hold a
    /// complete row and the caller should clear them before the next row.
    ///
    /// An empty `input` signals the end of the stream.
    ///
    /// # Errors
    ///
    /// Quoting violations and streams that end part way through a row are
    /// reported as a `ParseError`. The assembler is reset afterwards, so
    /// the rest of the row is not recoverable.
    pub fn read_row(
        &mut self,
        input: &str,
        fields: &mut String,
        ends: &mut Vec<usize>,
    ) -> Result<(ReadRowResult, usize), ParseError> {
        let res = self.read_row_imp(input, fields, ends);
        if res.is_err() {
            self.reset();
        }
        res
    }

    fn read_row_imp(
        &mut self,
        input: &str,
        fields: &mut String,
        ends: &mut Vec<usize>,
    ) -> Result<(ReadRowResult, usize), ParseError> {
        if input.is_empty() {
            return self.finish(ends).map(|res| (res, 0));
        }
        let mut nin = 0;
        if let Some(pending) = self.pending.take() {
            if input.as_bytes()[0] == b'\n' {
                return Ok((ReadRowResult::Row, 1));
            }
            if self.mode != NewlineMode::CRLF {
                return Ok((ReadRowResult::Row, 0));
            }
            self.reopen(pending, fields, ends)?;
        }
        while nin < input.len() {
            let rest = &input[nin..];
            let s = seek(rest, self.mode, self.state == State::InQuote);
            nin += s.next;
            if self.step(s.reason, &rest[..s.end], fields, ends)? {
                return Ok((ReadRowResult::Row, nin));
            }
        }
        Ok((ReadRowResult::InputEmpty, nin))
    }

    /// Apply one scan result to the state machine. Returns true when the
    /// scan completed a row.
    fn step(
        &mut self,
        reason: BreakReason,
        fragment: &str,
        fields: &mut String,
        ends: &mut Vec<usize>,
    ) -> Result<bool, ParseError> {
        use self::BreakReason::*;
        use self::State::*;

        match (self.state, reason) {
            (ExpectCell, Separator)
            | (ExpectCell, LineEnding)
            | (ExpectCell, CrAtEndOfBuffer)
            | (Continuing, Separator)
            | (Continuing, LineEnding)
            | (Continuing, CrAtEndOfBuffer) => {
                fields.push_str(fragment);
                ends.push(fields.len());
                self.state = ExpectCell;
                Ok(self.boundary(reason, PendingCr::Unquoted))
            }
            (ExpectCell, Quote) => {
                if !fragment.is_empty() {
                    return Err(ParseError::ContentBeforeQuote);
                }
                self.state = InQuote;
                Ok(false)
            }
            (ExpectCell, EndOfBuffer) | (Continuing, EndOfBuffer) => {
                fields.push_str(fragment);
                self.state = Continuing;
                Ok(false)
            }
            (Continuing, Quote) => Err(ParseError::ContentBeforeQuote),
            (InQuote, Quote) => {
                fields.push_str(fragment);
                self.state = AfterQuote;
                Ok(false)
            }
            (InQuote, EndOfBuffer) => {
                fields.push_str(fragment);
                Ok(false)
            }
            (InQuote, Separator)
            | (InQuote, LineEnding)
            | (InQuote, CrAtEndOfBuffer) => {
                unreachable!("separators and line endings are literal in quotes")
            }
            (AfterQuote, _) if !fragment.is_empty() => {
                Err(ParseError::ContentAfterQuote)
            }
            (AfterQuote, Quote) => {
                fields.push('"');
                self.state = InQuote;
                Ok(false)
            }
            (AfterQuote, Separator)
            | (AfterQuote, LineEnding)
            | (AfterQuote, CrAtEndOfBuffer) => {
                ends.push(fields.len());
                self.state = ExpectCell;
                Ok(self.boundary(reason, PendingCr::Quoted))
            }
            (AfterQuote, EndOfBuffer) => {
                unreachable!("a non-empty fragment after a quote is an error")
            }
        }
    }

    /// Handle the terminator of a committed cell.
    fn boundary(&mut self, reason: BreakReason, kind: PendingCr) -> bool {
        match reason {
            BreakReason::LineEnding => true,
            BreakReason::CrAtEndOfBuffer => {
                self.pending = Some(kind);
                false
            }
            _ => false,
        }
    }

    /// In CRLF mode, a trailing `\r` followed by anything but `\n` belongs
    /// to the cell it appeared to close.
    fn reopen(
        &mut self,
        pending: PendingCr,
        fields: &mut String,
        ends: &mut Vec<usize>,
    ) -> Result<(), ParseError> {
        match pending {
            PendingCr::Quoted => Err(ParseError::ContentAfterQuote),
            PendingCr::Unquoted => {
                ends.pop();
                fields.push('\r');
                self.state = State::Continuing;
                Ok(())
            }
        }
    }

    /// A pending `\r` at the end of the stream ends its row in every mode.
    fn finish(&mut self, ends: &[usize]) -> Result<ReadRowResult, ParseError> {
        if self.pending.take().is_some() {
            return Ok(ReadRowResult::Row);
        }
        if self.state == State::ExpectCell && ends.is_empty() {
            Ok(ReadRowResult::End)
        } else {
            Err(ParseError::UnexpectedEof)
        }
    }
}
