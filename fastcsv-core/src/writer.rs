use std::error;
use std::fmt;

use memchr::memchr;

/// The quoting style to use when writing CSV data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QuoteStyle {
    /// This puts quotes around every field. Always.
    ///
    /// This is the default.
    Always,
    /// This puts quotes around fields only when necessary.
    ///
    /// This "strict" style is accepted as configuration, but writing a row
    /// with it always fails with `WriteError::NotImplemented`.
    Necessary,
}

impl Default for QuoteStyle {
    fn default() -> QuoteStyle {
        QuoteStyle::Always
    }
}

/// An error that occurs when a row cannot be written with the configured
/// quoting style.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriteError {
    /// The quoting style has no implementation.
    NotImplemented(QuoteStyle),
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            WriteError::NotImplemented(style) => {
                write!(f, "quote style {:?} is not implemented", style)
            }
        }
    }
}

impl error::Error for WriteError {}

/// A builder for configuring a cell escaper.
#[derive(Debug, Default)]
pub struct WriterBuilder {
    wtr: Writer,
}

impl WriterBuilder {
    /// Create a new builder for configuring a cell escaper.
    pub fn new() -> WriterBuilder {
        WriterBuilder::default()
    }

    /// Build a cell escaper from this configuration.
    pub fn build(&self) -> Writer {
        self.wtr.clone()
    }

    /// The quoting style to use when writing CSV.
    ///
    /// By default, this is set to `QuoteStyle::Always`.
    pub fn quote_style(&mut self, style: QuoteStyle) -> &mut WriterBuilder {
        self.wtr.style = style;
        self
    }
}

/// A cell escaper for CSV data.
///
/// The escaper doesn't own an output buffer. `field` returns an iterator of
/// string pieces which, concatenated, form the separator (if any) and the
/// escaped cell. The caller copies them wherever it likes and calls
/// `end_row` after writing its own row terminator.
#[derive(Clone, Debug)]
pub struct Writer {
    first_field_in_row: bool,
    style: QuoteStyle,
}

impl Default for Writer {
    fn default() -> Writer {
        Writer { first_field_in_row: true, style: QuoteStyle::default() }
    }
}

impl Writer {
    /// Creates a new cell escaper with the default configuration.
    pub fn new() -> Writer {
        Writer::default()
    }

    /// The configured quoting style.
    pub fn quote_style(&self) -> QuoteStyle {
        self.style
    }

    /// Check that a row can be written at all.
    ///
    /// This must be called before the first field of every row.
    pub fn start_row(&mut self) -> Result<(), WriteError> {
        match self.style {
            QuoteStyle::Always => {
                self.first_field_in_row = true;
                Ok(())
            }
            QuoteStyle::Necessary => {
                Err(WriteError::NotImplemented(self.style))
            }
        }
    }

    /// Escape a single field.
    ///
    /// `None` is the null marker. It is written as an empty quoted field.
    pub fn field<'a>(&mut self, value: Option<&'a str>) -> Field<'a> {
        let separator = !self.first_field_in_row;
        self.first_field_in_row = false;
        Field {
            stage: if separator { Stage::Separator } else { Stage::Open },
            quote: self.style == QuoteStyle::Always,
            rest: value.unwrap_or(""),
            doubled: false,
        }
    }

    /// Mark the end of the current row.
    pub fn end_row(&mut self) {
        self.first_field_in_row = true;
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Stage {
    Separator,
    Open,
    Body,
    Close,
    Done,
}

/// An iterator over the pieces of one escaped field.
///
/// Every quote in the value is emitted followed by a second quote.
#[derive(Clone, Debug)]
pub struct Field<'a> {
    stage: Stage,
    quote: bool,
    rest: &'a str,
    doubled: bool,
}

impl<'a> Iterator for Field<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        loop {
            match self.stage {
                Stage::Separator => {
                    self.stage = Stage::Open;
                    return Some(",");
                }
                Stage::Open => {
                    self.stage = Stage::Body;
                    if self.quote {
                        return Some("\"");
                    }
                }
                Stage::Body => {
                    if self.doubled {
                        self.doubled = false;
                        return Some("\"");
                    }
                    if self.rest.is_empty() {
                        self.stage = Stage::Close;
                        continue;
                    }
                    let piece = match memchr(b'"', self.rest.as_bytes()) {
                        None => {
                            self.stage = Stage::Close;
                            self.rest
                        }
                        Some(i) => {
                            self.doubled = true;
                            &self.rest[..i + 1]
                        }
                    };
                    self.rest = &self.rest[piece.len()..];
                    return Some(piece);
                }
                Stage::Close => {
                    self.stage = Stage::Done;
                    if self.quote {
                        return Some("\"");
                    }
                }
                Stage::Done => return None,
            }
        }
    }
}
