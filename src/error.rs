use std::error;
use std::fmt;
use std::io;
use std::result;

use fastcsv_core::{InvalidNewline, ParseError, WriteError};

use crate::reader::Position;

/// A type alias for `Result<T, fastcsv::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// An error that can occur when processing CSV data.
///
/// This error can happen when writing or reading CSV data.
#[derive(Debug)]
pub enum Error {
    /// An I/O error that occurred while reading from a source or writing to
    /// a sink. This includes invalid UTF-8 found by `IoSource`.
    Io(io::Error),
    /// A reader or writer was configured with an unsupported value.
    InvalidConfiguration(InvalidNewline),
    /// The CSV data broke the quoting rules.
    Malformed {
        /// The position of the start of the row in which this error
        /// occurred.
        pos: Position,
        /// The quoting violation.
        err: ParseError,
    },
    /// The CSV data ended part way through a row, or inside a quote.
    Truncated {
        /// The position of the start of the unfinished row.
        pos: Position,
    },
    /// The writer was configured with a quoting style that cannot write.
    NotImplemented(WriteError),
    /// A value could not be converted into a cell.
    InvalidValue(String),
    /// `enter` was called on a reader or writer that was already entered.
    AlreadyEntered,
}

impl Error {
    /// Returns true if this is an I/O error.
    pub fn is_io_error(&self) -> bool {
        match *self {
            Error::Io(_) => true,
            _ => false,
        }
    }

    /// Return the position for this error, if one exists.
    pub fn position(&self) -> Option<&Position> {
        match *self {
            Error::Malformed { ref pos, .. } => Some(pos),
            Error::Truncated { ref pos } => Some(pos),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<InvalidNewline> for Error {
    fn from(err: InvalidNewline) -> Error {
        Error::InvalidConfiguration(err)
    }
}

impl From<WriteError> for Error {
    fn from(err: WriteError) -> Error {
        Error::NotImplemented(err)
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        match err {
            Error::Io(err) => err,
            err => io::Error::new(io::ErrorKind::Other, err),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            Error::InvalidConfiguration(ref err) => Some(err),
            Error::Malformed { ref err, .. } => Some(err),
            Error::NotImplemented(ref err) => Some(err),
            Error::Truncated { .. }
            | Error::InvalidValue(_)
            | Error::AlreadyEntered => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref err) => err.fmt(f),
            Error::InvalidConfiguration(ref err) => {
                write!(f, "CSV configuration error: {}", err)
            }
            Error::Malformed { ref pos, ref err } => write!(
                f,
                "CSV parse error: row {} (byte {}, line {}): {}",
                pos.row(),
                pos.byte(),
                pos.line(),
                err
            ),
            Error::Truncated { ref pos } => write!(
                f,
                "CSV parse error: row {} (byte {}, line {}): \
                 unexpected end of data",
                pos.row(),
                pos.byte(),
                pos.line()
            ),
            Error::NotImplemented(ref err) => {
                write!(f, "CSV write error: {}", err)
            }
            Error::InvalidValue(ref msg) => {
                write!(f, "CSV write error: {}", msg)
            }
            Error::AlreadyEntered => {
                write!(f, "CSV error: reader or writer was already entered")
            }
        }
    }
}

/// `IntoInnerError` occurs when consuming a `Writer` fails.
///
/// Consuming the `Writer` causes a flush to happen. If the flush fails, then
/// this error is returned, which contains both the original `Writer` and
/// the error that occurred.
///
/// The type parameter `W` is the unconsumed writer.
pub struct IntoInnerError<W> {
    wtr: W,
    err: Error,
}

impl<W> IntoInnerError<W> {
    pub(crate) fn new(wtr: W, err: Error) -> IntoInnerError<W> {
        IntoInnerError { wtr, err }
    }

    /// Returns the error which caused the call to `into_inner` to fail.
    pub fn error(&self) -> &Error {
        &self.err
    }

    /// Returns the underlying writer which generated the error.
    ///
    /// The returned value can be used for error recovery, such as
    /// re-inspecting the buffer.
    pub fn into_inner(self) -> W {
        self.wtr
    }
}

impl<W: std::any::Any> error::Error for IntoInnerError<W> {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&self.err)
    }
}

impl<W> fmt::Display for IntoInnerError<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.err.fmt(f)
    }
}

impl<W> fmt::Debug for IntoInnerError<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.err.fmt(f)
    }
}

#[cfg(feature = "serde")]
impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Error {
        Error::InvalidValue(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as StdError;
    use std::io;

    use fastcsv_core::{NewlineMode, ParseError};

    use super::Error;
    use crate::reader::Position;

    #[test]
    fn display_carries_position() {
        let err = Error::Malformed {
            pos: Position::new(),
            err: ParseError::ContentAfterQuote,
        };
        assert_eq!(
            err.to_string(),
            "CSV parse error: row 0 (byte 0, line 1): content after quote"
        );
        assert!(err.source().is_some());
        assert_eq!(err.position(), Some(&Position::new()));
    }

    #[test]
    fn invalid_newline_converts() {
        let err: Error = NewlineMode::from_config(Some("x")).unwrap_err().into();
        match err {
            Error::InvalidConfiguration(ref e) => assert_eq!(e.value(), "x"),
            ref err => panic!("unexpected error: {:?}", err),
        }
    }

    #[test]
    fn io_round_trip() {
        let err = Error::from(io::Error::new(io::ErrorKind::BrokenPipe, "x"));
        assert!(err.is_io_error());
        let err: io::Error = err.into();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);

        let err: io::Error = Error::AlreadyEntered.into();
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }
}
