/*!
Text sources and sinks.

A `Reader` pulls text from a `Source` and a `Writer` pushes text into a
`Sink`. Both traits deal in `str` so that the CSV machinery never sees a
partial character. Adapters are provided for in-memory strings and for
anything implementing `std::io::Read` or `std::io::Write`.
*/

use std::cmp;
use std::io;
use std::str;

/// A stream of text that CSV data is read from.
pub trait Source {
    /// Append at most `max` bytes of text to `buf` and return how many bytes
    /// were appended.
    ///
    /// Implementations must never split a character. If the next character
    /// is wider than `max`, that one character is appended anyway, so a
    /// source with text remaining never returns `Ok(0)`. `Ok(0)` means the
    /// end of the stream, and every later call must return `Ok(0)` too.
    fn read(&mut self, max: usize, buf: &mut String) -> io::Result<usize>;

    /// Release the source. Called once when a reader's scope ends.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A destination for CSV text.
pub trait Sink {
    /// Write all of `s`.
    fn write(&mut self, s: &str) -> io::Result<()>;

    /// Push anything the sink itself buffers to its destination.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Release the sink. Called once when a writer's scope ends, after the
    /// writer's own buffer has been flushed.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a, S: Source + ?Sized> Source for &'a mut S {
    fn read(&mut self, max: usize, buf: &mut String) -> io::Result<usize> {
        (**self).read(max, buf)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn read(&mut self, max: usize, buf: &mut String) -> io::Result<usize> {
        (**self).read(max, buf)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl<'a, K: Sink + ?Sized> Sink for &'a mut K {
    fn write(&mut self, s: &str) -> io::Result<()> {
        (**self).write(s)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl<K: Sink + ?Sized> Sink for Box<K> {
    fn write(&mut self, s: &str) -> io::Result<()> {
        (**self).write(s)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl Sink for String {
    fn write(&mut self, s: &str) -> io::Result<()> {
        self.push_str(s);
        Ok(())
    }
}

/// The length of the longest prefix of `s` that is at most `max` bytes and
/// ends on a character boundary.
pub(crate) fn prefix_len(s: &str, max: usize) -> usize {
    if max >= s.len() {
        return s.len();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}

/// Like `prefix_len`, but never less than one character of a non-empty `s`.
fn chunk_len(s: &str, max: usize) -> usize {
    match prefix_len(s, max) {
        0 => s.chars().next().map_or(0, char::len_utf8),
        n => n,
    }
}

/// A source over borrowed text.
#[derive(Clone, Debug)]
pub struct StrSource<'a> {
    text: &'a str,
}

impl<'a> StrSource<'a> {
    /// Create a source that yields `text`.
    pub fn new(text: &'a str) -> StrSource<'a> {
        StrSource { text }
    }

    /// The text that has not been read yet.
    pub fn remaining(&self) -> &'a str {
        self.text
    }
}

impl<'a> Source for StrSource<'a> {
    fn read(&mut self, max: usize, buf: &mut String) -> io::Result<usize> {
        let n = chunk_len(self.text, max);
        buf.push_str(&self.text[..n]);
        self.text = &self.text[n..];
        Ok(n)
    }
}

const IO_CHUNK: usize = 8 * 1024;

/// A source that decodes UTF-8 from an `io::Read`.
///
/// Characters split across reads of the underlying reader are carried over
/// to the next read. Invalid UTF-8 is reported as an error of kind
/// `io::ErrorKind::InvalidData`.
#[derive(Debug)]
pub struct IoSource<R> {
    rdr: R,
    raw: Vec<u8>,
    pos: usize,
    /// Length of the prefix of `raw[pos..]` known to be valid UTF-8.
    valid: usize,
    eof: bool,
}

impl<R: io::Read> IoSource<R> {
    /// Wrap an `io::Read`.
    pub fn new(rdr: R) -> IoSource<R> {
        IoSource {
            rdr,
            raw: Vec::with_capacity(IO_CHUNK),
            pos: 0,
            valid: 0,
            eof: false,
        }
    }

    /// Gets a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.rdr
    }

    /// Gets a mutable reference to the underlying reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.rdr
    }

    /// Unwraps this source, returning the underlying reader.
    ///
    /// Bytes read from it but not yet decoded are lost.
    pub fn into_inner(self) -> R {
        self.rdr
    }

    fn refill(&mut self) -> io::Result<()> {
        self.raw.drain(..self.pos);
        self.pos = 0;
        let start = self.raw.len();
        self.raw.resize(start + IO_CHUNK, 0);
        let res = loop {
            match self.rdr.read(&mut self.raw[start..]) {
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {}
                res => break res,
            }
        };
        let n = match res {
            Ok(n) => n,
            Err(err) => {
                self.raw.truncate(start);
                return Err(err);
            }
        };
        self.raw.truncate(start + n);
        if n == 0 {
            self.eof = true;
        }
        Ok(())
    }
}

impl<R: io::Read> Source for IoSource<R> {
    fn read(&mut self, max: usize, buf: &mut String) -> io::Result<usize> {
        loop {
            if self.valid == 0 {
                let pending = &self.raw[self.pos..];
                match str::from_utf8(pending) {
                    Ok(_) => self.valid = pending.len(),
                    Err(err) => {
                        self.valid = err.valid_up_to();
                        let broken = err.error_len().is_some() || self.eof;
                        if self.valid == 0 && broken {
                            return Err(io::Error::new(
                                io::ErrorKind::InvalidData,
                                err,
                            ));
                        }
                    }
                }
            }
            if self.valid > 0 {
                // Only the bytes handed out are checked again, plus room for
                // one character that straddles `max`.
                let len = cmp::min(self.valid, max.saturating_add(3));
                let window = &self.raw[self.pos..self.pos + len];
                let text = match str::from_utf8(window) {
                    Ok(text) => text,
                    Err(err) => {
                        let valid = &window[..err.valid_up_to()];
                        str::from_utf8(valid).unwrap_or_default()
                    }
                };
                let n = chunk_len(text, max);
                buf.push_str(&text[..n]);
                self.pos += n;
                self.valid -= n;
                return Ok(n);
            }
            if self.eof && self.pos == self.raw.len() {
                return Ok(0);
            }
            self.refill()?;
        }
    }
}

/// A sink that writes UTF-8 to an `io::Write`.
///
/// `close` flushes the underlying writer. The writer itself is closed when
/// it is dropped.
#[derive(Debug)]
pub struct IoSink<W> {
    wtr: W,
}

impl<W: io::Write> IoSink<W> {
    /// Wrap an `io::Write`.
    pub fn new(wtr: W) -> IoSink<W> {
        IoSink { wtr }
    }

    /// Gets a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.wtr
    }

    /// Gets a mutable reference to the underlying writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.wtr
    }

    /// Unwraps this sink, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.wtr
    }
}

impl<W: io::Write> Sink for IoSink<W> {
    fn write(&mut self, s: &str) -> io::Result<()> {
        self.wtr.write_all(s.as_bytes())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.wtr.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        self.wtr.flush()
    }
}
