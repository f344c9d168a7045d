// Two small buffers sit between the CSV state machines and the outside
// world: `ChunkBuffer` holds the chunk most recently pulled from a source,
// and `OutputBuffer` batches escaped text before it reaches a sink.
use std::cmp;
use std::io;

use tracing::trace;

use crate::stream::{prefix_len, Sink, Source};

pub(crate) const DEFAULT_CHUNK_SIZE: usize = 1024;
pub(crate) const DEFAULT_OUTPUT_CAPACITY: usize = 1024;

/// Every character fits in an empty buffer of this size.
pub(crate) const MIN_OUTPUT_CAPACITY: usize = 4;

/// The chunk of source text currently being parsed.
#[derive(Debug)]
pub(crate) struct ChunkBuffer {
    buf: String,
    pos: usize,
    chunk_size: usize,
    eof: bool,
}

impl ChunkBuffer {
    pub fn new(chunk_size: usize) -> ChunkBuffer {
        let chunk_size = cmp::max(1, chunk_size);
        ChunkBuffer {
            buf: String::with_capacity(chunk_size),
            pos: 0,
            chunk_size,
            eof: false,
        }
    }

    /// Return the unconsumed text, pulling a new chunk from `src` if the
    /// current one is exhausted. An empty result means the source has ended.
    pub fn fill_buf<S: Source + ?Sized>(
        &mut self,
        src: &mut S,
    ) -> io::Result<&str> {
        if self.pos >= self.buf.len() && !self.eof {
            self.buf.clear();
            self.pos = 0;
            let n = src.read(self.chunk_size, &mut self.buf)?;
            trace!(requested = self.chunk_size, got = n, "refilled chunk");
            if n == 0 {
                self.eof = true;
            }
        }
        Ok(&self.buf[self.pos..])
    }

    pub fn consume(&mut self, n: usize) {
        self.pos = cmp::min(self.pos + n, self.buf.len());
    }
}

/// A fixed capacity text buffer in front of a sink.
///
/// The buffer never grows. Text that does not fit is split on a character
/// boundary: the buffer is filled, flushed and refilled with the rest. A
/// full buffer is only written out when more text arrives or on `flush`.
///
/// A mark can be set at the start of a row so that a row which fails part
/// way through can be taken back out of the buffer. Whatever was already
/// written to the sink stays there.
#[derive(Debug)]
pub(crate) struct OutputBuffer {
    buf: String,
    cap: usize,
    mark: Option<usize>,
}

impl OutputBuffer {
    pub fn new(cap: usize) -> OutputBuffer {
        let cap = cmp::max(MIN_OUTPUT_CAPACITY, cap);
        OutputBuffer { buf: String::with_capacity(cap), cap, mark: None }
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn push_str<K: Sink + ?Sized>(
        &mut self,
        mut s: &str,
        sink: &mut K,
    ) -> io::Result<()> {
        while !s.is_empty() {
            let n = prefix_len(s, self.cap - self.buf.len());
            if n == 0 {
                self.write_out(sink)?;
                continue;
            }
            self.buf.push_str(&s[..n]);
            s = &s[n..];
        }
        Ok(())
    }

    /// Write the buffered text to the sink, then flush the sink.
    pub fn flush<K: Sink + ?Sized>(&mut self, sink: &mut K) -> io::Result<()> {
        self.write_out(sink)?;
        sink.flush()
    }

    fn write_out<K: Sink + ?Sized>(&mut self, sink: &mut K) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        trace!(len = self.buf.len(), "flushing output buffer");
        sink.write(&self.buf)?;
        self.buf.clear();
        if self.mark.is_some() {
            self.mark = Some(0);
        }
        Ok(())
    }

    pub fn mark(&mut self) {
        self.mark = Some(self.buf.len());
    }

    pub fn commit(&mut self) {
        self.mark = None;
    }

    /// Drop everything buffered since the mark.
    pub fn rollback(&mut self) {
        if let Some(mark) = self.mark.take() {
            self.buf.truncate(mark);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::{ChunkBuffer, OutputBuffer};
    use crate::stream::{Sink, StrSource};

    #[derive(Debug, Default)]
    struct Recorder {
        writes: Vec<String>,
        flushes: usize,
    }

    impl Sink for Recorder {
        fn write(&mut self, s: &str) -> io::Result<()> {
            self.writes.push(s.to_string());
            Ok(())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    #[test]
    fn chunks_follow_chunk_size() {
        let mut src = StrSource::new("abcde");
        let mut buf = ChunkBuffer::new(2);
        assert_eq!(buf.fill_buf(&mut src).unwrap(), "ab");
        buf.consume(1);
        assert_eq!(buf.fill_buf(&mut src).unwrap(), "b");
        buf.consume(1);
        assert_eq!(buf.fill_buf(&mut src).unwrap(), "cd");
        buf.consume(2);
        assert_eq!(buf.fill_buf(&mut src).unwrap(), "e");
        buf.consume(1);
        assert_eq!(buf.fill_buf(&mut src).unwrap(), "");
        assert_eq!(buf.fill_buf(&mut src).unwrap(), "");
    }

    #[test]
    fn full_buffer_is_flushed_lazily() {
        let mut sink = Recorder::default();
        let mut buf = OutputBuffer::new(4);
        buf.push_str("abcd", &mut sink).unwrap();
        assert!(sink.writes.is_empty());
        buf.push_str("e", &mut sink).unwrap();
        assert_eq!(sink.writes, vec!["abcd"]);
        assert_eq!(buf.as_str(), "e");
    }

    #[test]
    fn long_text_is_split() {
        let mut sink = Recorder::default();
        let mut buf = OutputBuffer::new(4);
        buf.push_str("abcdefghij", &mut sink).unwrap();
        assert_eq!(sink.writes, vec!["abcd", "efgh"]);
        assert_eq!(buf.as_str(), "ij");
    }

    #[test]
    fn split_keeps_chars_whole() {
        let mut sink = Recorder::default();
        let mut buf = OutputBuffer::new(4);
        buf.push_str("ab€", &mut sink).unwrap();
        assert_eq!(sink.writes, vec!["ab"]);
        assert_eq!(buf.as_str(), "€");
    }

    #[test]
    fn minimum_capacity() {
        assert_eq!(OutputBuffer::new(0).capacity(), 4);
        assert_eq!(OutputBuffer::new(100).capacity(), 100);
    }

    #[test]
    fn flush_twice_writes_once() {
        let mut sink = Recorder::default();
        let mut buf = OutputBuffer::new(16);
        buf.push_str("abc", &mut sink).unwrap();
        buf.flush(&mut sink).unwrap();
        buf.flush(&mut sink).unwrap();
        assert_eq!(sink.writes, vec!["abc"]);
        assert_eq!(sink.flushes, 2);
    }

    #[test]
    fn rollback_to_mark() {
        let mut sink = Recorder::default();
        let mut buf = OutputBuffer::new(16);
        buf.push_str("row1\n", &mut sink).unwrap();
        buf.mark();
        buf.push_str("par", &mut sink).unwrap();
        buf.rollback();
        assert_eq!(buf.as_str(), "row1\n");

        buf.mark();
        buf.push_str("row2\n", &mut sink).unwrap();
        buf.commit();
        buf.rollback();
        assert_eq!(buf.as_str(), "row1\nrow2\n");
    }

    #[test]
    fn rollback_after_flush_keeps_flushed_text() {
        let mut sink = Recorder::default();
        let mut buf = OutputBuffer::new(4);
        buf.push_str("ab", &mut sink).unwrap();
        buf.mark();
        buf.push_str("cdef", &mut sink).unwrap();
        assert_eq!(sink.writes, vec!["abcd"]);
        buf.rollback();
        assert_eq!(buf.as_str(), "");
    }
}
