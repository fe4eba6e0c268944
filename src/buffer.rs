//! A growable line-oriented read buffer, the staging area every other module
//! reads bytes out of.
use std::borrow::Cow;
use std::io::Read;
use std::mem::swap;
use std::ops::{Index, Range, RangeFrom, RangeFull, RangeTo};
use std::ptr;

use memchr::memchr;

use crate::error::{Error, ErrorKind};

/// Default buffer size.
pub const BUFFER_SIZE: usize = 4096;

/// Wraps a `Box<dyn Read>` to allow buffered, growable reading.
///
/// Primary differences from `std::io::BufReader`:
///  - the residual (unconsumed) bytes are kept between refills instead of
///    being dropped
///  - the buffer is doubled in size if a caller asks for more data than it
///    can currently hold
///  - end-of-stream is tracked explicitly so callers can distinguish "need
///    more data" from "there is no more data"
pub struct ReadBuffer<'s> {
    /// The primary buffer; reloaded from `reader` when needed.
    pub buffer: Cow<'s, [u8]>,
    reader: Box<dyn Read + 's>,
    /// The total amount of data read before byte 0 of this buffer.
    pub reader_pos: u64,
    /// The number of records consumed so far (used for error messages).
    pub record_pos: u64,
    /// The amount of the buffer that's been marked as used.
    pub consumed: usize,
    /// True once the underlying reader has been exhausted.
    pub eof: bool,
}

impl<'s> ReadBuffer<'s> {
    /// Create a new `ReadBuffer` from `reader` using the default capacity.
    pub fn new(reader: Box<dyn Read + 's>) -> Result<Self, Error> {
        Self::with_capacity(BUFFER_SIZE, reader)
    }

    /// Create a new `ReadBuffer` from `reader` with the given initial capacity.
    pub fn with_capacity(buffer_size: usize, mut reader: Box<dyn Read + 's>) -> Result<Self, Error> {
        let mut buffer = vec![0; buffer_size];
        let amt_read = reader.read(&mut buffer)?;
        buffer.truncate(amt_read);
        let eof = amt_read != buffer_size;

        Ok(ReadBuffer {
            buffer: Cow::Owned(buffer),
            reader,
            reader_pos: 0,
            record_pos: 0,
            consumed: 0,
            eof,
        })
    }

    /// Create a `ReadBuffer` over an in-memory slice; it has no reader behind
    /// it so it is already at EOF.
    pub fn from_slice(slice: &'s [u8]) -> Self {
        ReadBuffer {
            buffer: Cow::Borrowed(slice),
            reader: Box::new(std::io::Cursor::new(&b""[..])),
            reader_pos: 0,
            record_pos: 0,
            consumed: 0,
            eof: true,
        }
    }

    /// Refill the buffer from the reader. If nothing has been consumed since
    /// the last refill the buffer's capacity is doubled first.
    pub fn refill(&mut self) -> Result<(), Error> {
        if self.eof {
            return Ok(());
        }

        let mut tmp_buffer = Cow::Borrowed(&b""[..]);
        swap(&mut self.buffer, &mut tmp_buffer);
        let mut buffer = tmp_buffer.into_owned();

        self.reader_pos += self.consumed as u64;

        let mut capacity = buffer.capacity();
        if self.consumed == 0 {
            buffer.reserve(2 * capacity.max(BUFFER_SIZE));
            capacity = buffer.capacity();
        }

        let len = buffer.len() - self.consumed;
        unsafe {
            let new_ptr = buffer.as_mut_ptr();
            let old_ptr = new_ptr.add(self.consumed);
            ptr::copy(old_ptr, new_ptr, len);
            buffer.set_len(capacity);
        }

        let amt_read = self.reader.read(&mut buffer[len..]).map_err(Error::from)?;
        unsafe {
            buffer.set_len(len + amt_read);
        }
        self.consumed = 0;
        swap(&mut Cow::Owned(buffer), &mut self.buffer);
        if amt_read == 0 {
            self.eof = true;
        }

        Ok(())
    }

    /// Like `refill`, but keeps refilling until at least `amt` bytes are
    /// available or the stream is exhausted.
    pub fn reserve(&mut self, amt: usize) -> Result<(), Error> {
        if self.len() < amt && self.eof {
            return Err(
                Error::new(ErrorKind::EndOfStream, "data ended prematurely").add_context(self)
            );
        }
        while self.len() < amt {
            self.refill()?;
        }
        Ok(())
    }

    /// Skip forward in the buffer until `pat` is found, refilling as needed.
    /// Returns `false` if EOF is reached first.
    pub fn seek_pattern(&mut self, pat: &[u8]) -> Result<bool, Error> {
        loop {
            if let Some(pos) = memchr(pat[0], &self[..]) {
                if self.len() - pos >= pat.len() && &self[pos..pos + pat.len()] == pat {
                    self.partial_consume(pos);
                    break;
                }
            } else if self.eof() {
                return Ok(false);
            }
            let skip = self.len().saturating_sub(pat.len().saturating_sub(1));
            self.partial_consume(skip);
            self.refill()?;
        }
        Ok(true)
    }

    /// Mark `amt` bytes of the buffer as used and bump the record counter.
    /// Call this once a whole record has been consumed.
    pub fn consume(&mut self, amt: usize) -> &[u8] {
        self.record_pos += 1;
        self.partial_consume(amt)
    }

    /// Mark `amt` bytes of the buffer as used without bumping the record
    /// counter.
    pub fn partial_consume(&mut self, amt: usize) -> &[u8] {
        let start = self.consumed;
        self.consumed += amt;
        &self.buffer[start..self.consumed]
    }

    /// True if this is the final chunk before the stream ends.
    pub fn eof(&self) -> bool {
        self.eof
    }

    /// True if every byte currently in the buffer has been consumed.
    pub fn is_empty(&self) -> bool {
        self.consumed >= self.buffer.len()
    }

    /// The number of unconsumed bytes left in the buffer.
    pub fn len(&self) -> usize {
        self.buffer.len() - self.consumed
    }

    /// The (record, byte) position the reader is currently at.
    pub fn get_pos(&self) -> (u64, u64) {
        (self.record_pos, self.get_byte_pos())
    }

    /// The absolute byte offset into the stream the reader is currently at.
    pub fn get_byte_pos(&self) -> u64 {
        self.reader_pos + self.consumed as u64
    }

    /// Read a single line out of the buffer, refilling as needed.
    ///
    /// Lines are assumed to be terminated with `\n`, optionally preceded by
    /// `\r`. The final line of a stream need not be newline-terminated.
    pub fn read_line(&mut self) -> Result<Option<&[u8]>, Error> {
        if self.is_empty() {
            return Ok(None);
        }
        let (end, to_consume) = loop {
            if let Some(e) = memchr(b'\n', &self[..]) {
                if self[..e].last() == Some(&b'\r') {
                    break (e - 1, e + 1);
                }
                break (e, e + 1);
            } else if self.eof() {
                let l = self.len();
                break (l, l);
            }
            self.refill()?;
        };

        let buffer = self.consume(to_consume);
        Ok(Some(&buffer[..end]))
    }
}

macro_rules! impl_index {
    ($index:ty, $return:ty) => {
        impl<'r> Index<$index> for ReadBuffer<'r> {
            type Output = $return;

            fn index(&self, index: $index) -> &Self::Output {
                &self.buffer[self.consumed..][index]
            }
        }
    };
}

impl_index!(Range<usize>, [u8]);
impl_index!(RangeFrom<usize>, [u8]);
impl_index!(RangeTo<usize>, [u8]);
impl_index!(RangeFull, [u8]);
impl_index!(usize, u8);

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::ReadBuffer;
    use crate::error::Error;

    #[test]
    fn test_buffer() -> Result<(), Error> {
        let reader = Box::new(Cursor::new(b"123456"));
        let mut rb = ReadBuffer::new(reader)?;

        assert_eq!(&rb[..], b"123456");
        rb.consume(3);
        assert_eq!(&rb[..], b"456");
        Ok(())
    }

    #[test]
    fn test_buffer_small() -> Result<(), Error> {
        let reader = Box::new(Cursor::new(b"123456"));
        let mut rb = ReadBuffer::with_capacity(3, reader)?;

        assert_eq!(&rb[..], b"123");
        assert_eq!(rb.consume(3), b"123");
        assert_eq!(&rb[..], b"");

        rb.refill()?;
        assert_eq!(&rb[..], b"456");
        Ok(())
    }

    #[test]
    fn test_read_lines() -> Result<(), Error> {
        let reader = Box::new(Cursor::new(b"1\n2\n3"));
        let mut rb = ReadBuffer::with_capacity(3, reader)?;

        let mut ix = 0;
        while let Some(l) = rb.read_line()? {
            match ix {
                0 => assert_eq!(l, b"1"),
                1 => assert_eq!(l, b"2"),
                2 => assert_eq!(l, b"3"),
                _ => panic!("buffer tried to read too far"),
            }
            ix += 1;
        }
        assert_eq!(ix, 3);
        Ok(())
    }

    #[test]
    fn test_read_lines_crlf() -> Result<(), Error> {
        let mut rb = ReadBuffer::from_slice(b"1\r\n2\r\n3");
        let mut lines = Vec::new();
        while let Some(l) = rb.read_line()? {
            lines.push(l.to_vec());
        }
        assert_eq!(lines, vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec()]);
        Ok(())
    }

    #[test]
    fn test_seek_pattern() -> Result<(), Error> {
        let mut rb = ReadBuffer::from_slice(b"1\n2\n3");
        assert!(rb.seek_pattern(b"1")?);
        assert_eq!(&rb[..], b"1\n2\n3");
        assert!(rb.seek_pattern(b"3")?);
        assert_eq!(&rb[..], b"3");
        assert!(!rb.seek_pattern(b"1")?);
        Ok(())
    }
}
