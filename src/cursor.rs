use crate::parser::{ParseError, Result};
use byteorder::{BigEndian, ByteOrder};
use std::io::{self, ErrorKind, Read};

/// Forward-only reader over a byte source.
///
/// Every read either returns exactly the requested bytes or fails with
/// [`ParseError::Truncated`]. There is no seeking; the cursor only counts
/// how many bytes it has consumed so errors can report an offset.
pub struct ByteCursor<R> {
    inner: R,
    pos: u64,
}

impl<R: Read> ByteCursor<R> {
    pub fn new(inner: R) -> Self {
        Self::with_offset(inner, 0)
    }

    /// Cursor whose reported positions start at `offset`, used when
    /// decoding a payload that was lifted out of a larger source.
    pub fn with_offset(inner: R, offset: u64) -> Self {
        Self { inner, pos: offset }
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    // Reads until `buf` is full or the source is exhausted.
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut got = 0;
        while got < buf.len() {
            match self.inner.read(&mut buf[got..]) {
                Ok(0) => break,
                Ok(n) => got += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.pos += got as u64;
        Ok(got)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let offset = self.pos;
        let mut buf = [0u8; N];
        let got = self.fill(&mut buf)?;
        if got < N {
            return Err(ParseError::Truncated { offset, needed: N as u64, available: got as u64 });
        }
        Ok(buf)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(&self.read_array::<2>()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(&self.read_array::<4>()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(BigEndian::read_u64(&self.read_array::<8>()?))
    }

    /// Like [`read_u32`](Self::read_u32), but a source that is already
    /// exhausted yields `None` instead of an error.
    pub fn try_read_u32(&mut self) -> Result<Option<u32>> {
        let offset = self.pos;
        let mut buf = [0u8; 4];
        match self.fill(&mut buf)? {
            0 => Ok(None),
            4 => Ok(Some(BigEndian::read_u32(&buf))),
            got => Err(ParseError::Truncated { offset, needed: 4, available: got as u64 }),
        }
    }

    /// Read exactly `len` bytes. The buffer grows with what the source
    /// actually delivers, so a bogus length cannot force a huge allocation.
    pub fn read_bytes(&mut self, len: u64) -> Result<Vec<u8>> {
        let offset = self.pos;
        let mut buf = Vec::new();
        (&mut self.inner).take(len).read_to_end(&mut buf)?;
        self.pos += buf.len() as u64;
        if (buf.len() as u64) < len {
            return Err(ParseError::Truncated { offset, needed: len, available: buf.len() as u64 });
        }
        Ok(buf)
    }

    /// Consume and discard exactly `len` bytes.
    pub fn skip(&mut self, len: u64) -> Result<()> {
        let offset = self.pos;
        let got = io::copy(&mut (&mut self.inner).take(len), &mut io::sink())?;
        self.pos += got;
        if got < len {
            return Err(ParseError::Truncated { offset, needed: len, available: got });
        }
        Ok(())
    }

    /// Everything left in the source.
    pub fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.inner.read_to_end(&mut buf)?;
        self.pos += buf.len() as u64;
        Ok(buf)
    }
}
