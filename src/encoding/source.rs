//! Positioned byte source over any [`Read`].
//!
//! Wraps the caller's reader with a one-byte lookahead and a running offset
//! so that every [`FormatError`] can point at the byte that caused it.
//! Single-byte reads go straight to the inner reader, so file-backed sources
//! should be buffered.

use std::io::{ErrorKind, Read};

use crate::errors::{Error, FormatError, Result};

pub(crate) struct ByteSource<R> {
    inner: R,
    position: u64,
    peeked: Option<u8>,
}

impl<R> ByteSource<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self {
            inner,
            position: 0,
            peeked: None,
        }
    }

    /// Offset of the next byte to be consumed.
    pub(crate) fn position(&self) -> u64 {
        self.position
    }

    pub(crate) fn get_ref(&self) -> &R {
        &self.inner
    }

    pub(crate) fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub(crate) fn into_inner(self) -> R {
        self.inner
    }

    /// Forget the lookahead and restart offsets at zero; the caller is
    /// responsible for repositioning the inner reader.
    pub(crate) fn reset(&mut self) {
        self.position = 0;
        self.peeked = None;
    }
}

impl<R: Read> ByteSource<R> {
    fn read_raw_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(error) if error.kind() == ErrorKind::Interrupted => {}
                Err(error) => return Err(error.into()),
            }
        }
    }

    /// Look at the next byte without consuming it. `None` at end of input.
    pub(crate) fn peek_byte(&mut self) -> Result<Option<u8>> {
        if self.peeked.is_none() {
            self.peeked = self.read_raw_byte()?;
        }
        Ok(self.peeked)
    }

    /// Consume the next byte. `None` at end of input.
    pub(crate) fn next_byte(&mut self) -> Result<Option<u8>> {
        let byte = match self.peeked.take() {
            Some(byte) => Some(byte),
            None => self.read_raw_byte()?,
        };
        if byte.is_some() {
            self.position += 1;
        }
        Ok(byte)
    }

    /// Consume the next byte, treating end of input as truncation.
    pub(crate) fn read_byte(&mut self) -> Result<u8> {
        self.next_byte()?
            .ok_or_else(|| FormatError::UnexpectedEof(self.position).into())
    }

    /// Consume exactly `N` bytes.
    pub(crate) fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let start = self.position;
        let mut buf = [0u8; N];
        let mut filled = 0;
        if N > 0 {
            if let Some(byte) = self.peeked.take() {
                buf[0] = byte;
                filled = 1;
            }
        }
        self.inner
            .read_exact(&mut buf[filled..])
            .map_err(|error| eof_as_truncation(error, start))?;
        self.position += N as u64;
        Ok(buf)
    }

    /// Consume exactly `len` bytes.
    ///
    /// The buffer grows with the data actually read, so a corrupt length
    /// prefix cannot trigger a huge up-front allocation.
    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let start = self.position;
        let mut buf = Vec::new();
        if len == 0 {
            return Ok(buf);
        }
        if let Some(byte) = self.peeked.take() {
            buf.push(byte);
        }
        let remaining = (len - buf.len()) as u64;
        (&mut self.inner)
            .take(remaining)
            .read_to_end(&mut buf)
            .map_err(|error| eof_as_truncation(error, start))?;
        if buf.len() < len {
            return Err(FormatError::UnexpectedEof(start + buf.len() as u64).into());
        }
        self.position += len as u64;
        Ok(buf)
    }

    /// Consume bytes up to and including a NUL terminator, returning the
    /// bytes before it.
    pub(crate) fn read_until_nul(&mut self, limit: usize, what: &'static str) -> Result<Vec<u8>> {
        let start = self.position;
        let mut buf = Vec::new();
        loop {
            let byte = self.read_byte()?;
            if byte == 0 {
                return Ok(buf);
            }
            if buf.len() == limit {
                return Err(FormatError::LimitExceeded {
                    what,
                    value: buf.len() as u64 + 1,
                    limit: limit as u64,
                    position: start,
                }
                .into());
            }
            buf.push(byte);
        }
    }
}

fn eof_as_truncation(error: std::io::Error, start: u64) -> Error {
    if error.kind() == ErrorKind::UnexpectedEof {
        FormatError::UnexpectedEof(start).into()
    } else {
        error.into()
    }
}
