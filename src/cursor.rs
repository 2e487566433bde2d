// Primitive byte decoding over an in-memory packet payload.

use bytes::Bytes;
use uuid::Uuid;

use crate::error::DecodeError;

/// FIFO cursor over a fully buffered packet payload.
///
/// Every read consumes from the front and advances; reading past the end is
/// a fatal decode error for the whole packet (a schema/version mismatch or
/// corrupted input, never something to recover from). All fixed-width values
/// are network byte order (big-endian).
#[derive(Debug, Clone)]
pub struct ByteCursor {
    buf: Bytes,
}

impl ByteCursor {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { buf: data.into() }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Next byte without consuming it. Used by sentinel-terminated loops.
    pub fn peek_u8(&self) -> Result<u8, DecodeError> {
        self.buf.first().copied().ok_or(DecodeError::InsufficientData {
            needed: 1,
            remaining: 0,
        })
    }

    /// Consume exactly `n` bytes off the front.
    pub fn read_bytes(&mut self, n: usize) -> Result<Bytes, DecodeError> {
        if self.buf.len() < n {
            return Err(DecodeError::InsufficientData {
                needed: n,
                remaining: self.buf.len(),
            });
        }
        Ok(self.buf.split_to(n))
    }

    /// Consume whatever is left, including nothing.
    pub fn read_rest(&mut self) -> Bytes {
        self.buf.split_to(self.buf.len())
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let chunk = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&chunk);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, DecodeError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16, DecodeError> {
        Ok(i16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_be_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_be_bytes(self.read_array()?))
    }

    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        Ok(self.read_u8()? != 0)
    }

    /// LEB128-style variable-length 32-bit integer: 7 payload bits per byte,
    /// little-endian group order, high bit as continuation flag. Negative
    /// values arrive as the full 5-byte unsigned wraparound encoding.
    pub fn read_varint(&mut self) -> Result<i32, DecodeError> {
        let mut result: i32 = 0;
        let mut groups = 0;
        loop {
            let b = self.read_u8()?;
            result |= ((b & 0x7F) as i32) << (7 * groups);
            groups += 1;
            if b & 0x80 == 0 {
                return Ok(result);
            }
            if groups >= 5 {
                return Err(DecodeError::VarIntTooBig);
            }
        }
    }

    /// 64-bit analogue of [`read_varint`](Self::read_varint), up to 10 bytes.
    pub fn read_varlong(&mut self) -> Result<i64, DecodeError> {
        let mut result: i64 = 0;
        let mut groups = 0;
        loop {
            let b = self.read_u8()?;
            result |= ((b & 0x7F) as i64) << (7 * groups);
            groups += 1;
            if b & 0x80 == 0 {
                return Ok(result);
            }
            if groups >= 10 {
                return Err(DecodeError::VarLongTooBig);
            }
        }
    }

    /// Exactly `len` raw bytes decoded as UTF-8 text. Invalid sequences
    /// decode lossily (replacement character) rather than failing; the count
    /// is supplied externally, this is not self-describing.
    pub fn read_pstring(&mut self, len: usize) -> Result<String, DecodeError> {
        let raw = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    /// 16 raw bytes as a 128-bit id, wire order.
    pub fn read_uuid(&mut self) -> Result<Uuid, DecodeError> {
        Ok(Uuid::from_bytes(self.read_array::<16>()?))
    }
}
