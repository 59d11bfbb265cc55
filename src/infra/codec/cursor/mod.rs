//! Fixed payload buffers with independent cursors, and the typed accessors
//! operating on them. Every accessor validates the remaining space before
//! touching the buffer: a failed multi-byte access performs no partial write
//! and no cursor movement.
//!
//! Multi-byte values use the little-endian encoding on the wire; floats use
//! the bit-exact 4-byte IEEE-754 representation.
use crate::error::CursorError;

/// Transmit buffer capacity. Sized for a 6+6 byte dual-frame payload split.
pub const TX_CAPACITY: usize = 12;
/// Receive buffer capacity. Holds a 2-byte response header plus a fully
/// reassembled dual-frame payload.
pub const RX_CAPACITY: usize = 14;

/// Reserved 16-bit value encoding "not a number" or "out of range" in
/// scaled-integer payload fields.
pub const FIXED_I16_SENTINEL: u16 = 0x8000;

//==================================================================================FIXED_POINT

/// Scale `value`, round to the nearest integer, and return its wire form.
/// Values outside `[-32767, 32767]` after scaling, and NaN, both map to the
/// sentinel: the two cases are indistinguishable on the wire. Accepted lossy
/// behavior, not a defect.
pub fn encode_fixed_i16(value: f32, scale: f32) -> u16 {
    if value.is_nan() {
        return FIXED_I16_SENTINEL;
    }
    let scaled = value * scale;
    // Round half away from zero; `core` has no float rounding intrinsic.
    let rounded = if scaled >= 0.0 { scaled + 0.5 } else { scaled - 0.5 };
    // Float-to-int casts saturate, so an overflowing value lands outside the
    // representable window and is caught here.
    let integer = rounded as i32;
    if !(-32767..=32767).contains(&integer) {
        return FIXED_I16_SENTINEL;
    }
    integer as i16 as u16
}

/// Inverse of [`encode_fixed_i16`]; the sentinel maps back to NaN.
pub fn decode_fixed_i16(raw: u16, scale: f32) -> f32 {
    if raw == FIXED_I16_SENTINEL {
        return f32::NAN;
    }
    raw as i16 as f32 / scale
}

//==================================================================================TX_CURSOR

/// Write-cursor buffer for the outbound direction: request arguments on the
/// initiator, reply payload on the responder.
#[derive(Debug)]
pub struct TxCursor {
    buf: [u8; TX_CAPACITY],
    cursor: usize,
}

impl Default for TxCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl TxCursor {
    /// Empty buffer with the cursor at the start.
    pub const fn new() -> Self {
        Self {
            buf: [0; TX_CAPACITY],
            cursor: 0,
        }
    }

    /// Reset the write cursor. Stale bytes are overwritten by later writes.
    #[inline]
    pub fn clear(&mut self) {
        self.cursor = 0;
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    /// Remaining writable capacity.
    #[inline]
    pub fn remaining(&self) -> usize {
        TX_CAPACITY - self.cursor
    }

    /// View over the written bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.cursor]
    }

    /// Capacity gate: every writer goes through here before mutating.
    fn allow(&self, wanted: usize) -> Result<(), CursorError> {
        if wanted > self.remaining() {
            return Err(CursorError::Overrun {
                asked: wanted,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CursorError> {
        self.allow(bytes.len())?;
        self.buf[self.cursor..self.cursor + bytes.len()].copy_from_slice(bytes);
        self.cursor += bytes.len();
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<(), CursorError> {
        self.write_bytes(&[value])
    }

    pub fn write_i8(&mut self, value: i8) -> Result<(), CursorError> {
        self.write_u8(value as u8)
    }

    pub fn write_u16(&mut self, value: u16) -> Result<(), CursorError> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_i16(&mut self, value: i16) -> Result<(), CursorError> {
        self.write_u16(value as u16)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<(), CursorError> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<(), CursorError> {
        self.write_u32(value as u32)
    }

    /// Bit-exact little-endian IEEE-754 encoding.
    pub fn write_f32(&mut self, value: f32) -> Result<(), CursorError> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Scaled 16-bit fixed-point form, see [`encode_fixed_i16`].
    pub fn write_fixed_i16(&mut self, value: f32, scale: f32) -> Result<(), CursorError> {
        self.write_u16(encode_fixed_i16(value, scale))
    }
}

//==================================================================================RX_CURSOR

/// Read-cursor buffer for the inbound direction, with independent length and
/// read position. Holds the request arguments on the responder, the
/// (possibly reassembled) response on the initiator.
#[derive(Debug)]
pub struct RxCursor {
    buf: [u8; RX_CAPACITY],
    len: usize,
    cursor: usize,
}

impl Default for RxCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl RxCursor {
    /// Empty buffer.
    pub const fn new() -> Self {
        Self {
            buf: [0; RX_CAPACITY],
            len: 0,
            cursor: 0,
        }
    }

    /// Replace the buffer content and rewind the cursor. Input longer than
    /// the capacity is truncated.
    pub fn load(&mut self, bytes: &[u8]) {
        let clamped = bytes.len().min(RX_CAPACITY);
        self.buf[..clamped].copy_from_slice(&bytes[..clamped]);
        self.len = clamped;
        self.cursor = 0;
    }

    /// Append bytes after the current content, leaving the cursor in place.
    /// Used to concatenate the second frame of a dual-frame response.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), CursorError> {
        if bytes.len() > RX_CAPACITY - self.len {
            return Err(CursorError::Overrun {
                asked: bytes.len(),
                available: RX_CAPACITY - self.len,
            });
        }
        self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        Ok(())
    }

    /// Move the read cursor to an absolute position, clamped to the declared
    /// length.
    #[inline]
    pub fn seek(&mut self, pos: usize) {
        self.cursor = pos.min(self.len);
    }

    /// Declared content length.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Unread bytes left before the declared length.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.len - self.cursor
    }

    /// View over the full declared content.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N], CursorError> {
        if N > self.remaining() {
            return Err(CursorError::Overrun {
                asked: N,
                available: self.remaining(),
            });
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.cursor..self.cursor + N]);
        self.cursor += N;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, CursorError> {
        self.read_bytes::<1>().map(|b| b[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, CursorError> {
        self.read_u8().map(|v| v as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, CursorError> {
        self.read_bytes::<2>().map(u16::from_le_bytes)
    }

    pub fn read_i16(&mut self) -> Result<i16, CursorError> {
        self.read_u16().map(|v| v as i16)
    }

    pub fn read_u32(&mut self) -> Result<u32, CursorError> {
        self.read_bytes::<4>().map(u32::from_le_bytes)
    }

    pub fn read_i32(&mut self) -> Result<i32, CursorError> {
        self.read_u32().map(|v| v as i32)
    }

    /// Bit-exact little-endian IEEE-754 decoding.
    pub fn read_f32(&mut self) -> Result<f32, CursorError> {
        self.read_bytes::<4>().map(f32::from_le_bytes)
    }

    /// Scaled 16-bit fixed-point form, see [`decode_fixed_i16`].
    pub fn read_fixed_i16(&mut self, scale: f32) -> Result<f32, CursorError> {
        self.read_u16().map(|raw| decode_fixed_i16(raw, scale))
    }
}
