//! Relocatable buffer and offset-reference model.
//!
//! Animation data is authored off-device, transferred over the wireless
//! link and written verbatim to flash, so records never contain pointers.
//! Every cross-record link is a `u16` offset relative to some buffer, and
//! resolving a link always requires naming that buffer explicitly: the
//! same numeric offset means different things against different buffers.
//!
//! All bounds checks live here, at the resolution boundary. Well-formed
//! data never hits them.

use core::marker::PhantomData;

/// Reserved sentinel for an empty reference.
///
/// A null reference never resolves; consumers substitute a defined default
/// (zero scalar, black color, identity curve).
pub const NULL_OFFSET: u16 = 0xFFFF;

/// Error raised at the offset-resolution boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BufferError {
    /// Offset or record extent exceeds the buffer length.
    OutOfBounds { offset: u16 },
    /// A record carries a tag outside its closed kind set.
    UnknownTag { offset: u16, tag: u8 },
}

impl core::fmt::Display for BufferError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OutOfBounds { offset } => {
                write!(f, "offset 0x{offset:04X} out of buffer bounds")
            }
            Self::UnknownTag { offset, tag } => {
                write!(f, "unknown record tag {tag} at offset 0x{offset:04X}")
            }
        }
    }
}

/// A byte range holding serialized animation data.
///
/// Either flash-resident (persistent presets) or a wire-received chunk
/// (transient presets being previewed before programming). Consumers never
/// see raw addresses; all access goes through [`ByteReader`].
#[derive(Debug, Clone, Copy)]
pub struct AnimBuffer<'a> {
    bytes: &'a [u8],
}

impl<'a> AnimBuffer<'a> {
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub(crate) const fn bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

/// The resource pool a playback is started against: the buffer holding
/// presets and their expression nodes, plus the optional override
/// buffer/table applied to every evaluation of those nodes.
#[derive(Debug, Clone, Copy)]
pub struct DataSet<'a> {
    pub buffer: AnimBuffer<'a>,
    pub override_buffer: Option<AnimBuffer<'a>>,
    pub overrides: &'a [crate::eval::OverridePair],
}

impl<'a> DataSet<'a> {
    pub const fn new(buffer: AnimBuffer<'a>) -> Self {
        Self {
            buffer,
            override_buffer: None,
            overrides: &[],
        }
    }

    /// Pool whose node references are partially redirected into an
    /// override buffer.
    pub const fn with_overrides(
        buffer: AnimBuffer<'a>,
        override_buffer: AnimBuffer<'a>,
        overrides: &'a [crate::eval::OverridePair],
    ) -> Self {
        Self {
            buffer,
            override_buffer: Some(override_buffer),
            overrides,
        }
    }
}

/// A buffer-relative reference to a single serialized record.
///
/// The type parameter is a witness for what the offset points at; it does
/// not affect layout. References are 2 bytes on the wire.
pub struct Offset<T> {
    raw: u16,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Offset<T> {
    /// The reserved empty reference.
    pub const NULL: Self = Self::new(NULL_OFFSET);

    pub const fn new(raw: u16) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    pub const fn raw(self) -> u16 {
        self.raw
    }

    pub const fn is_null(self) -> bool {
        self.raw == NULL_OFFSET
    }
}

impl<T> Clone for Offset<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Offset<T> {}

impl<T> PartialEq for Offset<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Offset<T> {}

impl<T> core::fmt::Debug for Offset<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Offset(0x{:04X})", self.raw)
    }
}

/// Serialized records with a fixed wire size, addressable inside an
/// [`OffsetArray`].
pub trait FixedRecord {
    /// Wire size of one record in bytes.
    const SIZE: usize;
}

/// A buffer-relative reference to `count` consecutive fixed-size records.
pub struct OffsetArray<T: FixedRecord> {
    offset: u16,
    count: u8,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FixedRecord> OffsetArray<T> {
    pub const fn new(offset: u16, count: u8) -> Self {
        Self {
            offset,
            count,
            _marker: PhantomData,
        }
    }

    pub const fn count(&self) -> u8 {
        self.count
    }

    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Reference to the record at `index`.
    ///
    /// Returns the null reference when the index is out of range, so the
    /// caller falls back to its defined default instead of reading a
    /// neighboring record.
    #[allow(clippy::cast_possible_truncation)]
    pub fn at(&self, index: u8) -> Offset<T> {
        if index >= self.count || self.offset == NULL_OFFSET {
            return Offset::NULL;
        }
        let byte_offset = self.offset as usize + index as usize * T::SIZE;
        if byte_offset > u16::MAX as usize {
            return Offset::NULL;
        }
        Offset::new(byte_offset as u16)
    }
}

impl<T: FixedRecord> Clone for OffsetArray<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: FixedRecord> Copy for OffsetArray<T> {}

impl<T: FixedRecord> PartialEq for OffsetArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset && self.count == other.count
    }
}

impl<T: FixedRecord> Eq for OffsetArray<T> {}

impl<T: FixedRecord> core::fmt::Debug for OffsetArray<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "OffsetArray(0x{:04X} x{})", self.offset, self.count)
    }
}

/// Bounds-checked little-endian reader over one record.
///
/// Decoders create one at a record's offset and pull fields in wire order;
/// any read past the buffer end surfaces as [`BufferError::OutOfBounds`].
#[derive(Debug)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    start: u16,
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buffer: AnimBuffer<'a>, offset: u16) -> Result<Self, BufferError> {
        if offset == NULL_OFFSET || (offset as usize) >= buffer.len() {
            return Err(BufferError::OutOfBounds { offset });
        }
        Ok(Self {
            bytes: buffer.bytes(),
            start: offset,
            pos: offset as usize,
        })
    }

    /// Offset this reader started at.
    pub const fn start(&self) -> u16 {
        self.start
    }

    pub fn read_u8(&mut self) -> Result<u8, BufferError> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or(BufferError::OutOfBounds { offset: self.start })?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_u16(&mut self) -> Result<u16, BufferError> {
        let lo = self.read_u8()?;
        let hi = self.read_u8()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    pub fn read_u32(&mut self) -> Result<u32, BufferError> {
        let lo = self.read_u16()?;
        let hi = self.read_u16()?;
        Ok(u32::from(hi) << 16 | u32::from(lo))
    }

    pub fn read_offset<T>(&mut self) -> Result<Offset<T>, BufferError> {
        Ok(Offset::new(self.read_u16()?))
    }
}
