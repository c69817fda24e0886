// Record codecs
//
// Two implementations of the same on-disk layout:
//   FixedCodec    hand-written field-by-field encoders (FixedLayout), used for every read/write
//   ReflectCodec  serde-driven encoder walking fields in declaration order, used only to
//                 cross-check FixedCodec (history::verify, tests)
//
// Layout rules (both codecs):
//   integers        fixed width, little-endian
//   byte arrays     copied verbatim, no length
//   flags / Option  one byte (0 = absent, 1 = present) then the value
//   Vec<T>          u32 LE element count then the elements
//   str / bytes     u32 LE byte length then the bytes

mod reflect;

pub use reflect::ReflectCodec;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("buffer underflow: needed {needed} bytes, {remaining} remaining")]
    BufferUnderflow { needed: usize, remaining: usize },

    #[error("{0} bytes remaining after decode")]
    RemainingBytes(usize),

    #[error("invalid flag byte {0:#04x}")]
    InvalidFlag(u8),

    #[error("length {0} does not fit in u32 prefix")]
    LengthOverflow(usize),

    #[error("unsupported type in layout: {0}")]
    Unsupported(&'static str),

    #[error("{0}")]
    Message(String),
}

/// One encoding of `T` to and from bytes
pub trait Codec<T> {
    const NAME: &'static str;

    fn encode(value: &T) -> Result<Vec<u8>, CodecError>;

    /// Fails with `BufferUnderflow` on a short buffer and `RemainingBytes`
    /// when the value does not consume the whole buffer.
    fn decode(bytes: &[u8]) -> Result<T, CodecError>;
}

/// Hand-specified fixed layout of a stored record
pub trait FixedLayout: Sized {
    /// Exact length of `encode_to` output
    fn encode_size(&self) -> usize;

    fn encode_to(&self, buf: &mut Vec<u8>);

    fn decode_from(r: &mut Reader<'_>) -> Result<Self, CodecError>;

    fn to_bytes(&self) -> Vec<u8> {
        let mut b = Vec::with_capacity(self.encode_size());
        self.encode_to(&mut b);
        b
    }

    fn from_bytes(d: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(d);
        let v = Self::decode_from(&mut r)?;
        r.finish()?;
        Ok(v)
    }
}

pub struct FixedCodec;

impl<T: FixedLayout> Codec<T> for FixedCodec {
    const NAME: &'static str = "fixed";

    fn encode(value: &T) -> Result<Vec<u8>, CodecError> {
        Ok(value.to_bytes())
    }

    fn decode(bytes: &[u8]) -> Result<T, CodecError> {
        T::from_bytes(bytes)
    }
}

/// Bounds-checked cursor over an encoded record
pub struct Reader<'a> {
    data: &'a [u8],
    off: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Reader { data, off: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.off
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let remaining = self.remaining();
        if remaining < n {
            return Err(CodecError::BufferUnderflow { needed: n, remaining });
        }
        let slice = &self.data[self.off..self.off + n];
        self.off += n;
        Ok(slice)
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut a = [0u8; N];
        a.copy_from_slice(self.take(N)?);
        Ok(a)
    }

    pub fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub fn u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    pub fn flag(&mut self) -> Result<bool, CodecError> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            b => Err(CodecError::InvalidFlag(b)),
        }
    }

    pub fn finish(&self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::RemainingBytes(n)),
        }
    }
}

// ========== BUILDING BLOCKS ==========

impl FixedLayout for u8 {
    fn encode_size(&self) -> usize {
        1
    }

    fn encode_to(&self, buf: &mut Vec<u8>) {
        buf.push(*self);
    }

    fn decode_from(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        r.u8()
    }
}

impl FixedLayout for u32 {
    fn encode_size(&self) -> usize {
        4
    }

    fn encode_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.to_le_bytes());
    }

    fn decode_from(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        r.u32()
    }
}

impl FixedLayout for u64 {
    fn encode_size(&self) -> usize {
        8
    }

    fn encode_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.to_le_bytes());
    }

    fn decode_from(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        r.u64()
    }
}

impl<const N: usize> FixedLayout for [u8; N] {
    fn encode_size(&self) -> usize {
        N
    }

    fn encode_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self);
    }

    fn decode_from(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        r.array()
    }
}

// Element counts are bounded by block size limits, far below u32::MAX.
impl<T: FixedLayout> FixedLayout for Vec<T> {
    fn encode_size(&self) -> usize {
        4 + self.iter().map(FixedLayout::encode_size).sum::<usize>()
    }

    fn encode_to(&self, buf: &mut Vec<u8>) {
        debug_assert!(self.len() <= u32::MAX as usize);
        buf.extend_from_slice(&(self.len() as u32).to_le_bytes());
        for item in self {
            item.encode_to(buf);
        }
    }

    fn decode_from(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        let count = r.u32()? as usize;
        // a corrupt count must not drive a huge allocation
        let mut items = Vec::with_capacity(count.min(r.remaining()));
        for _ in 0..count {
            items.push(T::decode_from(r)?);
        }
        Ok(items)
    }
}

impl<T: FixedLayout> FixedLayout for Option<T> {
    fn encode_size(&self) -> usize {
        1 + self.as_ref().map_or(0, FixedLayout::encode_size)
    }

    fn encode_to(&self, buf: &mut Vec<u8>) {
        match self {
            Some(v) => {
                buf.push(1);
                v.encode_to(buf);
            }
            None => {
                buf.push(0);
            }
        }
    }

    fn decode_from(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        if r.flag()? {
            Ok(Some(T::decode_from(r)?))
        } else {
            Ok(None)
        }
    }
}
