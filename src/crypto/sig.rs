use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::codec::{CodecError, FixedLayout, Reader};

/// Recoverable secp256k1 signature: r(32) + s(32) + recovery id(1)
pub const SIG_BYTES: usize = 65;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Sig(pub [u8; SIG_BYTES]);

impl Sig {
    pub fn as_bytes(&self) -> &[u8; SIG_BYTES] {
        &self.0
    }
}

impl Default for Sig {
    fn default() -> Self {
        Sig([0u8; SIG_BYTES])
    }
}

impl fmt::Debug for Sig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sig({})", hex::encode(self.0))
    }
}

impl FixedLayout for Sig {
    fn encode_size(&self) -> usize {
        SIG_BYTES
    }

    fn encode_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.0);
    }

    fn decode_from(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Sig(r.array()?))
    }
}

// serde derives stop at 32-element arrays; walk the bytes as a tuple so the
// layout stays identical to the fixed encoding.
impl Serialize for Sig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut t = serializer.serialize_tuple(SIG_BYTES)?;
        for b in &self.0 {
            t.serialize_element(b)?;
        }
        t.end()
    }
}

impl<'de> Deserialize<'de> for Sig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SigVisitor;

        impl<'de> Visitor<'de> for SigVisitor {
            type Value = Sig;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{SIG_BYTES} signature bytes")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Sig, A::Error> {
                let mut sig = [0u8; SIG_BYTES];
                for (i, slot) in sig.iter_mut().enumerate() {
                    *slot = seq
                        .next_element()?
                        .ok_or_else(|| de::Error::invalid_length(i, &self))?;
                }
                Ok(Sig(sig))
            }
        }

        deserializer.deserialize_tuple(SIG_BYTES, SigVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Codec, ReflectCodec};

    #[test]
    fn test_reflect_layout_matches_fixed() {
        let mut raw = [0u8; SIG_BYTES];
        for (i, b) in raw.iter_mut().enumerate() {
            *b = i as u8;
        }
        let sig = Sig(raw);
        let fixed = sig.to_bytes();
        assert_eq!(fixed.len(), SIG_BYTES);
        assert_eq!(ReflectCodec::encode(&sig).unwrap(), fixed);
        assert_eq!(<ReflectCodec as Codec<Sig>>::decode(&fixed).unwrap(), sig);
    }
}
