//! Value Codec
//!
//! Converts between application value types and the raw bytes the DSM
//! stores and ships. The engine only ever sees bytes; the codec is the
//! single point where types appear.
//!
//! ## Conventions
//! - Empty bytes decode to the type's default value. The store represents
//!   "absent" as no entry, the wire represents it as an empty payload, and
//!   both funnel through [`ObjectCodec::decode_or_default`].
//! - Strings and byte vectors are carried verbatim.
//! - Numbers use host byte order. The cluster is assumed homogeneous; this
//!   mirrors the store's role as shared *memory* rather than an archival
//!   format.

use super::error::DsmError;

/// Capability supplied per value type: how to turn it into bytes and back.
pub trait ObjectCodec: Sized + Default {
    fn encode(&self) -> Vec<u8>;

    /// Decode a non-empty payload. Implementations must reject payloads of
    /// the wrong size with [`DsmError::Codec`] and leave no partial state.
    fn decode(bytes: &[u8]) -> Result<Self, DsmError>;

    /// Decode, treating an empty payload as the default value.
    fn decode_or_default(bytes: &[u8]) -> Result<Self, DsmError> {
        if bytes.is_empty() {
            Ok(Self::default())
        } else {
            Self::decode(bytes)
        }
    }
}

impl ObjectCodec for String {
    fn encode(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    fn decode(bytes: &[u8]) -> Result<Self, DsmError> {
        // Lossy conversion would silently corrupt data; refuse instead.
        String::from_utf8(bytes.to_vec()).map_err(|e| DsmError::Codec {
            expected: e.utf8_error().valid_up_to(),
            actual: bytes.len(),
        })
    }
}

impl ObjectCodec for Vec<u8> {
    fn encode(&self) -> Vec<u8> {
        self.clone()
    }

    fn decode(bytes: &[u8]) -> Result<Self, DsmError> {
        Ok(bytes.to_vec())
    }
}

macro_rules! numeric_codec {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ObjectCodec for $ty {
                fn encode(&self) -> Vec<u8> {
                    self.to_ne_bytes().to_vec()
                }

                fn decode(bytes: &[u8]) -> Result<Self, DsmError> {
                    let arr: [u8; size_of::<$ty>()] =
                        bytes.try_into().map_err(|_| DsmError::Codec {
                            expected: size_of::<$ty>(),
                            actual: bytes.len(),
                        })?;
                    Ok(<$ty>::from_ne_bytes(arr))
                }
            }
        )*
    };
}

numeric_codec!(i32, i64, u32, u64, f64);
