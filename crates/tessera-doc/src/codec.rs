//! Binary encode/decode for document values.
//!
//! ## Wire layout
//!
//! All multi-byte integers are little-endian. A document is:
//!
//! ```text
//! magic   b"TDOC"
//! u16     version
//! value   root value
//! ```
//!
//! Each value is one kind byte followed by its payload:
//!
//! ```text
//! 0x01 int    i64
//! 0x02 blob   str(tag)  u32 len  bytes
//! 0x03 array  u32 count  value*
//! 0x04 dict   u32 count  (str(key) value)*
//! ```
//!
//! where `str` is a u16 length followed by UTF-8 bytes.
//!
//! ## Limits
//!
//! Strings (keys, blob tags) are limited to 64 KiB and blob payloads, array
//! and dict counts to u32 range. Exceeding a limit on the encode side is a
//! caller contract violation and panics; the decoder treats any structural
//! violation as a recoverable [`DocError`]. Nesting past [`MAX_DEPTH`] is
//! rejected on decode so a short adversarial buffer cannot blow the stack.

use crate::value::{Blob, Dict, Value};
use crate::DocError;

/// Document magic bytes.
pub const MAGIC: [u8; 4] = *b"TDOC";

/// Current wire format version.
pub const VERSION: u16 = 1;

/// Maximum value nesting the decoder will follow.
pub const MAX_DEPTH: usize = 64;

const KIND_INT: u8 = 0x01;
const KIND_BLOB: u8 = 0x02;
const KIND_ARRAY: u8 = 0x03;
const KIND_DICT: u8 = 0x04;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode a value into a fresh, self-contained document buffer.
///
/// The returned buffer is a single contiguous allocation; ownership
/// transfers to the caller.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    encode_value(value, &mut out);
    out
}

fn encode_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Int(v) => {
            out.push(KIND_INT);
            out.extend_from_slice(&v.to_le_bytes());
        }
        Value::Blob(blob) => {
            out.push(KIND_BLOB);
            encode_str(&blob.tag, out);
            let len = u32::try_from(blob.bytes.len()).expect("blob payload exceeds u32 length");
            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(&blob.bytes);
        }
        Value::Array(values) => {
            out.push(KIND_ARRAY);
            let count = u32::try_from(values.len()).expect("array exceeds u32 element count");
            out.extend_from_slice(&count.to_le_bytes());
            for v in values {
                encode_value(v, out);
            }
        }
        Value::Dict(dict) => {
            out.push(KIND_DICT);
            let count = u32::try_from(dict.len()).expect("dict exceeds u32 entry count");
            out.extend_from_slice(&count.to_le_bytes());
            for (key, v) in dict.iter() {
                encode_str(key, out);
                encode_value(v, out);
            }
        }
    }
}

fn encode_str(s: &str, out: &mut Vec<u8>) {
    let len = u16::try_from(s.len()).expect("string exceeds u16 length");
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a document buffer produced by [`encode`].
///
/// Exact inverse of `encode` for well-formed input; fails with a [`DocError`]
/// on truncated, ill-tagged, or otherwise corrupt input. Never panics.
pub fn decode(bytes: &[u8]) -> Result<Value, DocError> {
    let mut r = Reader::new(bytes);

    if r.take(4)? != MAGIC {
        return Err(DocError::BadMagic);
    }
    let version = r.read_u16()?;
    if version != VERSION {
        return Err(DocError::UnsupportedVersion(version));
    }

    let value = decode_value(&mut r, 0)?;

    let trailing = r.remaining();
    if trailing != 0 {
        return Err(DocError::TrailingBytes(trailing));
    }
    Ok(value)
}

fn decode_value(r: &mut Reader<'_>, depth: usize) -> Result<Value, DocError> {
    if depth > MAX_DEPTH {
        return Err(DocError::DepthLimitExceeded);
    }

    let kind_offset = r.pos;
    let kind = r.read_u8()?;
    match kind {
        KIND_INT => Ok(Value::Int(r.read_i64()?)),
        KIND_BLOB => {
            let tag = r.read_str()?;
            let len = r.read_u32()? as usize;
            let bytes = r.take(len)?.to_vec();
            Ok(Value::Blob(Blob { tag, bytes }))
        }
        KIND_ARRAY => {
            let count = r.read_u32()? as usize;
            let mut values = Vec::new();
            for _ in 0..count {
                values.push(decode_value(r, depth + 1)?);
            }
            Ok(Value::Array(values))
        }
        KIND_DICT => {
            let count = r.read_u32()? as usize;
            let mut dict = Dict::new();
            for _ in 0..count {
                let key = r.read_str()?;
                if dict.contains_key(&key) {
                    return Err(DocError::DuplicateKey(key));
                }
                let value = decode_value(r, depth + 1)?;
                dict.insert(key, value);
            }
            Ok(Value::Dict(dict))
        }
        other => Err(DocError::UnknownKind {
            kind: other,
            offset: kind_offset,
        }),
    }
}

/// Bounds-checked cursor over the input buffer.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DocError> {
        if self.remaining() < n {
            return Err(DocError::UnexpectedEof {
                offset: self.pos,
                needed: n,
                available: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, DocError> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16, DocError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> Result<u32, DocError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_i64(&mut self) -> Result<i64, DocError> {
        let b = self.take(8)?;
        Ok(i64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    fn read_str(&mut self) -> Result<String, DocError> {
        let len = self.read_u16()? as usize;
        let offset = self.pos;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| DocError::InvalidUtf8 { offset })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> Value {
        let mut fields = Dict::new();
        fields.insert("m", Value::Blob(Blob::new("mat3", vec![1, 2, 3, 4])));
        fields.insert("score", Value::Int(-7));

        let mut root = Dict::new();
        root.insert(
            "rotation",
            Value::Array(vec![Value::Int(10), Value::Dict(fields)]),
        );
        root.insert("empty", Value::Array(Vec::new()));
        Value::Dict(root)
    }

    #[test]
    fn roundtrip_nested_document() {
        let doc = sample_doc();
        let bytes = encode(&doc);
        assert_eq!(decode(&bytes).unwrap(), doc);
    }

    #[test]
    fn roundtrip_extreme_ints() {
        for v in [i64::MIN, -1, 0, 1, i64::MAX] {
            let bytes = encode(&Value::Int(v));
            assert_eq!(decode(&bytes).unwrap(), Value::Int(v));
        }
    }

    #[test]
    fn truncated_buffer_fails() {
        let bytes = encode(&sample_doc());
        for cut in 0..bytes.len() {
            let err = decode(&bytes[..cut]);
            assert!(err.is_err(), "decode succeeded on {cut}-byte prefix");
        }
    }

    #[test]
    fn bad_magic_fails() {
        let mut bytes = encode(&Value::Int(1));
        bytes[0] = b'X';
        assert!(matches!(decode(&bytes), Err(DocError::BadMagic)));
    }

    #[test]
    fn unsupported_version_fails() {
        let mut bytes = encode(&Value::Int(1));
        bytes[4] = 0xFF;
        bytes[5] = 0xFF;
        assert!(matches!(
            decode(&bytes),
            Err(DocError::UnsupportedVersion(0xFFFF))
        ));
    }

    #[test]
    fn unknown_kind_fails() {
        let mut bytes = encode(&Value::Int(1));
        bytes[6] = 0x7F; // kind byte of the root value
        assert!(matches!(
            decode(&bytes),
            Err(DocError::UnknownKind { kind: 0x7F, .. })
        ));
    }

    #[test]
    fn trailing_bytes_fail() {
        let mut bytes = encode(&Value::Int(1));
        bytes.push(0);
        assert!(matches!(decode(&bytes), Err(DocError::TrailingBytes(1))));
    }

    #[test]
    fn duplicate_key_fails() {
        // Hand-build a dict with "a" twice; the Dict API cannot produce one.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes.push(KIND_DICT);
        bytes.extend_from_slice(&2u32.to_le_bytes());
        for v in [1i64, 2] {
            bytes.extend_from_slice(&1u16.to_le_bytes());
            bytes.push(b'a');
            bytes.push(KIND_INT);
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        assert!(matches!(decode(&bytes), Err(DocError::DuplicateKey(k)) if k == "a"));
    }

    #[test]
    fn depth_limit_rejected() {
        let mut v = Value::Int(0);
        for _ in 0..(MAX_DEPTH + 2) {
            v = Value::Array(vec![v]);
        }
        let bytes = encode(&v);
        assert!(matches!(decode(&bytes), Err(DocError::DepthLimitExceeded)));
    }

    #[test]
    fn invalid_utf8_in_tag_fails() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes.push(KIND_BLOB);
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&[0xFF, 0xFE]);
        bytes.extend_from_slice(&0u32.to_le_bytes());
        assert!(matches!(decode(&bytes), Err(DocError::InvalidUtf8 { .. })));
    }
}
