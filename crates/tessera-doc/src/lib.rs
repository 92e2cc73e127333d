//! Tessera Doc -- self-describing binary document format.
//!
//! This crate provides the wire representation used by the Tessera core: a
//! minimal tagged-value format with exactly four kinds of value -- signed
//! 64-bit integers, tagged binary blobs, ordered arrays, and ordered
//! dictionaries. The codec knows nothing about entities or components; it
//! only moves structured bytes faithfully.
//!
//! Composite numeric payloads (matrices, vectors) are carried as a single
//! [`Blob`] whose string discriminator names the logical type and whose bytes
//! are the payload's packed representation. The codec never interprets blob
//! bytes.
//!
//! # Quick Start
//!
//! ```
//! use tessera_doc::{decode, encode, Blob, Dict, Value};
//!
//! let mut root = Dict::new();
//! root.insert("tick", Value::Int(42));
//! root.insert(
//!     "payload",
//!     Value::Blob(Blob::new("vec3", vec![0u8; 12])),
//! );
//!
//! let bytes = encode(&Value::Dict(root.clone()));
//! assert_eq!(decode(&bytes).unwrap(), Value::Dict(root));
//! ```

#![deny(unsafe_code)]

pub mod codec;
pub mod value;

pub use codec::{decode, encode};
pub use value::{Blob, Dict, Value};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced when decoding a malformed document.
///
/// Encoding is total and cannot fail; every variant here describes structural
/// corruption observed on the read side.
#[derive(Debug, thiserror::Error)]
pub enum DocError {
    /// The buffer ended before the value being read was complete.
    #[error("unexpected end of document at offset {offset}: needed {needed} bytes, {available} available")]
    UnexpectedEof {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// The buffer does not start with the document magic.
    #[error("bad document magic (not a tessera document)")]
    BadMagic,

    /// The document was written by an incompatible codec version.
    #[error("unsupported document version {0}")]
    UnsupportedVersion(u16),

    /// A value position held a kind byte the codec does not define.
    #[error("unknown value kind 0x{kind:02x} at offset {offset}")]
    UnknownKind { kind: u8, offset: usize },

    /// A key or blob tag was not valid UTF-8.
    #[error("invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    /// A dictionary carried the same key twice.
    #[error("duplicate dictionary key '{0}'")]
    DuplicateKey(String),

    /// Bytes remained after the root value was fully decoded.
    #[error("{0} trailing bytes after document root")]
    TrailingBytes(usize),

    /// Value nesting exceeded the decoder's recursion limit.
    #[error("value nesting exceeds the decoder depth limit")]
    DepthLimitExceeded,
}
