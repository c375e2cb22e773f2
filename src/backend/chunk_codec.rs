//! Chunk encoding and decoding.

use crate::{node::ChunkEncoding, storage::StorageError};

#[cfg(feature = "gzip")]
use std::io::{Cursor, Read};

#[cfg(feature = "gzip")]
use flate2::bufread::{GzDecoder, GzEncoder};

/// Encode the bytes of a chunk.
pub(super) fn encode_chunk(encoding: ChunkEncoding, decoded: Vec<u8>) -> Result<Vec<u8>, StorageError> {
    match encoding {
        ChunkEncoding::Raw => Ok(decoded),
        #[cfg(feature = "gzip")]
        ChunkEncoding::Gzip { level } => {
            let mut encoder = GzEncoder::new(Cursor::new(decoded), flate2::Compression::new(level.min(9)));
            let mut out: Vec<u8> = Vec::new();
            encoder.read_to_end(&mut out)?;
            Ok(out)
        }
        #[cfg(not(feature = "gzip"))]
        ChunkEncoding::Gzip { .. } => Err(unsupported()),
    }
}

/// Decode an encoded chunk holding `decoded_len` bytes.
pub(super) fn decode_chunk(
    encoding: ChunkEncoding,
    encoded: Vec<u8>,
    decoded_len: usize,
) -> Result<Vec<u8>, StorageError> {
    let decoded = match encoding {
        ChunkEncoding::Raw => encoded,
        #[cfg(feature = "gzip")]
        ChunkEncoding::Gzip { .. } => {
            let mut decoder = GzDecoder::new(Cursor::new(encoded));
            let mut out: Vec<u8> = Vec::with_capacity(decoded_len);
            decoder.read_to_end(&mut out)?;
            out
        }
        #[cfg(not(feature = "gzip"))]
        ChunkEncoding::Gzip { .. } => return Err(unsupported()),
    };
    if decoded.len() == decoded_len {
        Ok(decoded)
    } else {
        Err(StorageError::Other(format!(
            "decoded chunk has {} bytes, expected {decoded_len}",
            decoded.len()
        )))
    }
}

#[cfg(not(feature = "gzip"))]
fn unsupported() -> StorageError {
    StorageError::Unsupported("gzip chunks require the gzip feature".to_string())
}
