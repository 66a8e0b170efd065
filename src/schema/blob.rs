// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Text encodings for byte blobs.

use crate::error::SchemaError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::bufread::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode_base64(field: &'static str, text: &str) -> Result<Vec<u8>, SchemaError> {
    STANDARD
        .decode(text)
        .map_err(|e| SchemaError::InvalidBlob { field, reason: e.to_string() })
}

/// Gzip with a zeroed header timestamp, so equal input gives equal output.
pub fn compress(bytes: &[u8]) -> Result<Vec<u8>, SchemaError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

/// Exactly one gzip member; anything after it is rejected.
pub fn decompress(field: &'static str, bytes: &[u8]) -> Result<Vec<u8>, SchemaError> {
    let mut out = Vec::new();
    let mut decoder = GzDecoder::new(bytes);
    decoder.read_to_end(&mut out).map_err(SchemaError::Decompression)?;
    let rest = decoder.into_inner();
    if !rest.is_empty() {
        return Err(SchemaError::InvalidBlob {
            field,
            reason: format!("{} bytes after the gzip stream", rest.len()),
        });
    }
    Ok(out)
}
