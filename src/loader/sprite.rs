//! Sprite decoding
//!
//! Pluggable decode step for item sprites: checks the PNG signature and reads
//! the image dimensions from the IHDR chunk. Pixel data stays encoded.

use bytes::Bytes;

use crate::error::DecodeError;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// Signature, chunk length, chunk type, width, height.
const IHDR_PREFIX_LEN: usize = 8 + 4 + 4 + 4 + 4;

// == Sprite ==
/// A decoded sprite. Cloning shares the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    pub width: u32,
    pub height: u32,
    /// The undecoded PNG payload
    pub bytes: Bytes,
}

impl Sprite {
    pub const CONTENT_TYPE: &'static str = "image/png";

    /// Size of the encoded payload in bytes.
    pub fn encoded_len(&self) -> usize {
        self.bytes.len()
    }
}

/// Sprite locator for an item: `{base}/{id}.png`.
pub fn sprite_url(base: &str, id: u32) -> String {
    format!("{}/{}.png", base.trim_end_matches('/'), id)
}

// == Decode ==
/// Interprets `bytes` as a PNG sprite.
pub fn decode_png(bytes: Bytes) -> Result<Sprite, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let signature_len = bytes.len().min(PNG_SIGNATURE.len());
    if bytes[..signature_len] != PNG_SIGNATURE[..signature_len] {
        return Err(DecodeError::InvalidSignature);
    }
    if bytes.len() < IHDR_PREFIX_LEN {
        return Err(DecodeError::Truncated);
    }

    let chunk_type = &bytes[12..16];
    if chunk_type != b"IHDR" {
        return Err(DecodeError::Malformed(format!(
            "expected IHDR as first chunk, found {:?}",
            String::from_utf8_lossy(chunk_type)
        )));
    }

    let width = read_u32(&bytes[16..20]);
    let height = read_u32(&bytes[20..24]);
    if width == 0 || height == 0 {
        return Err(DecodeError::Malformed(format!(
            "invalid dimensions {width}x{height}"
        )));
    }

    Ok(Sprite {
        width,
        height,
        bytes,
    })
}

fn read_u32(raw: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(raw);
    u32::from_be_bytes(buf)
}

/// Minimal PNG header with the given dimensions, for tests and fixtures.
#[doc(hidden)]
pub fn png_header(width: u32, height: u32) -> Bytes {
    let mut out = Vec::with_capacity(IHDR_PREFIX_LEN + 9);
    out.extend_from_slice(&PNG_SIGNATURE);
    out.extend_from_slice(&13u32.to_be_bytes());
    out.extend_from_slice(b"IHDR");
    out.extend_from_slice(&width.to_be_bytes());
    out.extend_from_slice(&height.to_be_bytes());
    // bit depth, colour type, compression, filter, interlace, CRC
    out.extend_from_slice(&[8, 6, 0, 0, 0, 0, 0, 0, 0]);
    Bytes::from(out)
}
