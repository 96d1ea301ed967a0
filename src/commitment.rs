//! Hash commitments and the fixed-width identity encoding behind each
//! left/right secret pair.

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};

/// SHA-256 of `bytes` as 64 lowercase hex characters.
pub fn hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Byte-wise XOR. `None` when the operands differ in length.
pub fn xor(a: &[u8], b: &[u8]) -> Option<Vec<u8>> {
    if a.len() != b.len() {
        return None;
    }
    Some(a.iter().zip(b).map(|(x, y)| x ^ y).collect())
}

/// `marker || identity`, right-padded with zero bytes to `width`.
///
/// An identity ending in NUL is rejected, decoding would strip it.
pub fn encode_identity(marker: &str, identity: &str, width: usize) -> Result<Vec<u8>> {
    if identity.ends_with('\0') {
        return Err(Error::InvalidIdentity(identity.to_string()));
    }
    let needed = marker.len() + identity.len();
    if needed > width {
        return Err(Error::IdentityTooLong { needed, width });
    }

    let mut encoded = Vec::with_capacity(width);
    encoded.extend_from_slice(marker.as_bytes());
    encoded.extend_from_slice(identity.as_bytes());
    encoded.resize(width, 0);
    Ok(encoded)
}

/// Inverse of [`encode_identity`].
///
/// Returns `None` unless `bytes` begins with `marker` and the rest, minus
/// trailing zero padding, is UTF-8.
pub fn decode_identity(marker: &str, bytes: &[u8]) -> Option<String> {
    let rest = bytes.strip_prefix(marker.as_bytes())?;
    let end = rest.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    String::from_utf8(rest[..end].to_vec()).ok()
}
