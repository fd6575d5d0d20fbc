// ============================================
// File: crates/vanet-crypto/src/wire.rs
// ============================================
//! Length-prefixed field helpers shared by the envelope and certificate
//! codecs. All integers are little-endian.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{CryptoError, Result};

/// Size of a field length prefix.
pub(crate) const LEN_PREFIX: usize = 4;

/// Writes `u32 LE length ‖ bytes`.
pub(crate) fn put_field(buf: &mut BytesMut, field: &[u8]) {
    // Callers bound field sizes well below u32::MAX.
    #[allow(clippy::cast_possible_truncation)]
    buf.put_u32_le(field.len() as u32);
    buf.put_slice(field);
}

/// Reads a length-prefixed field of at most `max` bytes.
pub(crate) fn get_field(buf: &mut &[u8], max: usize, what: &str) -> Result<Vec<u8>> {
    if buf.remaining() < LEN_PREFIX {
        return Err(CryptoError::malformed(format!("{what}: missing length prefix")));
    }
    let len = buf.get_u32_le() as usize;
    if len > max {
        return Err(CryptoError::FieldTooLarge { max, actual: len });
    }
    if buf.remaining() < len {
        return Err(CryptoError::malformed(format!(
            "{what}: declared {len} bytes, {} available",
            buf.remaining()
        )));
    }
    let mut out = vec![0u8; len];
    buf.copy_to_slice(&mut out);
    Ok(out)
}

/// Reads a length-prefixed UTF-8 string.
pub(crate) fn get_string(buf: &mut &[u8], max: usize, what: &str) -> Result<String> {
    let raw = get_field(buf, max, what)?;
    String::from_utf8(raw).map_err(|_| CryptoError::malformed(format!("{what}: not UTF-8")))
}

/// Reads a `u64 LE`.
pub(crate) fn get_u64(buf: &mut &[u8], what: &str) -> Result<u64> {
    if buf.remaining() < 8 {
        return Err(CryptoError::malformed(format!("{what}: truncated")));
    }
    Ok(buf.get_u64_le())
}

/// Reads a `u32 LE`.
pub(crate) fn get_u32(buf: &mut &[u8], what: &str) -> Result<u32> {
    if buf.remaining() < 4 {
        return Err(CryptoError::malformed(format!("{what}: truncated")));
    }
    Ok(buf.get_u32_le())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_bounds() {
        let mut buf = BytesMut::new();
        put_field(&mut buf, b"abcdef");

        let mut input: &[u8] = &buf;
        assert!(matches!(
            get_field(&mut input, 3, "x"),
            Err(CryptoError::FieldTooLarge { max: 3, actual: 6 })
        ));

        let mut truncated: &[u8] = &buf[..7];
        assert!(get_field(&mut truncated, 64, "x").is_err());

        let mut input: &[u8] = &buf;
        assert_eq!(get_field(&mut input, 64, "x").unwrap(), b"abcdef");
        assert!(input.is_empty());
    }
}
