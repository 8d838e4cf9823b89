//! Utility functions for cryptographic operations.

use rand::RngCore;
use zeroize::{Zeroize, Zeroizing};

/// Generate cryptographically secure random bytes.
pub fn generate_random_bytes(len: usize) -> Zeroizing<Vec<u8>> {
    let mut buf = Zeroizing::new(vec![0u8; len]);
    rand::rngs::OsRng.fill_bytes(&mut buf);
    buf
}

/// Fill `buf` with random bytes, none of which is zero.
///
/// Zero bytes are redrawn one at a time so the result stays uniform over
/// 1..=255 per byte.
pub fn fill_nonzero_random(buf: &mut [u8]) {
    let mut rng = rand::rngs::OsRng;
    rng.fill_bytes(buf);
    for byte in buf.iter_mut() {
        while *byte == 0 {
            let mut one = [0u8; 1];
            rng.fill_bytes(&mut one);
            *byte = one[0];
            one.zeroize();
        }
    }
}

/// Zeroize sensitive data in a byte slice.
pub fn clear_bytes(buf: &mut [u8]) {
    buf.zeroize();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_bytes_length() {
        assert_eq!(generate_random_bytes(0).len(), 0);
        assert_eq!(generate_random_bytes(37).len(), 37);
    }

    #[test]
    fn test_nonzero_random_has_no_zero() {
        let mut buf = [0u8; 4096];
        fill_nonzero_random(&mut buf);
        assert!(buf.iter().all(|&b| b != 0));
    }

    #[test]
    fn test_clear_bytes() {
        let mut buf = [0xAAu8; 16];
        clear_bytes(&mut buf);
        assert_eq!(buf, [0u8; 16]);
    }
}
