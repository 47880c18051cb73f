//! One-hex-digit checksum used by the vision protocol.
//!
//! The checksum of a payload is the **last hexadecimal digit** of the sum of
//! its bytes, sent as a lowercase ASCII character.  Only the low 4 bits of the
//! sum survive, so this is a transmission sanity check and nothing more.  The
//! remote controller expects exactly this scheme.
//!
//! ```text
//! payload  = "AFFFV70000" "1"
//! sum      = 0x291
//! checksum = '1'
//! ```

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Computes the checksum byte for `payload`.
///
/// # Examples
///
/// ```rust
/// use agv_core::protocol::checksum::checksum;
///
/// // 0x41 + 0x42 = 0x83, last hex digit '3'
/// assert_eq!(checksum(b"AB"), b'3');
/// assert_eq!(checksum(b""), b'0');
/// ```
pub fn checksum(payload: &[u8]) -> u8 {
    let sum: u64 = payload.iter().map(|&b| u64::from(b)).sum();
    HEX_DIGITS[(sum & 0xF) as usize]
}

/// Returns `true` if the last byte of `frame_interior` is the checksum of the
/// bytes before it.
///
/// `frame_interior` is a frame without its STX/ETX sentinels, i.e. payload
/// followed by checksum.  An empty slice never verifies.
pub fn verify_checksum(frame_interior: &[u8]) -> bool {
    match frame_interior.split_last() {
        Some((&last, payload)) => checksum(payload) == last,
        None => false,
    }
}

/// Returns `payload` with its checksum byte appended.
pub fn add_checksum(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 1);
    out.extend_from_slice(payload);
    out.push(checksum(payload));
    out
}

/// Text form of [`verify_checksum`] for payloads kept as strings (logs,
/// operator input).
pub fn check_checksum(payload_with_checksum: &str) -> bool {
    verify_checksum(payload_with_checksum.as_bytes())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_last_hex_digit_of_byte_sum() {
        // Arrange: "AFFFV700001" sums to 0x291
        let payload = b"AFFFV700001";
        let sum: u32 = payload.iter().map(|&b| u32::from(b)).sum();
        assert_eq!(sum, 0x291);

        // Act / Assert
        assert_eq!(checksum(payload), b'1');
    }

    #[test]
    fn test_checksum_uses_lowercase_hex_letters() {
        // 0x0a -> 'a', 0x0f -> 'f'
        assert_eq!(checksum(&[0x0a]), b'a');
        assert_eq!(checksum(&[0x0f]), b'f');
        assert_eq!(checksum(&[0xff, 0x01]), b'0');
    }

    #[test]
    fn test_checksum_of_empty_payload_is_zero() {
        assert_eq!(checksum(&[]), b'0');
    }

    #[test]
    fn test_verify_checksum_accepts_matching_trailer() {
        assert!(verify_checksum(b"AFFFV7000011"));
    }

    #[test]
    fn test_verify_checksum_rejects_wrong_trailer() {
        assert!(!verify_checksum(b"AFFFV7000012"));
    }

    #[test]
    fn test_verify_checksum_rejects_empty_input() {
        assert!(!verify_checksum(&[]));
    }

    #[test]
    fn test_add_checksum_appends_one_byte() {
        let out = add_checksum(b"AFFFV700001");
        assert_eq!(out, b"AFFFV7000011".to_vec());
    }

    #[test]
    fn test_check_checksum_on_text() {
        assert!(check_checksum("AFFFV7000011"));
        assert!(!check_checksum("AFFFV7000019"));
    }

    #[test]
    fn test_checksum_collides_every_sixteen() {
        // Only the low nibble of the sum survives.
        assert_eq!(checksum(&[0x01]), checksum(&[0x11]));
    }
}
