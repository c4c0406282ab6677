//! Message-Authenticator (RFC 2869 Section 5.14)
//!
//! HMAC-MD5 keyed with the shared secret, computed over the whole packet with
//! the Message-Authenticator value zeroed. For Access-Request packets this is
//! the only cryptographic proof that the client knows the secret.

use hmac::{Hmac, Mac};
use md5_digest::Md5;

type HmacMd5 = Hmac<Md5>;

fn keyed(secret: &[u8]) -> HmacMd5 {
    <HmacMd5 as Mac>::new_from_slice(secret).expect("HMAC can take key of any size")
}

/// Calculate Message-Authenticator over `packet_bytes`
///
/// The caller zeroes the Message-Authenticator value beforehand.
pub fn calculate_message_authenticator(packet_bytes: &[u8], secret: &[u8]) -> [u8; 16] {
    let mut mac = keyed(secret);
    mac.update(packet_bytes);
    let mut output = [0u8; 16];
    output.copy_from_slice(&mac.finalize().into_bytes());
    output
}

/// Verify the Message-Authenticator whose value starts at `offset`
pub fn verify_message_authenticator(packet_bytes: &[u8], secret: &[u8], offset: usize) -> bool {
    let Some(received) = packet_bytes.get(offset..offset + 16) else {
        return false;
    };

    let mut zeroed = packet_bytes.to_vec();
    zeroed[offset..offset + 16].fill(0);

    let mut mac = keyed(secret);
    mac.update(&zeroed);
    mac.verify_slice(received).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_authenticator_deterministic() {
        let packet = vec![0u8; 20];
        let auth = calculate_message_authenticator(&packet, b"s3cret");
        assert_eq!(auth, calculate_message_authenticator(&packet, b"s3cret"));
        assert_ne!(auth, calculate_message_authenticator(&packet, b"other"));
    }

    #[test]
    fn test_verify_valid() {
        let mut packet = vec![0u8; 40];
        let auth = calculate_message_authenticator(&packet, b"s3cret");
        packet[22..38].copy_from_slice(&auth);

        assert!(verify_message_authenticator(&packet, b"s3cret", 22));
    }

    #[test]
    fn test_verify_wrong_secret() {
        let mut packet = vec![0u8; 40];
        let auth = calculate_message_authenticator(&packet, b"s3cret");
        packet[22..38].copy_from_slice(&auth);

        assert!(!verify_message_authenticator(&packet, b"wrong", 22));
    }

    #[test]
    fn test_verify_out_of_bounds() {
        assert!(!verify_message_authenticator(&[0u8; 20], b"s3cret", 10));
    }
}
