use crate::packet::{Packet, PacketError};
use rand::Rng;
use thiserror::Error;

/// User-Password recovery failures
///
/// With a wrong shared secret the recovered bytes are noise, so invalid
/// UTF-8 is the usual symptom of a secret mismatch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("invalid User-Password length {0} (must be a non-zero multiple of 16, at most 128)")]
    InvalidLength(usize),
    #[error("User-Password is not valid UTF-8 (shared secret mismatch?)")]
    InvalidUtf8,
}

/// Generate a random Request Authenticator (RFC 2865 Section 3)
pub fn generate_request_authenticator() -> [u8; 16] {
    let mut authenticator = [0u8; 16];
    rand::rng().fill(&mut authenticator);
    authenticator
}

/// Calculate the Response Authenticator (RFC 2865 Section 3)
///
/// MD5(Code + ID + Length + Request Authenticator + Attributes + Secret)
pub fn calculate_response_authenticator(
    packet: &Packet,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> Result<[u8; 16], PacketError> {
    let mut data = packet.encode()?;
    data[4..Packet::HEADER_SIZE].copy_from_slice(request_authenticator);
    data.extend_from_slice(secret);

    Ok(md5::compute(&data).0)
}

/// Check a response against the request it answers
pub fn verify_response_authenticator(
    response: &Packet,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> bool {
    calculate_response_authenticator(response, request_authenticator, secret)
        .map(|expected| expected == response.authenticator)
        .unwrap_or(false)
}

/// Keystream block: MD5(secret + previous)
fn keystream(secret: &[u8], previous: &[u8]) -> [u8; 16] {
    let mut ctx = md5::Context::new();
    ctx.consume(secret);
    ctx.consume(previous);
    ctx.compute().0
}

/// Hide a User-Password value (RFC 2865 Section 5.2)
///
/// The password is NUL-padded to a multiple of 16 octets, then each block is
/// XORed with MD5(secret + previous ciphertext block), the first block
/// chaining off the Request Authenticator.
pub fn encrypt_user_password(password: &str, secret: &[u8], authenticator: &[u8; 16]) -> Vec<u8> {
    let mut padded = password.as_bytes().to_vec();
    let blocks = padded.len().div_ceil(16).max(1);
    padded.resize(blocks * 16, 0);

    let mut result = Vec::with_capacity(padded.len());
    let mut previous: [u8; 16] = *authenticator;
    for chunk in padded.chunks(16) {
        let hash = keystream(secret, &previous);
        for (out, (p, h)) in previous.iter_mut().zip(chunk.iter().zip(hash.iter())) {
            *out = p ^ h;
        }
        result.extend_from_slice(&previous);
    }

    result
}

/// Recover a User-Password value (RFC 2865 Section 5.2)
pub fn decrypt_user_password(
    encrypted: &[u8],
    secret: &[u8],
    authenticator: &[u8; 16],
) -> Result<String, PasswordError> {
    if encrypted.is_empty() || encrypted.len() % 16 != 0 || encrypted.len() > 128 {
        return Err(PasswordError::InvalidLength(encrypted.len()));
    }

    let mut result = Vec::with_capacity(encrypted.len());
    let mut previous: &[u8] = authenticator;
    for chunk in encrypted.chunks(16) {
        let hash = keystream(secret, previous);
        result.extend(chunk.iter().zip(hash.iter()).map(|(c, h)| c ^ h));
        previous = chunk;
    }

    while result.last() == Some(&0) {
        result.pop();
    }

    String::from_utf8(result).map_err(|_| PasswordError::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Code;

    #[test]
    fn test_generate_authenticator() {
        let auth1 = generate_request_authenticator();
        let auth2 = generate_request_authenticator();
        assert_ne!(auth1, auth2);
    }

    #[test]
    fn test_password_roundtrip_multi_block() {
        let password = "a password longer than sixteen bytes";
        let authenticator = [1u8; 16];

        let encrypted = encrypt_user_password(password, b"s3cret", &authenticator);
        assert_eq!(encrypted.len(), 48);
        let decrypted = decrypt_user_password(&encrypted, b"s3cret", &authenticator).unwrap();
        assert_eq!(password, decrypted);
    }

    #[test]
    fn test_password_encryption_empty() {
        let encrypted = encrypt_user_password("", b"s3cret", &[1u8; 16]);
        assert_eq!(encrypted.len(), 16);
    }

    #[test]
    fn test_password_wrong_secret() {
        // Non-ASCII password so that a mismatched keystream cannot stay valid UTF-8 by luck
        let authenticator = [9u8; 16];
        let encrypted = encrypt_user_password("pässwörd", b"s3cret", &authenticator);
        let decrypted = decrypt_user_password(&encrypted, b"wrong", &authenticator);
        assert_ne!(decrypted, Ok("pässwörd".to_string()));
    }

    #[test]
    fn test_password_bad_length() {
        assert_eq!(
            decrypt_user_password(&[0u8; 15], b"s3cret", &[0u8; 16]),
            Err(PasswordError::InvalidLength(15))
        );
        assert_eq!(
            decrypt_user_password(&[], b"s3cret", &[0u8; 16]),
            Err(PasswordError::InvalidLength(0))
        );
    }

    #[test]
    fn test_response_authenticator() {
        let request_auth = [1u8; 16];
        let mut packet = Packet::new(Code::AccessAccept, 42, [0u8; 16]);

        packet.authenticator =
            calculate_response_authenticator(&packet, &request_auth, b"sharedsecret").unwrap();

        assert!(verify_response_authenticator(&packet, &request_auth, b"sharedsecret"));
        assert!(!verify_response_authenticator(&packet, &[2u8; 16], b"sharedsecret"));
    }
}
