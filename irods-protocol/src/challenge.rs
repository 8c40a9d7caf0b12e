//! Standard authentication challenge digest.

use crate::error::ProtocolError;
use crate::{CHALLENGE_LENGTH, MAX_PASSWORD_LENGTH};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use md5::{Digest, Md5};

/// Computes the response to a base64 encoded server challenge.
///
/// The first 64 challenge bytes are followed by the password zero-padded to
/// 50 bytes. Zero bytes in the MD5 digest are replaced by 1 before the digest
/// is base64 encoded.
pub fn compute_challenge_response(
    challenge_b64: &str,
    password: &str,
) -> Result<String, ProtocolError> {
    let password = password.as_bytes();
    if password.len() >= MAX_PASSWORD_LENGTH {
        return Err(ProtocolError::PasswordTooLong {
            len: password.len(),
            max: MAX_PASSWORD_LENGTH,
        });
    }

    let challenge = STANDARD.decode(challenge_b64.trim())?;
    let mut buf = [0u8; CHALLENGE_LENGTH + MAX_PASSWORD_LENGTH];
    let n = challenge.len().min(CHALLENGE_LENGTH);
    buf[..n].copy_from_slice(&challenge[..n]);
    buf[CHALLENGE_LENGTH..CHALLENGE_LENGTH + password.len()].copy_from_slice(password);

    let mut digest = Md5::digest(buf);
    for b in digest.iter_mut() {
        if *b == 0 {
            *b = 1;
        }
    }
    Ok(STANDARD.encode(digest))
}
