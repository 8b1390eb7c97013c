use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};

/// Random bytes per reset token (256 bits).
pub const RESET_TOKEN_BYTES: usize = 32;

/// Generates an unguessable, URL-safe password reset token.
pub fn generate_reset_token() -> String {
    let mut buf = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut buf);
    Base64UrlUnpadded::encode_string(&buf)
}
