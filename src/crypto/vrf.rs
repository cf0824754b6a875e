//! VRF tokens: the query/id obfuscation used by Bflix-style catalogs.
//!
//! `encode` is percent-encode → RC4 → URL-safe base64 → percent-encode, and
//! the result can go straight into a query string. `decode` reverses it and
//! also accepts the bare base64 form the per-server lookups return.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rc4::consts::U16;
use rc4::{KeyInit, Rc4, StreamCipher};

use super::{CryptoError, BASE64_LENIENT};

/// Encode `text` into a query-safe VRF token.
pub fn encode(text: &str, key: &str) -> Result<String, CryptoError> {
    let mut buf = urlencoding::encode(text).into_owned().into_bytes();
    keystream(key, &mut buf)?;
    let token = STANDARD.encode(buf).replace('/', "_").replace('+', "-");
    Ok(urlencoding::encode(&token).into_owned())
}

/// Decode a VRF token produced by [`encode`] or served by the site.
pub fn decode(token: &str, key: &str) -> Result<String, CryptoError> {
    let token = urlencoding::decode(token.trim()).map_err(|_| CryptoError::Utf8)?;
    let b64 = token.replace('_', "/").replace('-', "+");
    let mut buf = BASE64_LENIENT.decode(b64)?;
    keystream(key, &mut buf)?;
    let text = String::from_utf8(buf).map_err(|_| CryptoError::Utf8)?;
    urlencoding::decode(&text)
        .map(std::borrow::Cow::into_owned)
        .map_err(|_| CryptoError::Utf8)
}

fn keystream(key: &str, buf: &mut [u8]) -> Result<(), CryptoError> {
    let mut cipher =
        Rc4::<U16>::new_from_slice(key.as_bytes()).map_err(|_| CryptoError::InvalidLength)?;
    cipher.apply_keystream(buf);
    Ok(())
}
