//! Session naming derived from the shared secret.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use sha2::{Digest, Sha256};

use crate::addr::Addr;

/// Length of a derived session key.
pub const SESSION_KEY_LEN: usize = 43;

/// Derives the public session key for a shared secret.
///
/// SHA-256 of the secret, URL-safe base64, lowercased and cut to
/// [`SESSION_KEY_LEN`] characters so it fits in a DNS label.
///
/// ```
/// # use burrow::session::derive_session_key;
/// let key = derive_session_key(b"secret");
/// assert_eq!(key.len(), 43);
/// assert_eq!(key, derive_session_key(b"secret"));
/// ```
pub fn derive_session_key(secret: &[u8]) -> String {
    let digest = Sha256::digest(secret);
    let mut encoded = URL_SAFE.encode(digest);
    encoded.truncate(SESSION_KEY_LEN);
    encoded.to_lowercase()
}

/// Public URL the broker serves a session under.
///
/// The session key becomes a subdomain of the broker host. The broker port is
/// kept unless it is the default for `scheme`.
pub fn public_url(session_key: &str, scheme: &str, broker: &Addr) -> anyhow::Result<url::Url> {
    let mut url = url::Url::parse(&format!("{scheme}://{session_key}.{}/", broker.host))?;
    url.set_port(Some(broker.port))
        .map_err(|()| anyhow::anyhow!("cannot set a port on {url}"))?;
    Ok(url)
}
