//! Deterministic short identifier generation.
//!
//! An identifier is the first 8 lowercase hex characters of the MD5 digest of
//! the URL's UTF-8 bytes. Distinct URLs can collide (32 bits of entropy);
//! collisions are detected by storage, not here.

/// Number of digest bytes kept; each byte is two hex characters.
const ID_BYTES: usize = 4;

/// Length of a short identifier in characters.
pub const ID_LENGTH: usize = ID_BYTES * 2;

/// Computes the short identifier for a URL.
///
/// # Examples
///
/// ```
/// use url_shortener_core::utils::id_generator::generate_id;
///
/// assert_eq!(generate_id("https://example.com"), "c984d06a");
/// ```
pub fn generate_id(url: &str) -> String {
    let digest = md5::compute(url.as_bytes());
    hex::encode(&digest.0[..ID_BYTES])
}
