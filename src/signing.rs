//! Request signing
//!
//! Every call carries an `sn` query parameter: the MD5 digest of the sorted,
//! form-encoded request parameters with the shared secret appended as a
//! trailing `sk` pair.

use md5::{Digest, Md5};
use std::collections::BTreeMap;
use url::form_urlencoded;

/// Placeholder sent instead of a real signature when trial mode is on
pub const DEFAULT_TRIAL_SIGNATURE: &str = "testsn";

/// How the `sn` parameter is produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureMode {
    /// Compute a signature for every request
    Signed,
    /// Send a fixed placeholder; only trial accounts accept this
    Trial { placeholder: String },
}

impl Default for SignatureMode {
    fn default() -> Self {
        SignatureMode::Signed
    }
}

impl SignatureMode {
    pub fn signature(&self, params: &BTreeMap<String, String>, secret: &str) -> String {
        match self {
            SignatureMode::Signed => sign(params, secret),
            SignatureMode::Trial { placeholder } => placeholder.clone(),
        }
    }
}

/// Build the string that gets hashed: `k1=v1&k2=v2&sk=<secret>`
///
/// Keys come out sorted because the map is ordered. Values are form-encoded,
/// the secret is appended as-is.
pub fn canonical_query(params: &BTreeMap<String, String>, secret: &str) -> String {
    let mut query = params
        .iter()
        .map(|(key, value)| {
            let encoded: String = form_urlencoded::byte_serialize(value.as_bytes()).collect();
            format!("{}={}", key, encoded)
        })
        .collect::<Vec<_>>()
        .join("&");

    query.push_str("&sk=");
    query.push_str(secret);
    query
}

/// Lowercase hex MD5 of the canonical query
pub fn sign(params: &BTreeMap<String, String>, secret: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(canonical_query(params, secret).as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_canonical_query_sorted() {
        let query = canonical_query(&params(&[("taskId", "t1"), ("clientId", "abc")]), "secret");
        assert_eq!(query, "clientId=abc&taskId=t1&sk=secret");
    }

    #[test]
    fn test_canonical_query_encodes_values() {
        let query = canonical_query(&params(&[("password", "a b&c"), ("clientId", "abc")]), "secret");
        assert_eq!(query, "clientId=abc&password=a+b%26c&sk=secret");
    }

    #[test]
    fn test_known_signatures() {
        assert_eq!(
            sign(&params(&[("clientId", "abc"), ("taskId", "t1")]), "secret"),
            "cde8c95566c790632fde9dc12a96ba5a"
        );
        assert_eq!(
            sign(&params(&[("clientId", "abc"), ("password", "a b&c")]), "secret"),
            "a692480464ebaff0ec9db5f0ae11bfed"
        );
    }

    #[test]
    fn test_empty_secret_still_signs() {
        let sn = sign(&params(&[("clientId", "abc")]), "");
        assert_eq!(sn, "6628542b0033bb497bd28eea41829344");
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let a = params(&[("clientId", "abc"), ("docId", "d1"), ("fileName", "out.pdf")]);
        let b = params(&[("fileName", "out.pdf"), ("docId", "d1"), ("clientId", "abc")]);
        assert_eq!(sign(&a, "k"), sign(&b, "k"));
    }

    #[test]
    fn test_different_values_differ() {
        let a = params(&[("clientId", "abc"), ("taskId", "t1")]);
        let b = params(&[("clientId", "abc"), ("taskId", "t2")]);
        assert_ne!(sign(&a, "k"), sign(&b, "k"));
    }

    #[test]
    fn test_signature_shape() {
        let sn = sign(&params(&[("clientId", "abc")]), "k");
        assert_eq!(sn.len(), 32);
        assert!(sn.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_trial_mode_uses_placeholder() {
        let mode = SignatureMode::Trial {
            placeholder: DEFAULT_TRIAL_SIGNATURE.to_string(),
        };
        assert_eq!(mode.signature(&params(&[("clientId", "abc")]), "k"), "testsn");
    }
}
