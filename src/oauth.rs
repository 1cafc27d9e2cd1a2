//! OAuth 1.0a (HMAC-SHA1) request signing.

use crate::config::Credentials;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 percent-encoding: everything but unreserved characters.
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Builds the signature base string from the method, the URL without query
/// and every query/form parameter plus the `oauth_*` ones.
pub fn signature_base_string(method: &str, base_url: &str, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();
    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(base_url),
        percent_encode(&param_string)
    )
}

pub fn sign(base_string: &str, consumer_secret: &str, token_secret: &str) -> String {
    let key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    );
    let mut mac =
        HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(base_string.as_bytes());
    base64::encode(mac.finalize().into_bytes())
}

/// Produces the `Authorization` header value for one request.
pub fn authorization_header(
    credentials: &Credentials,
    method: &str,
    base_url: &str,
    request_params: &[(String, String)],
    nonce: &str,
    timestamp: i64,
) -> String {
    let mut oauth_params = vec![
        ("oauth_consumer_key".to_string(), credentials.consumer_key.clone()),
        ("oauth_nonce".to_string(), nonce.to_string()),
        ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
        ("oauth_timestamp".to_string(), timestamp.to_string()),
        ("oauth_token".to_string(), credentials.access_token.clone()),
        ("oauth_version".to_string(), "1.0".to_string()),
    ];

    let mut all_params = oauth_params.clone();
    all_params.extend_from_slice(request_params);
    let base_string = signature_base_string(method, base_url, &all_params);
    let signature = sign(
        &base_string,
        &credentials.consumer_secret,
        &credentials.access_token_secret,
    );
    oauth_params.push(("oauth_signature".to_string(), signature));
    oauth_params.sort();

    let fields = oauth_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("OAuth {}", fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            consumer_key: "ckey".to_string(),
            consumer_secret: "csecret".to_string(),
            access_token: "atoken".to_string(),
            access_token_secret: "asecret".to_string(),
        }
    }

    #[test]
    fn test_percent_encode_reserved_characters() {
        assert_eq!(percent_encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
        assert_eq!(percent_encode("a-b_c.d~e"), "a-b_c.d~e");
        assert_eq!(percent_encode("@bot"), "%40bot");
    }

    #[test]
    fn test_base_string_sorts_and_encodes_params() {
        let params = vec![
            ("status".to_string(), "hi there".to_string()),
            ("count".to_string(), "5".to_string()),
        ];
        let base = signature_base_string("post", "https://api.example.com/1.1/x.json", &params);
        assert_eq!(
            base,
            "POST&https%3A%2F%2Fapi.example.com%2F1.1%2Fx.json&count%3D5%26status%3Dhi%2520there"
        );
    }

    #[test]
    fn test_sign_keys_with_encoded_secrets() {
        let signature = sign(
            "POST&https%3A%2F%2Fexample.com&a%3D1",
            "consumer secret",
            "token/secret",
        );
        assert_eq!(signature, "lVUVrGi237Sdr5ZtMuxyEoCF15Y=");
    }

    #[test]
    fn test_header_is_deterministic_for_fixed_nonce() {
        let params = vec![("q".to_string(), "@bot".to_string())];
        let a = authorization_header(&credentials(), "GET", "https://x/y", &params, "n1", 100);
        let b = authorization_header(&credentials(), "GET", "https://x/y", &params, "n1", 100);
        let c = authorization_header(&credentials(), "GET", "https://x/y", &params, "n2", 100);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("OAuth "));
        for field in [
            "oauth_consumer_key=\"ckey\"",
            "oauth_nonce=\"n1\"",
            "oauth_signature_method=\"HMAC-SHA1\"",
            "oauth_timestamp=\"100\"",
            "oauth_token=\"atoken\"",
            "oauth_version=\"1.0\"",
            "oauth_signature=\"",
        ] {
            assert!(a.contains(field), "missing {} in {}", field, a);
        }
    }

    #[test]
    fn test_signature_depends_on_request_params() {
        let one = vec![("q".to_string(), "@bot".to_string())];
        let two = vec![("q".to_string(), "@other".to_string())];
        let a = authorization_header(&credentials(), "GET", "https://x/y", &one, "n", 1);
        let b = authorization_header(&credentials(), "GET", "https://x/y", &two, "n", 1);
        assert_ne!(a, b);
    }
}
