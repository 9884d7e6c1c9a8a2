//! OAuth 1.0a request signing (RFC 5849).
//!
//! Builds the `Authorization: OAuth ...` header for a request. Supports the
//! `PLAINTEXT` method, which Discogs accepts over HTTPS, and `HMAC-SHA1`.

use std::collections::BTreeMap;

use base64::Engine as _;
use crate_digger_discogs_models::{SignatureMethod, TokenPair};
use hmac::{Hmac, Mac as _};
use sha1::Sha1;

use crate::ConsumerCredentials;
use crate::transport::Method;

/// Everything needed to sign one request.
#[derive(Debug, Clone, Copy)]
pub struct SigningInput<'a> {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL, query string included.
    pub url: &'a str,
    /// Application credentials.
    pub consumer: &'a ConsumerCredentials,
    /// Request or access token, when the step has one.
    pub token: Option<&'a TokenPair>,
    /// Additional `oauth_*` protocol parameters (callback, verifier).
    pub extra: &'a [(&'a str, &'a str)],
    /// Signature method.
    pub signature_method: SignatureMethod,
}

/// Signing failed. Only possible if the HMAC key is rejected.
#[derive(Debug, thiserror::Error)]
#[error("failed to sign request: {0}")]
pub struct SigningError(String);

/// Percent-encodes a value with the RFC 3986 unreserved set.
#[must_use]
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Builds an `Authorization` header value with a fresh nonce and the
/// current timestamp.
///
/// # Errors
///
/// Returns [`SigningError`] if the signature cannot be computed.
pub fn authorization_header(input: &SigningInput<'_>) -> Result<String, SigningError> {
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    let timestamp = chrono::Utc::now().timestamp().to_string();
    authorization_header_with(input, &nonce, &timestamp)
}

/// Builds an `Authorization` header value with an explicit nonce and
/// timestamp.
///
/// # Errors
///
/// Returns [`SigningError`] if the signature cannot be computed.
pub fn authorization_header_with(
    input: &SigningInput<'_>,
    nonce: &str,
    timestamp: &str,
) -> Result<String, SigningError> {
    let mut params = protocol_params(input, nonce, timestamp);
    let signature = sign(input, &params)?;
    params.push(("oauth_signature".to_owned(), signature));
    params.sort();

    let fields = params
        .iter()
        .map(|(key, value)| format!("{}=\"{}\"", percent_encode(key), percent_encode(value)))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!("OAuth {fields}"))
}

/// The `oauth_*` parameters that take part in the signature.
fn protocol_params(
    input: &SigningInput<'_>,
    nonce: &str,
    timestamp: &str,
) -> Vec<(String, String)> {
    let mut params = vec![
        ("oauth_consumer_key".to_owned(), input.consumer.key.clone()),
        ("oauth_nonce".to_owned(), nonce.to_owned()),
        (
            "oauth_signature_method".to_owned(),
            input.signature_method.to_string(),
        ),
        ("oauth_timestamp".to_owned(), timestamp.to_owned()),
        ("oauth_version".to_owned(), "1.0".to_owned()),
    ];

    if let Some(token) = input.token {
        params.push(("oauth_token".to_owned(), token.token.clone()));
    }

    for (key, value) in input.extra {
        params.push(((*key).to_owned(), (*value).to_owned()));
    }

    params
}

/// Computes `oauth_signature`.
fn sign(input: &SigningInput<'_>, params: &[(String, String)]) -> Result<String, SigningError> {
    let key = format!(
        "{}&{}",
        percent_encode(&input.consumer.secret),
        percent_encode(input.token.map_or("", |t| t.secret.as_str())),
    );

    match input.signature_method {
        SignatureMethod::Plaintext => Ok(key),
        SignatureMethod::HmacSha1 => {
            let base = base_string(input.method, input.url, params);
            let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes())
                .map_err(|e| SigningError(e.to_string()))?;
            mac.update(base.as_bytes());
            Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
        }
    }
}

/// Builds the RFC 5849 §3.4.1 signature base string.
#[must_use]
pub fn base_string(method: Method, url: &str, protocol_params: &[(String, String)]) -> String {
    let (base_url, query) = url.split_once('?').unwrap_or((url, ""));

    let mut encoded: Vec<(String, String)> = parse_query(query)
        .into_iter()
        .chain(protocol_params.iter().cloned())
        .map(|(key, value)| (percent_encode(&key), percent_encode(&value)))
        .collect();
    encoded.sort();

    let normalized = encoded
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{method}&{}&{}",
        percent_encode(&normalize_base_url(base_url)),
        percent_encode(&normalized),
    )
}

/// Lowercases scheme and host and drops the default port.
fn normalize_base_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_owned();
    };
    let scheme = scheme.to_lowercase();
    let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
    let mut authority = authority.to_lowercase();

    let default_port = if scheme == "https" { ":443" } else { ":80" };
    if let Some(stripped) = authority.strip_suffix(default_port) {
        authority = stripped.to_owned();
    }

    format!("{scheme}://{authority}/{path}")
}

/// Decodes `application/x-www-form-urlencoded` pairs.
fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (form_decode(key), form_decode(value))
        })
        .collect()
}

fn form_decode(value: &str) -> String {
    let spaced = value.replace('+', " ");
    urlencoding::decode(&spaced).map_or(spaced.clone(), std::borrow::Cow::into_owned)
}

/// Parses a form-encoded token response into a map.
#[must_use]
pub fn parse_form(body: &str) -> BTreeMap<String, String> {
    parse_query(body.trim()).into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consumer() -> ConsumerCredentials {
        ConsumerCredentials::new("dpf43f3p2l4k3l03", "kd94hf93k423kf44")
    }

    #[test]
    fn percent_encodes_reserved_characters() {
        assert_eq!(percent_encode("a b&c=d~e-f_g.h"), "a%20b%26c%3Dd~e-f_g.h");
        assert_eq!(percent_encode("ü"), "%C3%BC");
    }

    #[test]
    fn builds_reference_base_string() {
        let params = vec![
            ("oauth_consumer_key".to_owned(), "dpf43f3p2l4k3l03".to_owned()),
            ("oauth_token".to_owned(), "nnch734d00sl2jdk".to_owned()),
            ("oauth_signature_method".to_owned(), "HMAC-SHA1".to_owned()),
            ("oauth_timestamp".to_owned(), "1191242096".to_owned()),
            ("oauth_nonce".to_owned(), "kllo9940pd9333jh".to_owned()),
            ("oauth_version".to_owned(), "1.0".to_owned()),
        ];
        let base = base_string(
            Method::Get,
            "http://photos.example.net/photos?file=vacation.jpg&size=original",
            &params,
        );
        assert_eq!(
            base,
            "GET&http%3A%2F%2Fphotos.example.net%2Fphotos&file%3Dvacation.jpg%26\
             oauth_consumer_key%3Ddpf43f3p2l4k3l03%26oauth_nonce%3Dkllo9940pd9333jh%26\
             oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D1191242096%26\
             oauth_token%3Dnnch734d00sl2jdk%26oauth_version%3D1.0%26size%3Doriginal"
        );
    }

    #[test]
    fn hmac_sha1_matches_reference_signature() {
        let consumer = consumer();
        let token = TokenPair::new("nnch734d00sl2jdk", "pfkkdhi9sl3r4s00");
        let input = SigningInput {
            method: Method::Get,
            url: "http://photos.example.net/photos?file=vacation.jpg&size=original",
            consumer: &consumer,
            token: Some(&token),
            extra: &[],
            signature_method: SignatureMethod::HmacSha1,
        };
        let header = authorization_header_with(&input, "kllo9940pd9333jh", "1191242096").unwrap();
        assert!(
            header.contains("oauth_signature=\"tR3%2BTy81lMeYAr%2FFid0kMTYa%2FWM%3D\""),
            "{header}"
        );
    }

    #[test]
    fn plaintext_signature_is_joined_secrets() {
        let consumer = ConsumerCredentials::new("key", "consumer secret");
        let token = TokenPair::new("tok", "tok&secret");
        let input = SigningInput {
            method: Method::Post,
            url: "https://api.discogs.com/oauth/access_token",
            consumer: &consumer,
            token: Some(&token),
            extra: &[("oauth_verifier", "v3r1f13r")],
            signature_method: SignatureMethod::Plaintext,
        };
        let header = authorization_header_with(&input, "n0nce", "1700000000").unwrap();
        assert!(header.starts_with("OAuth oauth_consumer_key=\"key\", oauth_nonce=\"n0nce\""));
        // "consumer%20secret&tok%26secret", encoded once more for the header
        assert!(header.contains("oauth_signature=\"consumer%2520secret%26tok%2526secret\""));
        assert!(header.contains("oauth_signature_method=\"PLAINTEXT\""));
        assert!(header.contains("oauth_token=\"tok\""));
        assert!(header.contains("oauth_verifier=\"v3r1f13r\""));
    }

    #[test]
    fn request_token_step_has_no_token_secret() {
        let consumer = ConsumerCredentials::new("key", "secret");
        let input = SigningInput {
            method: Method::Post,
            url: "https://api.discogs.com/oauth/request_token",
            consumer: &consumer,
            token: None,
            extra: &[("oauth_callback", "http://127.0.0.1:8080/auth/discogs/callback")],
            signature_method: SignatureMethod::Plaintext,
        };
        let header = authorization_header(&input).unwrap();
        assert!(header.contains("oauth_signature=\"secret%26\""));
        assert!(header.contains(
            "oauth_callback=\"http%3A%2F%2F127.0.0.1%3A8080%2Fauth%2Fdiscogs%2Fcallback\""
        ));
        assert!(!header.contains("oauth_token="));
    }

    #[test]
    fn normalizes_base_url() {
        assert_eq!(
            normalize_base_url("HTTPS://API.Discogs.com:443/oauth/identity"),
            "https://api.discogs.com/oauth/identity"
        );
        assert_eq!(
            normalize_base_url("http://example.com:8080/x"),
            "http://example.com:8080/x"
        );
    }

    #[test]
    fn parses_token_response() {
        let form = parse_form(
            "oauth_token=abc&oauth_token_secret=s%2Fecret&oauth_callback_confirmed=true\n",
        );
        assert_eq!(form.get("oauth_token").map(String::as_str), Some("abc"));
        assert_eq!(
            form.get("oauth_token_secret").map(String::as_str),
            Some("s/ecret")
        );
    }
}
