use chrono::{DateTime, Utc};
use ring::{digest, hmac};

use super::Credentials;

/// One outgoing request, described in the already-canonical form Signature
/// Version 4 hashes over.
///
/// `path` must be URI-encoded with `/` preserved (see [`uri_encode_path`]);
/// `query` must be URI-encoded with parameters sorted by name. The callers in
/// this crate only ever send empty or single-parameter query strings, so no
/// general query canonicalizer is needed.
pub struct SigningRequest<'a> {
    pub method: &'a str,
    pub host: &'a str,
    pub path: &'a str,
    pub query: &'a str,
    /// Extra headers the caller will send, as (lowercase name, value).
    /// These are folded into the signature; the caller still sets them.
    pub headers: &'a [(String, String)],
    pub payload: &'a [u8],
    pub service: &'a str,
    pub region: &'a str,
    pub time: DateTime<Utc>,
}

/// Sign a request, returning the headers to attach to it: `authorization`,
/// `x-amz-date`, and for S3 `x-amz-content-sha256` (plus
/// `x-amz-security-token` for temporary credentials).
pub fn sign(creds: &Credentials, req: &SigningRequest<'_>) -> Vec<(String, String)> {
    let amz_date = req.time.format("%Y%m%dT%H%M%SZ").to_string();
    let date = req.time.format("%Y%m%d").to_string();
    let payload_hash = hex(digest::digest(&digest::SHA256, req.payload).as_ref());

    // All headers participating in the signature, sorted by name
    let mut signed: Vec<(String, String)> = req
        .headers
        .iter()
        .map(|(name, value)| (name.to_lowercase(), value.trim().to_string()))
        .collect();
    signed.push(("host".to_string(), req.host.to_string()));
    signed.push(("x-amz-date".to_string(), amz_date.clone()));
    if req.service == "s3" {
        // S3 requires the payload hash as its own signed header
        signed.push(("x-amz-content-sha256".to_string(), payload_hash.clone()));
    }
    if let Some(ref token) = creds.session_token {
        signed.push(("x-amz-security-token".to_string(), token.clone()));
    }
    signed.sort_by(|a, b| a.0.cmp(&b.0));

    let canonical_headers: String = signed
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect();
    let signed_names = signed
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        req.method, req.path, req.query, canonical_headers, signed_names, payload_hash
    );

    let scope = format!("{}/{}/{}/aws4_request", date, req.region, req.service);
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{}",
        amz_date,
        scope,
        hex(digest::digest(&digest::SHA256, canonical_request.as_bytes()).as_ref())
    );

    // Derive the signing key: HMAC chain over date, region, service
    let mut key = hmac_sha256(
        format!("AWS4{}", creds.secret_access_key).as_bytes(),
        date.as_bytes(),
    );
    key = hmac_sha256(&key, req.region.as_bytes());
    key = hmac_sha256(&key, req.service.as_bytes());
    key = hmac_sha256(&key, b"aws4_request");
    let signature = hex(&hmac_sha256(&key, string_to_sign.as_bytes()));

    let authorization = format!(
        "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
        creds.access_key_id, scope, signed_names, signature
    );

    let mut out = vec![
        ("authorization".to_string(), authorization),
        ("x-amz-date".to_string(), amz_date),
    ];
    if req.service == "s3" {
        out.push(("x-amz-content-sha256".to_string(), payload_hash));
    }
    if let Some(ref token) = creds.session_token {
        out.push(("x-amz-security-token".to_string(), token.clone()));
    }
    out
}

/// Percent-encode a path per RFC 3986, leaving `/` intact. Object keys with
/// spaces or unicode must be encoded identically in the URL and the
/// canonical request or the signature will not match.
pub fn uri_encode_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                out.push(byte as char);
            }
            _ => {
                out.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    out
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let key = hmac::Key::new(hmac::HMAC_SHA256, key);
    hmac::sign(&key, data).as_ref().to_vec()
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
