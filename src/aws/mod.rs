mod sign;

pub use sign::{sign, uri_encode_path, SigningRequest};

/// Static AWS credentials, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Present for temporary (STS) credentials
    pub session_token: Option<String>,
}
