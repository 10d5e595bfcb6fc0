use crate::error::ApiError;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use sha2::{Digest, Sha256};

/// The authenticated principal attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub name: String,
}

/// Validates request credentials.
#[async_trait::async_trait]
pub trait AuthProvider: Send + Sync {
    /// `Ok(None)` when the request carries no credentials at all.
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Option<Caller>, ApiError>;
}

/// Auth provider that checks `Authorization: Bearer <key>` against a configured API key.
///
/// Only the SHA-256 digest of the key is kept in memory.
#[derive(Clone)]
pub struct ApiKeyAuth {
    key_hash: String,
}

impl ApiKeyAuth {
    pub fn new(api_key: &str) -> Self {
        Self {
            key_hash: sha256_hex(api_key.trim().as_bytes()),
        }
    }
}

#[async_trait::async_trait]
impl AuthProvider for ApiKeyAuth {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Option<Caller>, ApiError> {
        let Some(authz) = headers.get(AUTHORIZATION) else {
            return Ok(None);
        };
        let authz = authz
            .to_str()
            .map_err(|_| ApiError::Unauthorized("invalid authorization header".into()))?;

        let token = authz
            .strip_prefix("Bearer ")
            .or_else(|| authz.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::Unauthorized("unsupported authorization scheme".into()))?
            .trim();

        if token.is_empty() || sha256_hex(token.as_bytes()) != self.key_hash {
            return Err(ApiError::Unauthorized("invalid api key".into()));
        }

        Ok(Some(Caller {
            name: "api_key".to_string(),
        }))
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    let out = h.finalize();
    let mut s = String::with_capacity(out.len() * 2);
    for b in out {
        use std::fmt::Write as _;
        let _ = write!(&mut s, "{:02x}", b);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(v: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(v).unwrap());
        h
    }

    #[tokio::test]
    async fn accepts_matching_bearer_token() {
        let auth = ApiKeyAuth::new("s3cret");
        let caller = auth.authenticate(&headers("Bearer s3cret")).await.unwrap();
        assert_eq!(caller.unwrap().name, "api_key");
    }

    #[tokio::test]
    async fn rejects_wrong_token_and_scheme() {
        let auth = ApiKeyAuth::new("s3cret");
        assert!(auth.authenticate(&headers("Bearer nope")).await.is_err());
        assert!(auth.authenticate(&headers("Basic s3cret")).await.is_err());
    }

    #[tokio::test]
    async fn missing_header_is_none() {
        let auth = ApiKeyAuth::new("s3cret");
        assert!(auth.authenticate(&HeaderMap::new()).await.unwrap().is_none());
    }

    #[test]
    fn sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
