use axum::http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Claims carried by the identity provider's bearer token. Only the fields
/// this service reads; the provider issues more.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BearerClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: i64,
}

/// Extracts and verifies the caller's claims from the `Authorization` header.
/// Returns `None` on any miss (absent header, malformed token, bad
/// signature); callers that treat identity as best-effort log and fall back.
pub fn claims_from_headers(headers: &HeaderMap, jwt_secret: &str) -> Option<BearerClaims> {
    if jwt_secret.is_empty() {
        return None;
    }

    let header = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ").or_else(|| header.strip_prefix("bearer "))?;

    let validation = Validation::new(Algorithm::HS256);
    match decode::<BearerClaims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            debug!("bearer token rejected: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token_for(sub: &str, secret: &str, exp: i64) -> String {
        let claims = BearerClaims {
            sub: sub.to_string(),
            email: Some("ana@acme.io".to_string()),
            name: None,
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn headers_with(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            format!("Bearer {}", token).parse().unwrap(),
        );
        headers
    }

    #[test]
    fn test_valid_token() {
        let exp = chrono::Utc::now().timestamp() + 600;
        let token = token_for("idp|42", "s3cret", exp);
        let claims = claims_from_headers(&headers_with(&token), "s3cret").unwrap();
        assert_eq!(claims.sub, "idp|42");
        assert_eq!(claims.email.as_deref(), Some("ana@acme.io"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let exp = chrono::Utc::now().timestamp() + 600;
        let token = token_for("idp|42", "s3cret", exp);
        assert!(claims_from_headers(&headers_with(&token), "other").is_none());
    }

    #[test]
    fn test_expired_token_rejected() {
        let exp = chrono::Utc::now().timestamp() - 600;
        let token = token_for("idp|42", "s3cret", exp);
        assert!(claims_from_headers(&headers_with(&token), "s3cret").is_none());
    }

    #[test]
    fn test_missing_header() {
        assert!(claims_from_headers(&HeaderMap::new(), "s3cret").is_none());
    }

    #[test]
    fn test_empty_secret_never_validates() {
        let exp = chrono::Utc::now().timestamp() + 600;
        let token = token_for("idp|42", "", exp);
        assert!(claims_from_headers(&headers_with(&token), "").is_none());
    }
}
