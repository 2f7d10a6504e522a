use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use ember_types::api::Claims;

use crate::AppState;
use crate::error::ApiError;

/// Extract and validate the identity JWT from the Authorization header.
/// The secret is injected through state; the token itself is issued by
/// the external identity service.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Auth)?;

    let token = auth_header.strip_prefix("Bearer ").ok_or(ApiError::Auth)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Auth)?;

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}

/// Bearer comparison for the webhook's shared secret.
pub fn check_shared_secret(headers: &axum::http::HeaderMap, secret: &str) -> Result<(), ApiError> {
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or(ApiError::Auth)?;

    if presented != secret {
        return Err(ApiError::Auth);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue};

    #[test]
    fn shared_secret_requires_exact_bearer() {
        let mut headers = HeaderMap::new();
        assert!(check_shared_secret(&headers, "s3cret").is_err());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer wrong"));
        assert!(check_shared_secret(&headers, "s3cret").is_err());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("s3cret"));
        assert!(check_shared_secret(&headers, "s3cret").is_err());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer s3cret"));
        assert!(check_shared_secret(&headers, "s3cret").is_ok());
    }
}
