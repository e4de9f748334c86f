use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use todoshare_core::claims::Claims;

use crate::audit;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingHeader,

    #[error("invalid authorization format")]
    InvalidFormat,

    #[error("invalid token")]
    InvalidToken,
}

/// Verifies HS256 bearer tokens issued by the login service.
#[derive(Clone)]
pub struct AuthState {
    key: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl AuthState {
    pub fn hs256(secret: &[u8]) -> Self {
        Self {
            key: Arc::new(DecodingKey::from_secret(secret)),
            validation: Arc::new(Validation::new(Algorithm::HS256)),
        }
    }

    pub fn verify(&self, header: Option<&str>) -> Result<Claims, AuthError> {
        let header = header.ok_or(AuthError::MissingHeader)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidFormat)?;

        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                AuthError::InvalidToken
            })
    }
}

fn skip_auth(path: &str) -> bool {
    matches!(path, "/healthz" | "/readyz")
}

pub async fn auth_middleware(
    axum::extract::State(auth_state): axum::extract::State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if skip_auth(request.uri().path()) {
        return next.run(request).await;
    }

    let header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_state.verify(header) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            audit::audit_auth_failure(&e.to_string());
            error_json(StatusCode::UNAUTHORIZED, &e.to_string())
        }
    }
}

fn error_json(status: StatusCode, msg: &str) -> Response {
    let body = serde_json::json!({"error": msg});
    (status, axum::Json(body)).into_response()
}
