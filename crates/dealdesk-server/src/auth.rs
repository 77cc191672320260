//! Bearer-token authentication.
//!
//! Token issuance is external; this extractor verifies the HS256
//! signature with the configured secret and hands the handler a
//! `Principal { user_id, role }`.

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dealdesk_core::models::{Principal, Role};

use crate::envelope::ApiError;
use crate::state::AppState;

/// Claims carried by the access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id
    pub sub: Uuid,
    pub role: Role,
    /// Expiry as a unix timestamp
    pub exp: i64,
}

/// Authenticated principal extractor.
pub struct AuthPrincipal(pub Principal);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| {
            ApiError::Unauthorized("Missing bearer token".to_string())
        })?;

        let key = DecodingKey::from_secret(state.config.jwt_secret.as_bytes());
        let data = decode::<Claims>(token, &key, &Validation::new(Algorithm::HS256))
            .map_err(|e| ApiError::Unauthorized(format!("Invalid token: {e}")))?;

        Ok(Self(Principal::new(data.claims.sub, data.claims.role)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    #[test]
    fn test_claims_round_trip() {
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: Role::FinancialManager,
            exp: chrono::Utc::now().timestamp() + 3600,
        };
        let secret = b"0123456789abcdef0123";
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap();

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(secret),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();
        assert_eq!(decoded.claims.sub, claims.sub);
        assert_eq!(decoded.claims.role, Role::FinancialManager);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: Role::Admin,
            exp: chrono::Utc::now().timestamp() + 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"correct-secret-value"),
        )
        .unwrap();

        assert!(decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"wrong-secret-value!!"),
            &Validation::new(Algorithm::HS256),
        )
        .is_err());
    }
}
