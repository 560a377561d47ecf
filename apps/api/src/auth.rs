//! # Authentication
//!
//! Bearer tokens, password hashing and the request guard.
//!
//! ```text
//! Authorization: Bearer <jwt>
//!         │
//!         ▼
//! require_auth ──► JwtManager::validate_token ──► CurrentUser in extensions
//!         │                                               │
//!         ▼ (missing/invalid)                             ▼
//!       401                              handler: user.require(Role::Manager)?
//!                                                         │
//!                                                         ▼ (role too low)
//!                                                       403
//! ```

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use kasir_core::{Role, User};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ApiError;
use crate::AppState;

// =============================================================================
// Tokens
// =============================================================================

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    pub email: String,

    pub role: Role,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Issues and checks HS256 access tokens.
pub struct JwtManager {
    secret: String,
    lifetime_secs: i64,
}

impl JwtManager {
    pub fn new(secret: String, lifetime_secs: i64) -> Self {
        JwtManager { secret, lifetime_secs }
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }

    /// Generate an access token for `user`.
    pub fn generate_token(&self, user: &User) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| ApiError::Unauthorized(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }
}

/// Extract bearer token from Authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// =============================================================================
// Passwords
// =============================================================================

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    use argon2::password_hash::rand_core::OsRng;
    use argon2::password_hash::SaltString;
    use argon2::{Argon2, PasswordHasher};

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))
}

/// False for a wrong password and for a hash that does not parse.
pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// =============================================================================
// Request Guard
// =============================================================================

/// The authenticated caller, taken from the token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    pub role: Role,
}

impl CurrentUser {
    /// 403 unless the caller's role is `minimum` or higher.
    pub fn require(&self, minimum: Role) -> Result<(), ApiError> {
        if self.role.at_least(minimum) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!("Requires {} role", minimum)))
        }
    }
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        CurrentUser {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Middleware for the protected routes: validates the bearer token and
/// stores the [`CurrentUser`] in the request extensions.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match header {
        Some(header) => extract_bearer_token(header)
            .ok_or_else(|| ApiError::Unauthorized("Invalid authorization header".to_string()))?,
        None => {
            warn!(uri = %req.uri(), "Missing authorization header");
            return Err(ApiError::Unauthorized("Authentication required".to_string()));
        }
    };

    let claims = state.jwt.validate_token(token).inspect_err(|e| {
        warn!(uri = %req.uri(), error = %e, "Token rejected");
    })?;

    req.extensions_mut().insert(CurrentUser::from(claims));
    Ok(next.run(req).await)
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        User {
            id: "user-1".to_string(),
            name: "Kasir Satu".to_string(),
            email: "kasir@kasir.com".to_string(),
            password_hash: String::new(),
            role,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_roundtrip() {
        let jwt = JwtManager::new("secret".to_string(), 3600);
        let token = jwt.generate_token(&user(Role::Manager)).unwrap();

        let claims = jwt.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.role, Role::Manager);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_token_rejected() {
        let jwt = JwtManager::new("secret".to_string(), 3600);
        let other = JwtManager::new("other".to_string(), 3600);
        let token = other.generate_token(&user(Role::Admin)).unwrap();

        assert!(matches!(jwt.validate_token(&token), Err(ApiError::Unauthorized(_))));
        assert!(jwt.validate_token("not-a-token").is_err());

        // Expired well past the default leeway
        let stale = JwtManager::new("secret".to_string(), -3600);
        let token = stale.generate_token(&user(Role::Admin)).unwrap();
        assert!(jwt.validate_token(&token).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("rahasia").unwrap();
        assert_ne!(hash, "rahasia");
        assert!(verify_password("rahasia", &hash));
        assert!(!verify_password("salah", &hash));
        assert!(!verify_password("rahasia", "not-a-phc-string"));
    }

    #[test]
    fn test_role_guard() {
        let cashier = CurrentUser::from(Claims {
            sub: "u".to_string(),
            email: "k@kasir.com".to_string(),
            role: Role::Cashier,
            iat: 0,
            exp: 0,
        });
        assert!(cashier.require(Role::Cashier).is_ok());
        assert!(matches!(cashier.require(Role::Manager), Err(ApiError::Forbidden(_))));
    }
}
