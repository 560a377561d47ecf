//! Account flows: login, registration, password changes and the first-run
//! admin.

use std::sync::Arc;

use kasir_core::validation::validate_password;
use kasir_core::{CoreError, Role, User};
use kasir_db::{Database, NewUser};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password, JwtManager};
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};

const BAD_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Admin-side account creation; unlike registration the role is chosen.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    /// Seconds until the token expires.
    pub expires_in: i64,
    pub user: User,
}

#[derive(Clone)]
pub struct AuthService {
    db: Database,
    jwt: Arc<JwtManager>,
}

impl AuthService {
    pub fn new(db: Database, jwt: Arc<JwtManager>) -> Self {
        AuthService { db, jwt }
    }

    /// Unknown email and wrong password share one message.
    pub async fn login(&self, request: &LoginRequest) -> ApiResult<LoginResponse> {
        let Some(user) = self.db.users().get_by_email(&request.email).await? else {
            warn!(email = %request.email, "Login failed: unknown email");
            return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
        };

        if !verify_password(&request.password, &user.password_hash) {
            warn!(user_id = %user.id, "Login failed: wrong password");
            return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
        }

        if !user.is_active {
            warn!(user_id = %user.id, "Login refused: account inactive");
            return Err(ApiError::Unauthorized("Account is inactive".to_string()));
        }

        let token = self.jwt.generate_token(&user)?;
        info!(user_id = %user.id, role = %user.role, "User logged in");

        Ok(LoginResponse {
            token,
            token_type: "Bearer",
            expires_in: self.jwt.lifetime_secs(),
            user,
        })
    }

    /// Public sign-up; always a cashier.
    pub async fn register(&self, request: &RegisterRequest) -> ApiResult<User> {
        self.create_account(&request.name, &request.email, &request.password, Role::Cashier)
            .await
    }

    pub async fn create_user(&self, request: &CreateUserRequest) -> ApiResult<User> {
        self.create_account(&request.name, &request.email, &request.password, request.role)
            .await
    }

    pub async fn change_password(&self, user_id: &str, request: &ChangePasswordRequest) -> ApiResult<()> {
        let user = self
            .db
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| CoreError::UserNotFound(user_id.to_string()))?;

        if !verify_password(&request.old_password, &user.password_hash) {
            warn!(user_id = %user.id, "Password change refused: wrong current password");
            return Err(ApiError::Unauthorized("Current password is incorrect".to_string()));
        }

        validate_password(&request.new_password)?;
        let hash = hash_password(&request.new_password)?;
        self.db.users().set_password_hash(&user.id, &hash).await?;
        Ok(())
    }

    /// Creates the configured admin when no users exist yet.
    ///
    /// Returns the new admin, or `None` when the directory already had users.
    pub async fn bootstrap_admin(&self, config: &ApiConfig) -> ApiResult<Option<User>> {
        if self.db.users().count().await? > 0 {
            return Ok(None);
        }

        let admin = self
            .create_account(&config.admin_name, &config.admin_email, &config.admin_password, Role::Admin)
            .await?;

        info!(email = %admin.email, "Bootstrap admin created");
        if config.uses_default_admin_password() {
            warn!("Bootstrap admin uses the default password; change it after first login");
        }

        Ok(Some(admin))
    }

    async fn create_account(&self, name: &str, email: &str, password: &str, role: Role) -> ApiResult<User> {
        validate_password(password)?;

        let user = self
            .db
            .users()
            .create(&NewUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash: hash_password(password)?,
                role,
            })
            .await?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kasir_db::DbConfig;

    async fn service() -> AuthService {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        AuthService::new(db, Arc::new(JwtManager::new("test-secret".to_string(), 3600)))
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Kasir Satu".to_string(),
            email: email.to_string(),
            password: "rahasia".to_string(),
        }
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let auth = service().await;
        let user = auth.register(&register_request("kasir@kasir.com")).await.unwrap();
        assert_eq!(user.role, Role::Cashier);

        let session = auth
            .login(&login_request("KASIR@kasir.com", "rahasia"))
            .await
            .unwrap();
        assert_eq!(session.user.id, user.id);
        assert_eq!(session.token_type, "Bearer");
        assert_eq!(session.expires_in, 3600);
    }

    #[tokio::test]
    async fn test_login_failures_share_message() {
        let auth = service().await;
        auth.register(&register_request("kasir@kasir.com")).await.unwrap();

        let unknown = auth.login(&login_request("nobody@kasir.com", "rahasia")).await.unwrap_err();
        let wrong = auth.login(&login_request("kasir@kasir.com", "salah123")).await.unwrap_err();
        assert_eq!(unknown.to_string(), BAD_CREDENTIALS);
        assert_eq!(wrong.to_string(), BAD_CREDENTIALS);
    }

    #[tokio::test]
    async fn test_inactive_account_refused() {
        let auth = service().await;
        let user = auth.register(&register_request("kasir@kasir.com")).await.unwrap();
        auth.db
            .users()
            .update(
                &user.id,
                &kasir_db::UserUpdate {
                    name: user.name.clone(),
                    email: user.email.clone(),
                    role: user.role,
                    is_active: false,
                },
            )
            .await
            .unwrap();

        let err = auth.login(&login_request("kasir@kasir.com", "rahasia")).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(msg) if msg.contains("inactive")));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_short_passwords() {
        let auth = service().await;
        auth.register(&register_request("kasir@kasir.com")).await.unwrap();

        let dup = auth.register(&register_request("kasir@kasir.com")).await.unwrap_err();
        assert!(matches!(dup, ApiError::Conflict(_)));

        let short = auth
            .register(&RegisterRequest {
                password: "123".to_string(),
                ..register_request("baru@kasir.com")
            })
            .await
            .unwrap_err();
        assert!(matches!(short, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_change_password() {
        let auth = service().await;
        let user = auth.register(&register_request("kasir@kasir.com")).await.unwrap();

        let wrong = auth
            .change_password(
                &user.id,
                &ChangePasswordRequest {
                    old_password: "salah123".to_string(),
                    new_password: "baru12345".to_string(),
                },
            )
            .await;
        assert!(matches!(wrong, Err(ApiError::Unauthorized(_))));

        auth.change_password(
            &user.id,
            &ChangePasswordRequest {
                old_password: "rahasia".to_string(),
                new_password: "baru12345".to_string(),
            },
        )
        .await
        .unwrap();

        assert!(auth.login(&login_request("kasir@kasir.com", "rahasia")).await.is_err());
        assert!(auth.login(&login_request("kasir@kasir.com", "baru12345")).await.is_ok());
    }

    #[tokio::test]
    async fn test_bootstrap_admin_runs_once() {
        let auth = service().await;
        let config = ApiConfig::from_lookup(|_| None).unwrap();

        let admin = auth.bootstrap_admin(&config).await.unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.email, "admin@kasir.com");

        assert!(auth.bootstrap_admin(&config).await.unwrap().is_none());
        assert_eq!(auth.db.users().count().await.unwrap(), 1);
    }
}
