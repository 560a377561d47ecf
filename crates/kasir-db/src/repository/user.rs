//! # User Repository
//!
//! The user directory. Password hashing happens in the API layer; this
//! repository only stores and returns the PHC string.

use chrono::Utc;
use kasir_core::validation::{validate_email, validate_name};
use kasir_core::{CoreError, Role, User};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{unique_or, DbResult};
use crate::new_id;

const SELECT_USER: &str =
    "SELECT id, name, email, password_hash, role, is_active, created_at, updated_at FROM users";

/// A user to insert. `password_hash` must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Profile fields an admin may change.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!("{SELECT_USER} ORDER BY created_at, email"))
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    /// Number of users, used to decide whether to bootstrap an admin.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("{SELECT_USER} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Looks a user up by email, case-insensitively.
    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<User>> {
        debug!(email = %email, "Looking up user by email");

        let user = sqlx::query_as::<_, User>(&format!("{SELECT_USER} WHERE email = ?1"))
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Creates an active user.
    ///
    /// ## Errors
    /// - Validation: short name, malformed email
    /// - `UniqueViolation`: email already registered
    pub async fn create(&self, new: &NewUser) -> DbResult<User> {
        validate_name("name", &new.name)?;
        validate_email(&new.email)?;

        let email = normalize_email(&new.email);
        let now = Utc::now();
        let user = User {
            id: new_id(),
            name: new.name.trim().to_string(),
            email: email.clone(),
            password_hash: new.password_hash.clone(),
            role: new.role,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_or(e, "email", &email))?;

        info!(user_id = %user.id, email = %user.email, role = %user.role, "User created");
        Ok(user)
    }

    pub async fn update(&self, id: &str, update: &UserUpdate) -> DbResult<User> {
        validate_name("name", &update.name)?;
        validate_email(&update.email)?;
        let email = normalize_email(&update.email);

        let result = sqlx::query(
            r#"
            UPDATE users
               SET name = ?2, email = ?3, role = ?4, is_active = ?5, updated_at = ?6
             WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(update.name.trim())
        .bind(&email)
        .bind(update.role)
        .bind(update.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| unique_or(e, "email", &email))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::UserNotFound(id.to_string()).into());
        }

        info!(user_id = %id, role = %update.role, active = update.is_active, "User updated");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::UserNotFound(id.to_string()).into())
    }

    /// Stores a new password hash.
    pub async fn set_password_hash(&self, id: &str, password_hash: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(password_hash)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::UserNotFound(id.to_string()).into());
        }

        info!(user_id = %id, "Password changed");
        Ok(())
    }

    /// Deletes a user with no recorded transactions.
    ///
    /// Users who have rung sales stay in the directory so the ledger keeps
    /// its cashier; deactivate them instead.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let user = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::UserNotFound(id.to_string()))?;

        let transactions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE user_id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        if transactions > 0 {
            return Err(CoreError::UserHasTransactions {
                email: user.email,
                transactions,
            }
            .into());
        }

        sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        info!(user_id = %id, email = %user.email, "User deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
