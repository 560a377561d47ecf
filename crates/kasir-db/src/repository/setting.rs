//! # Setting Repository
//!
//! Key/value store settings. Defaults are inserted by migration; updates are
//! upserts, so unknown keys may be added by an admin.

use std::collections::BTreeMap;

use chrono::Utc;
use kasir_core::{Setting, StoreInfo, ValidationError};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

/// Keys shown on receipts and the store profile.
pub const STORE_KEYS: [&str; 6] = [
    "store_name",
    "store_address",
    "store_phone",
    "tax_rate",
    "currency",
    "receipt_footer",
];

/// Keys toggling each payment method at the till.
pub const PAYMENT_KEYS: [&str; 3] = [
    "payment_cash_enabled",
    "payment_card_enabled",
    "payment_qris_enabled",
];

#[derive(Debug, Clone)]
pub struct SettingRepository {
    pool: SqlitePool,
}

impl SettingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<Setting>> {
        let settings = sqlx::query_as::<_, Setting>("SELECT key, value, updated_at FROM settings ORDER BY key")
            .fetch_all(&self.pool)
            .await?;

        Ok(settings)
    }

    /// Gets one setting; `NotFound` when the key was never set.
    pub async fn get(&self, key: &str) -> DbResult<Setting> {
        sqlx::query_as::<_, Setting>("SELECT key, value, updated_at FROM settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Setting", key))
    }

    /// Values for the given keys. Missing keys are left out.
    pub async fn values(&self, keys: &[&str]) -> DbResult<BTreeMap<String, String>> {
        let mut values = BTreeMap::new();
        for key in keys {
            let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
                .bind(*key)
                .fetch_optional(&self.pool)
                .await?;
            if let Some(value) = value {
                values.insert((*key).to_string(), value);
            }
        }
        Ok(values)
    }

    /// The receipt header view. Missing keys come back empty.
    pub async fn store_info(&self) -> DbResult<StoreInfo> {
        let mut values = self.values(&STORE_KEYS).await?;
        let mut take = |key: &str| values.remove(key).unwrap_or_default();

        Ok(StoreInfo {
            store_name: take("store_name"),
            store_address: take("store_address"),
            store_phone: take("store_phone"),
            tax_rate: take("tax_rate"),
            currency: take("currency"),
            receipt_footer: take("receipt_footer"),
        })
    }

    pub async fn payment_settings(&self) -> DbResult<BTreeMap<String, String>> {
        self.values(&PAYMENT_KEYS).await
    }

    /// Sets one value, creating the key if needed.
    pub async fn upsert(&self, key: &str, value: &str) -> DbResult<Setting> {
        let mut conn = self.pool.acquire().await?;
        let setting = upsert_on(&mut conn, key, value).await?;

        info!(key = %setting.key, "Setting updated");
        Ok(setting)
    }

    /// Sets several values atomically: either all are written or none.
    pub async fn upsert_many(&self, entries: &[(String, String)]) -> DbResult<Vec<Setting>> {
        if entries.is_empty() {
            return Err(ValidationError::required("settings").into());
        }

        let mut tx = self.pool.begin().await?;
        let mut saved = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            saved.push(upsert_on(&mut tx, key, value).await?);
        }
        tx.commit().await?;

        info!(count = saved.len(), "Settings updated");
        Ok(saved)
    }
}

async fn upsert_on(conn: &mut SqliteConnection, key: &str, value: &str) -> DbResult<Setting> {
    let key = key.trim();
    if key.is_empty() {
        return Err(ValidationError::required("key").into());
    }

    debug!(key = %key, "Upserting setting");

    let setting = sqlx::query_as::<_, Setting>(
        r#"
        INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
        ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        RETURNING key, value, updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    Ok(setting)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture_db;

    #[tokio::test]
    async fn test_defaults_present() {
        let db = fixture_db().await;
        let settings = db.settings().list().await.unwrap();
        assert_eq!(settings.len(), 17);

        let store = db.settings().store_info().await.unwrap();
        assert_eq!(store.store_name, "Kasir POS");
        assert_eq!(store.currency, "IDR");
        assert_eq!(store.receipt_footer, "Terima kasih atas kunjungan Anda!");

        let payment = db.settings().payment_settings().await.unwrap();
        assert_eq!(payment.len(), 3);
        assert_eq!(payment["payment_qris_enabled"], "true");
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let db = fixture_db().await;
        let err = db.settings().get("no_such_key").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_upsert_updates_and_creates() {
        let db = fixture_db().await;

        let s = db.settings().upsert("store_name", "Warung Kopi").await.unwrap();
        assert_eq!(s.value, "Warung Kopi");
        assert_eq!(db.settings().get("store_name").await.unwrap().value, "Warung Kopi");

        db.settings().upsert("store_email", "halo@warung.id").await.unwrap();
        assert_eq!(db.settings().list().await.unwrap().len(), 18);

        assert!(db.settings().upsert("  ", "x").await.is_err());
    }

    #[tokio::test]
    async fn test_batch_is_atomic() {
        let db = fixture_db().await;

        let entries = vec![
            ("auto_print".to_string(), "false".to_string()),
            ("".to_string(), "oops".to_string()),
        ];
        assert!(db.settings().upsert_many(&entries).await.is_err());
        assert_eq!(db.settings().get("auto_print").await.unwrap().value, "true");

        let entries = vec![
            ("auto_print".to_string(), "false".to_string()),
            ("auto_logout".to_string(), "15".to_string()),
        ];
        let saved = db.settings().upsert_many(&entries).await.unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(db.settings().get("auto_logout").await.unwrap().value, "15");
    }
}
