use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySql, Pool};

use super::interface::{AccountStore, StoreError, StoreResult};
use super::model::Account;

/// MySQL-backed account store. The conditional OTP writes lean on the
/// database's per-row write serialization: `rows_affected == 0` means the
/// code was already spent or overwritten.
pub struct MySqlStore {
    pool: Pool<MySql>,
}

impl MySqlStore {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::Duplicate;
            }
        }
        StoreError::Unavailable(err.to_string())
    }
}

#[async_trait]
impl AccountStore for MySqlStore {
    async fn insert(&self, account: &Account) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts
                (id, name, email, password_hash, is_verified,
                 verify_otp, verify_otp_expires_at, reset_otp, reset_otp_expires_at,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account.id)
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.is_verified)
        .bind(&account.verify_otp)
        .bind(account.verify_otp_expires_at)
        .bind(&account.reset_otp)
        .bind(account.reset_otp_expires_at)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    async fn set_verify_otp(
        &self,
        id: &str,
        otp: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query(
            "UPDATE accounts
             SET verify_otp = ?, verify_otp_expires_at = ?, updated_at = UTC_TIMESTAMP()
             WHERE id = ?",
        )
        .bind(otp)
        .bind(expires_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn consume_verify_otp(&self, id: &str, otp: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE accounts
             SET is_verified = TRUE, verify_otp = NULL, verify_otp_expires_at = NULL,
                 updated_at = UTC_TIMESTAMP()
             WHERE id = ? AND verify_otp = ?",
        )
        .bind(id)
        .bind(otp)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_reset_otp(
        &self,
        id: &str,
        otp: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query(
            "UPDATE accounts
             SET reset_otp = ?, reset_otp_expires_at = ?, updated_at = UTC_TIMESTAMP()
             WHERE id = ?",
        )
        .bind(otp)
        .bind(expires_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn consume_reset_otp(
        &self,
        id: &str,
        otp: &str,
        new_password_hash: &str,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE accounts
             SET password_hash = ?, reset_otp = NULL, reset_otp_expires_at = NULL,
                 updated_at = UTC_TIMESTAMP()
             WHERE id = ? AND reset_otp = ?",
        )
        .bind(new_password_hash)
        .bind(id)
        .bind(otp)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
