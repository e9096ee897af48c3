use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// The single account record. The OTP pairs are `Some` only while a code is
/// outstanding; the operation that validates a code clears both fields in
/// the same write.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub is_verified: bool,
    pub verify_otp: Option<String>,
    pub verify_otp_expires_at: Option<DateTime<Utc>>,
    pub reset_otp: Option<String>,
    pub reset_otp_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
