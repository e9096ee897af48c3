use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::Account;

// =============================================================================
// COLLABORATOR TRAITS
// =============================================================================

pub type Result<T> = std::result::Result<T, AuthError>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persistence seam. One account record per user; the two `consume_*`
/// methods are conditional writes: they take effect only if the stored OTP
/// still equals `otp` at write time, and report whether they did. That
/// compare-and-swap is what makes racing confirmations yield at most one
/// success.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn insert(&self, account: &Account) -> StoreResult<()>;
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Account>>;
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>>;

    /// Overwrites any outstanding verification OTP.
    async fn set_verify_otp(
        &self,
        id: &str,
        otp: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Marks the account verified and clears the OTP pair in one write,
    /// conditional on the stored code still matching.
    async fn consume_verify_otp(&self, id: &str, otp: &str) -> StoreResult<bool>;

    /// Overwrites any outstanding password-reset OTP.
    async fn set_reset_otp(&self, id: &str, otp: &str, expires_at: DateTime<Utc>)
        -> StoreResult<()>;

    /// Replaces the password hash and clears the OTP pair in one write,
    /// conditional on the stored code still matching.
    async fn consume_reset_otp(
        &self,
        id: &str,
        otp: &str,
        new_password_hash: &str,
    ) -> StoreResult<bool>;
}

/// Outbound mail. Fire-and-forget from the manager's perspective; a failure
/// is reported as the non-fatal `MailDispatchFailed` kind.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str)
        -> std::result::Result<(), MailError>;
}

/// Time source for OTP expiry computation and comparison.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Randomness for OTP generation. Implementations must draw from a
/// cryptographically adequate source.
pub trait OtpSource: Send + Sync {
    /// A uniformly distributed code in 100000..=999999, as a string.
    fn six_digit_code(&self) -> String;
}

// =============================================================================
// RESULT TYPES
// =============================================================================

#[derive(Debug)]
pub struct Session {
    pub token: String,
    pub expires_in: i64,
}

#[derive(Debug)]
pub struct RegisterResult {
    pub account: Account,
    pub session: Session,
    /// Welcome-mail failure never rolls back account creation; it is
    /// carried here so callers can report it distinctly.
    pub mail_error: Option<MailError>,
}

#[derive(Debug)]
pub struct LoginResult {
    pub account: Account,
    pub session: Session,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate key")]
    Duplicate,

    #[error("{0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid recipient address: {0}")]
    Address(String),

    #[error("mail transport failed: {0}")]
    Transport(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(&'static str),

    #[error("Email already in use")]
    DuplicateAccount,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Account already verified")]
    AlreadyVerified,

    #[error("No OTP outstanding")]
    MissingOtp,

    #[error("Invalid OTP")]
    InvalidOtp,

    #[error("OTP expired")]
    OtpExpired,

    #[error("Mail dispatch failed: {0}")]
    MailDispatchFailed(#[from] MailError),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable machine-checkable kind, independent of the human-readable
    /// message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::DuplicateAccount => "duplicate_account",
            Self::InvalidCredentials => "invalid_credentials",
            Self::AccountNotFound => "account_not_found",
            Self::AlreadyVerified => "already_verified",
            Self::MissingOtp => "missing_otp",
            Self::InvalidOtp => "invalid_otp",
            Self::OtpExpired => "otp_expired",
            Self::MailDispatchFailed(_) => "mail_dispatch_failed",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::DuplicateAccount => StatusCode::CONFLICT,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::AccountNotFound => StatusCode::NOT_FOUND,
            Self::AlreadyVerified => StatusCode::BAD_REQUEST,
            Self::MissingOtp => StatusCode::BAD_REQUEST,
            Self::InvalidOtp => StatusCode::BAD_REQUEST,
            Self::OtpExpired => StatusCode::BAD_REQUEST,
            Self::MailDispatchFailed(_) => StatusCode::BAD_GATEWAY,
            Self::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
