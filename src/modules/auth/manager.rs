use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::services::hashing;
use crate::services::session::SessionTokens;

use super::interface::{
    AccountStore, AuthError, Clock, LoginResult, Mailer, OtpSource, RegisterResult, Result,
    Session, StoreError,
};
use super::model::Account;

const VERIFY_OTP_VALIDITY_HOURS: i64 = 24;
const RESET_OTP_VALIDITY_MINUTES: i64 = 15;

/// The account and credential lifecycle state machine. Every operation is a
/// single read-modify-write against one account record; OTP consumption is
/// a conditional write so a code can be spent at most once.
pub struct AccountManager {
    store: Arc<dyn AccountStore>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    otp: Arc<dyn OtpSource>,
    tokens: SessionTokens,
}

impl AccountManager {
    pub fn new(
        store: Arc<dyn AccountStore>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        otp: Arc<dyn OtpSource>,
        tokens: SessionTokens,
    ) -> Self {
        Self {
            store,
            mailer,
            clock,
            otp,
            tokens,
        }
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<RegisterResult> {
        let name = name.trim();
        let email = normalize_email(email);
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput("name, email and password are required"));
        }

        if self.store.find_by_email(&email).await?.is_some() {
            return Err(AuthError::DuplicateAccount);
        }

        let password_hash =
            hashing::hash_password(password).map_err(|e| AuthError::Internal(e.to_string()))?;

        let now = self.clock.now();
        let account = Account {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email,
            password_hash,
            is_verified: false,
            verify_otp: None,
            verify_otp_expires_at: None,
            reset_otp: None,
            reset_otp_expires_at: None,
            created_at: now,
            updated_at: now,
        };

        // The unique index on email is the authority; a racing register
        // between the lookup above and this insert surfaces here.
        if let Err(err) = self.store.insert(&account).await {
            return Err(match err {
                StoreError::Duplicate => AuthError::DuplicateAccount,
                other => other.into(),
            });
        }

        let session = self.issue_session(&account.id, now)?;

        let mail_error = self
            .mailer
            .send(
                &account.email,
                "Welcome to Ray",
                &format!(
                    "Welcome to Ray! Your account has been successfully created with email: {}.",
                    account.email
                ),
            )
            .await
            .err();
        if let Some(err) = &mail_error {
            tracing::warn!(email = %account.email, "welcome mail dispatch failed: {err}");
        }

        Ok(RegisterResult {
            account,
            session,
            mail_error,
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResult> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput("email and password are required"));
        }

        // Unknown email and wrong password collapse into the same error so
        // the response cannot be used to enumerate accounts.
        let Some(account) = self.store.find_by_email(&email).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        let matches = hashing::verify_password(password, &account.password_hash)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }

        let session = self.issue_session(&account.id, self.clock.now())?;

        Ok(LoginResult { account, session })
    }

    /// Sessions are stateless, so there is nothing to revoke server-side;
    /// logout succeeds whether or not a valid credential was presented.
    pub fn logout(&self, token: Option<&str>) {
        if let Some(token) = token {
            if self.tokens.verify(token).is_err() {
                tracing::debug!("logout presented an invalid session token");
            }
        }
    }

    pub fn is_authenticated(&self, token: &str) -> bool {
        self.tokens.verify(token).is_ok()
    }

    pub fn session_account_id(&self, token: &str) -> Option<String> {
        self.tokens.verify(token).ok().map(|claims| claims.sub)
    }

    pub fn session_max_age_secs(&self) -> i64 {
        self.tokens.max_age_secs()
    }

    pub async fn current_account(&self, account_id: &str) -> Result<Account> {
        self.store
            .find_by_id(account_id)
            .await?
            .ok_or(AuthError::AccountNotFound)
    }

    pub async fn request_email_verification(&self, account_id: &str) -> Result<()> {
        let account = self
            .store
            .find_by_id(account_id)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        if account.is_verified {
            return Err(AuthError::AlreadyVerified);
        }

        let otp = self.otp.six_digit_code();
        let expires_at = self.clock.now() + Duration::hours(VERIFY_OTP_VALIDITY_HOURS);

        // Persist before dispatch: a lost mail must never leave a code
        // outstanding that the store does not know about.
        self.store
            .set_verify_otp(&account.id, &otp, expires_at)
            .await?;

        self.mailer
            .send(
                &account.email,
                "Account Verification OTP",
                &format!("Your OTP is {otp}. Verify your account using this OTP."),
            )
            .await?;

        Ok(())
    }

    pub async fn confirm_email_verification(&self, account_id: &str, otp: &str) -> Result<()> {
        if otp.trim().is_empty() {
            return Err(AuthError::InvalidInput("otp is required"));
        }

        let account = self
            .store
            .find_by_id(account_id)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        let (expected, expires_at) = outstanding_otp(
            account.verify_otp.as_deref(),
            account.verify_otp_expires_at,
        )?;
        self.check_otp(expected, expires_at, otp)?;

        // Conditional write: a racing confirmation may have spent the code
        // between the read above and this update.
        if !self.store.consume_verify_otp(&account.id, otp).await? {
            return Err(AuthError::MissingOtp);
        }

        Ok(())
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AuthError::InvalidInput("email is required"));
        }

        let account = self
            .store
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        let otp = self.otp.six_digit_code();
        let expires_at = self.clock.now() + Duration::minutes(RESET_OTP_VALIDITY_MINUTES);

        self.store
            .set_reset_otp(&account.id, &otp, expires_at)
            .await?;

        self.mailer
            .send(
                &account.email,
                "Password Reset OTP",
                &format!(
                    "Your OTP for resetting your password is {otp}. \
                     Use this OTP to proceed with resetting your password."
                ),
            )
            .await?;

        Ok(())
    }

    pub async fn confirm_password_reset(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
    ) -> Result<()> {
        let email = normalize_email(email);
        if email.is_empty() || otp.trim().is_empty() || new_password.is_empty() {
            return Err(AuthError::InvalidInput(
                "email, otp and new password are required",
            ));
        }

        let account = self
            .store
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        let (expected, expires_at) =
            outstanding_otp(account.reset_otp.as_deref(), account.reset_otp_expires_at)?;
        self.check_otp(expected, expires_at, otp)?;

        let new_hash = hashing::hash_password(new_password)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        if !self
            .store
            .consume_reset_otp(&account.id, otp, &new_hash)
            .await?
        {
            return Err(AuthError::MissingOtp);
        }

        Ok(())
    }

    fn issue_session(&self, account_id: &str, now: DateTime<Utc>) -> Result<Session> {
        let token = self
            .tokens
            .issue(account_id, now)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        Ok(Session {
            token,
            expires_in: self.tokens.max_age_secs(),
        })
    }

    fn check_otp(&self, expected: &str, expires_at: DateTime<Utc>, supplied: &str) -> Result<()> {
        if expected != supplied {
            return Err(AuthError::InvalidOtp);
        }
        // Expired strictly after the deadline; a confirm at the exact
        // expiry instant still passes.
        if self.clock.now() > expires_at {
            return Err(AuthError::OtpExpired);
        }
        Ok(())
    }
}

fn outstanding_otp(
    code: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
) -> Result<(&str, DateTime<Utc>)> {
    match (code, expires_at) {
        (Some(code), Some(expires_at)) => Ok((code, expires_at)),
        _ => Err(AuthError::MissingOtp),
    }
}

/// Applied on every lookup and write; a register/login pair differing only
/// in case must resolve to the same record.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
