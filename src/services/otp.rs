use rand::Rng;

use crate::modules::auth::interface::OtpSource;

/// Draws codes from the thread-local CSPRNG (ChaCha-based, reseeded from
/// the OS).
pub struct RandomOtp;

impl OtpSource for RandomOtp {
    fn six_digit_code(&self) -> String {
        let mut rng = rand::rng();
        rng.random_range(100_000..=999_999u32).to_string()
    }
}
