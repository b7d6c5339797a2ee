use chrono::{DateTime, Duration, FixedOffset, Utc};
use rand::Rng;

/// Number of digits in a one-time password.
pub const OTP_DIGITS: usize = 6;

/// Wrong guesses allowed before the challenge is discarded.
pub const MAX_FAILED_ATTEMPTS: i32 = 5;

/// A freshly issued OTP challenge. Code and expiry are always stored together.
#[derive(Debug, Clone)]
pub struct OtpChallenge {
    pub code: String,
    pub expires_at: DateTime<FixedOffset>,
}

/// Generate a zero-padded numeric code valid for `ttl_secs` from `now`.
#[must_use]
pub fn issue(now: DateTime<Utc>, ttl_secs: u64) -> OtpChallenge {
    let code = format!(
        "{:0width$}",
        rand::thread_rng().gen_range(0..1_000_000_u32),
        width = OTP_DIGITS
    );

    // An unrepresentable TTL yields an already-expired challenge
    let expires_at = i64::try_from(ttl_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(now);

    OtpChallenge {
        code,
        expires_at: expires_at.fixed_offset(),
    }
}

/// Outcome of checking a submitted code against a stored challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    Valid,
    Mismatch,
    Expired,
    /// No complete challenge is stored.
    Missing,
}

/// Compare a submitted code with the stored challenge at `now`.
#[must_use]
pub fn check(
    stored: Option<(&str, DateTime<FixedOffset>)>,
    submitted: &str,
    now: DateTime<Utc>,
) -> OtpCheck {
    let Some((code, expires_at)) = stored else {
        return OtpCheck::Missing;
    };

    if expires_at <= now.fixed_offset() {
        return OtpCheck::Expired;
    }

    if constant_time_eq(code.as_bytes(), submitted.trim().as_bytes()) {
        OtpCheck::Valid
    } else {
        OtpCheck::Mismatch
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0_u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
