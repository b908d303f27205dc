use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

pub const OTP_LENGTH: usize = 6;

pub struct OtpService;

impl OtpService {
    /// A random six-digit code, zero padded.
    pub fn generate() -> String {
        let code: u32 = rand::thread_rng().gen_range(0..1_000_000);
        format!("{:06}", code)
    }

    /// Only the hash is stored.
    pub fn hash(code: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(code.trim().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn expiry(now: DateTime<Utc>, ttl_minutes: i64) -> DateTime<Utc> {
        now + Duration::minutes(ttl_minutes)
    }

    pub fn verify(
        code: &str,
        stored_hash: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        let (Some(stored_hash), Some(expires_at)) = (stored_hash, expires_at) else {
            return false;
        };
        let code = code.trim();
        if code.len() != OTP_LENGTH || !code.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
        now <= expires_at && Self::hash(code) == stored_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_are_six_digits() {
        for _ in 0..50 {
            let code = OtpService::generate();
            assert_eq!(code.len(), OTP_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_otp_hashing() {
        let hash1 = OtpService::hash("123456");
        let hash2 = OtpService::hash("123456");
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
        assert_ne!(hash1, OtpService::hash("123457"));
    }

    #[test]
    fn test_verify_checks_code_and_expiry() {
        let now = Utc::now();
        let hash = OtpService::hash("042042");
        let expires = OtpService::expiry(now, 10);

        assert!(OtpService::verify("042042", Some(&hash), Some(expires), now));
        assert!(OtpService::verify(" 042042 ", Some(&hash), Some(expires), now));
        assert!(!OtpService::verify("042043", Some(&hash), Some(expires), now));
        assert!(!OtpService::verify("042042", Some(&hash), Some(expires), now + Duration::minutes(11)));
        assert!(!OtpService::verify("042042", None, Some(expires), now));
        assert!(!OtpService::verify("42042", Some(&hash), Some(expires), now));
    }
}
