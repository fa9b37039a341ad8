//! Timestamped request signatures.
//!
//! A client signs a request by hashing
//! `"{prefix}.{timestamp}:{path}:{secret}.{suffix}"` with SHA-256 and sending
//! the lowercase hex digest in the `Hash` header next to the unix `Timestamp`
//! it used. `path` is the request path with any leading `/api/` (or bare
//! leading `/`) removed, so `/users` and `/api/users` both sign as `users`.
//!
//! A signature is accepted only while `|now - timestamp|` is within the
//! window and only on an exact constant-time match.

use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::clock::Clock;
use crate::config::SecurityConfig;

pub const TIMESTAMP_HEADER: &str = "Timestamp";
pub const HASH_HEADER: &str = "Hash";

/// Why a signature was refused. Never shown to clients.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing Timestamp or Hash header")]
    MissingHeaders,
    #[error("timestamp is not a unix second count")]
    InvalidTimestamp,
    #[error("timestamp is {skew}s away from server time")]
    Stale { skew: i64 },
    #[error("signature mismatch")]
    Mismatch,
}

#[derive(Clone)]
pub struct RequestSigner {
    secret: String,
    prefix: String,
    suffix: String,
    window_secs: i64,
    skip_paths: Vec<String>,
    clock: Arc<dyn Clock>,
}

impl RequestSigner {
    pub fn new(config: &SecurityConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            secret: config.app_secret.clone(),
            prefix: config.signature_prefix.clone(),
            suffix: config.signature_suffix.clone(),
            window_secs: config.signature_window_secs,
            skip_paths: config.signature_skip_paths.clone(),
            clock,
        }
    }

    /// Paths that bypass signing entirely (exact match)
    pub fn is_exempt(&self, path: &str) -> bool {
        self.skip_paths.iter().any(|p| p == path)
    }

    pub fn sign(&self, timestamp: i64, path: &str) -> String {
        self.digest(&timestamp.to_string(), path)
    }

    /// `(Timestamp, Hash)` header values for signing `path` right now
    pub fn headers_for(&self, path: &str) -> (String, String) {
        let timestamp = self.clock.now().timestamp();
        (timestamp.to_string(), self.sign(timestamp, path))
    }

    pub fn verify(
        &self,
        timestamp: Option<&str>,
        hash: Option<&str>,
        path: &str,
    ) -> Result<(), SignatureError> {
        let (timestamp, hash) = match (timestamp, hash) {
            (Some(t), Some(h)) if !t.is_empty() && !h.is_empty() => (t, h),
            _ => return Err(SignatureError::MissingHeaders),
        };

        let ts: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| SignatureError::InvalidTimestamp)?;
        let skew = self.clock.now().timestamp().saturating_sub(ts);
        if skew.saturating_abs() > self.window_secs {
            return Err(SignatureError::Stale { skew });
        }

        // The digest covers the header text exactly as sent
        let expected = self.digest(timestamp, path);
        if bool::from(expected.as_bytes().ct_eq(hash.as_bytes())) {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }

    fn digest(&self, timestamp: &str, path: &str) -> String {
        let payload = format!(
            "{}.{}:{}:{}.{}",
            self.prefix,
            timestamp,
            canonical_path(path),
            self.secret,
            self.suffix
        );
        hex::encode(Sha256::digest(payload.as_bytes()))
    }
}

pub fn canonical_path(path: &str) -> &str {
    path.strip_prefix("/api/")
        .or_else(|| path.strip_prefix('/'))
        .unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Duration, TimeZone, Utc};

    fn signer() -> (RequestSigner, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()));
        let config = SecurityConfig {
            app_secret: "S".into(),
            ..SecurityConfig::default()
        };
        (RequestSigner::new(&config, clock.clone()), clock)
    }

    #[test]
    fn digest_matches_the_documented_payload() {
        let (signer, clock) = signer();
        let t = clock.now().timestamp();
        let expected = hex::encode(Sha256::digest(format!("Starter.{t}:users:S.Kit").as_bytes()));
        assert_eq!(signer.sign(t, "/users"), expected);
        assert_eq!(signer.sign(t, "/api/users"), expected);
    }

    #[test]
    fn fresh_signature_verifies() {
        let (signer, _) = signer();
        let (ts, hash) = signer.headers_for("/users");
        assert_eq!(signer.verify(Some(&ts), Some(&hash), "/users"), Ok(()));
    }

    #[test]
    fn signature_expires_after_the_window() {
        let (signer, clock) = signer();
        let (ts, hash) = signer.headers_for("/users");

        clock.advance(Duration::seconds(60));
        assert_eq!(signer.verify(Some(&ts), Some(&hash), "/users"), Ok(()));

        clock.advance(Duration::seconds(1));
        assert_eq!(
            signer.verify(Some(&ts), Some(&hash), "/users"),
            Err(SignatureError::Stale { skew: 61 })
        );
    }

    #[test]
    fn future_timestamps_are_bounded_too() {
        let (signer, clock) = signer();
        let future = clock.now().timestamp() + 61;
        let hash = signer.sign(future, "/users");
        assert!(matches!(
            signer.verify(Some(&future.to_string()), Some(&hash), "/users"),
            Err(SignatureError::Stale { .. })
        ));
    }

    #[test]
    fn any_flipped_bit_is_a_mismatch() {
        let (signer, _) = signer();
        let (ts, hash) = signer.headers_for("/users");

        for i in 0..hash.len() {
            for bit in 0..8 {
                let mut bytes = hash.clone().into_bytes();
                bytes[i] ^= 1 << bit;
                let flipped = String::from_utf8_lossy(&bytes).into_owned();
                assert!(signer.verify(Some(&ts), Some(&flipped), "/users").is_err());
            }
        }
    }

    #[test]
    fn other_path_or_missing_headers_fail() {
        let (signer, _) = signer();
        let (ts, hash) = signer.headers_for("/users");
        assert_eq!(signer.verify(Some(&ts), Some(&hash), "/orders"), Err(SignatureError::Mismatch));
        assert_eq!(signer.verify(None, Some(&hash), "/users"), Err(SignatureError::MissingHeaders));
        assert_eq!(signer.verify(Some(&ts), Some(""), "/users"), Err(SignatureError::MissingHeaders));
        assert_eq!(
            signer.verify(Some("yesterday"), Some(&hash), "/users"),
            Err(SignatureError::InvalidTimestamp)
        );
    }

    #[test]
    fn skip_list_is_exact() {
        let (signer, _) = signer();
        assert!(signer.is_exempt("/health"));
        assert!(signer.is_exempt("/swagger"));
        assert!(!signer.is_exempt("/health/db"));
    }
}
