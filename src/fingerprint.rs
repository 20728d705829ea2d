// src/fingerprint.rs
//! Content fingerprints used for change detection.
//!
//! A fingerprint is the first `FINGERPRINT_BYTES` of `sha256(content || salt)`,
//! hex encoded. The salt is normally a coarse time window (`day_salt`,
//! `hour_salt`), so unchanged content re-fetched inside one window maps to the
//! same fingerprint, while static content still produces a new fingerprint once
//! the window rolls over. That rollover is a known false "change" signal and is
//! accepted as such.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// 6 bytes -> 12 hex chars.
pub const FINGERPRINT_BYTES: usize = 6;

pub fn fingerprint(content: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hasher.update(salt.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(FINGERPRINT_BYTES * 2);
    for b in digest.iter().take(FINGERPRINT_BYTES) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Calendar-day window, e.g. `2025-09-06`.
pub fn day_salt(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// Hour window, e.g. `2025-09-06-09`.
pub fn hour_salt(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d-%H").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fixed_width_lower_hex() {
        let fp = fingerprint("hello", "2025-09-06");
        assert_eq!(fp.len(), FINGERPRINT_BYTES * 2);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        assert_eq!(fingerprint("post", "s"), fingerprint("post", "s"));
        assert_ne!(fingerprint("post", "s"), fingerprint("other post", "s"));
    }

    #[test]
    fn same_hour_same_fingerprint() {
        let t0 = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 5).unwrap();
        let t1 = Utc.with_ymd_and_hms(2025, 9, 6, 9, 59, 59).unwrap();
        assert_eq!(
            fingerprint("static page", &hour_salt(t0)),
            fingerprint("static page", &hour_salt(t1))
        );
    }

    // Accepted false positive: nothing changed on the page, the salt did.
    #[test]
    fn static_content_rotates_when_window_rolls_over() {
        let t0 = Utc.with_ymd_and_hms(2025, 9, 6, 9, 59, 59).unwrap();
        let t1 = Utc.with_ymd_and_hms(2025, 9, 6, 10, 0, 0).unwrap();
        assert_ne!(
            fingerprint("static page", &hour_salt(t0)),
            fingerprint("static page", &hour_salt(t1))
        );

        let d0 = Utc.with_ymd_and_hms(2025, 9, 6, 23, 0, 0).unwrap();
        let d1 = Utc.with_ymd_and_hms(2025, 9, 7, 1, 0, 0).unwrap();
        assert_eq!(day_salt(d0), "2025-09-06");
        assert_ne!(
            fingerprint("static post", &day_salt(d0)),
            fingerprint("static post", &day_salt(d1))
        );
    }
}
