// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook authentication.
//!
//! Meta signs each delivery with HMAC-SHA256 over the exact raw body
//! bytes, sent as `X-Hub-Signature-256: sha256=<hex>`. Verification must
//! run on the bytes as received; any re-serialization breaks the MAC.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Verify the `X-Hub-Signature-256` header against the raw body.
pub fn verify_signature(body: &[u8], signature_header: &str, app_secret: &str) -> bool {
    let Some(expected) = signature_header.strip_prefix("sha256=") else {
        warn!("invalid signature header format (missing sha256= prefix)");
        return false;
    };

    let mut mac = match HmacSha256::new_from_slice(app_secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            warn!("failed to create HMAC");
            return false;
        }
    };

    mac.update(body);
    let computed = hex::encode(mac.finalize().into_bytes());

    // Constant-time comparison to prevent timing attacks.
    constant_time_eq(&computed, expected)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Webhook subscription handshake (`GET /webhook`).
///
/// Returns `Some(challenge)` iff `hub.mode` is `subscribe` and the token
/// matches the configured verify token.
pub fn verify_webhook_subscription(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&str>,
    verify_token: &str,
) -> Option<String> {
    let mode = mode?;
    let token = token?;
    let challenge = challenge?;

    if mode == "subscribe" && token == verify_token {
        Some(challenge.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test helper: compute a valid signature header for a body.
    pub(crate) fn sign(body: &[u8], secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn accepts_valid_signature() {
        let body = br#"{"entry":[]}"#;
        let header = sign(body, "app_secret");
        assert!(verify_signature(body, &header, "app_secret"));
    }

    #[test]
    fn rejects_wrong_secret() {
        let body = br#"{"entry":[]}"#;
        let header = sign(body, "app_secret");
        assert!(!verify_signature(body, &header, "other_secret"));
    }

    #[test]
    fn rejects_tampered_body() {
        let header = sign(br#"{"entry":[]}"#, "app_secret");
        assert!(!verify_signature(br#"{"entry":[1]}"#, &header, "app_secret"));
    }

    #[test]
    fn rejects_missing_prefix() {
        assert!(!verify_signature(b"body", "deadbeef", "app_secret"));
    }

    #[test]
    fn subscription_echoes_challenge_on_match() {
        let result = verify_webhook_subscription(
            Some("subscribe"),
            Some("my_token"),
            Some("challenge_123"),
            "my_token",
        );
        assert_eq!(result, Some("challenge_123".to_string()));
    }

    #[test]
    fn subscription_rejects_wrong_token_or_mode() {
        assert_eq!(
            verify_webhook_subscription(
                Some("subscribe"),
                Some("wrong"),
                Some("c"),
                "my_token"
            ),
            None
        );
        assert_eq!(
            verify_webhook_subscription(
                Some("unsubscribe"),
                Some("my_token"),
                Some("c"),
                "my_token"
            ),
            None
        );
        assert_eq!(
            verify_webhook_subscription(None, Some("my_token"), Some("c"), "my_token"),
            None
        );
    }

    #[test]
    fn constant_time_eq_basics() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
    }
}
