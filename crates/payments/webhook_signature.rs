//! Stripe webhook signatures. https://stripe.com/docs/webhooks/signatures
//!
//! The `Stripe-Signature` header looks like `t=<unix>,v1=<hex>[,v1=<hex>...]`.
//! The signed payload is `"{t}.{raw body}"`, HMAC-SHA256 keyed with the
//! endpoint secret.

use anyhow::{Result, anyhow, bail};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_header(signature_header: &str) -> Result<SignatureHeader> {
    let mut timestamp: Option<i64> = None;
    let mut signatures = Vec::new();

    for part in signature_header.split(',') {
        let part = part.trim();
        if let Some(rest) = part.strip_prefix("t=") {
            timestamp = Some(
                rest.parse()
                    .map_err(|_| anyhow!("invalid timestamp in stripe-signature"))?,
            );
        } else if let Some(rest) = part.strip_prefix("v1=") {
            // Undecodable candidates can never match; skip them rather than fail
            // the whole header while another v1 may still be valid.
            if let Ok(bytes) = hex::decode(rest) {
                signatures.push(bytes);
            }
        }
    }

    let timestamp = timestamp.ok_or_else(|| anyhow!("missing timestamp in stripe-signature"))?;
    if signatures.is_empty() {
        bail!("missing v1 in stripe-signature");
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

/// Checks `signature_header` against `payload`. `now` is a unix timestamp in
/// seconds; events signed more than `tolerance_secs` away from it are refused.
pub fn verify(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<()> {
    let header = parse_header(signature_header)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(header.timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = header
        .signatures
        .iter()
        .any(|candidate| mac.clone().verify_slice(candidate).is_ok());
    if !matched {
        bail!("invalid webhook signature");
    }

    if now.abs_diff(header.timestamp) > tolerance_secs.unsigned_abs() {
        bail!("webhook timestamp outside tolerance");
    }

    Ok(())
}

/// Builds a header value for `payload`. Used by tests and local tooling that
/// replays provider events.
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const PAYLOAD: &[u8] = br#"{"id":"evt_1","type":"customer.subscription.deleted"}"#;
    const NOW: i64 = 1_760_000_000;

    #[test]
    fn accepts_a_fresh_valid_signature() {
        let header = sign(PAYLOAD, SECRET, NOW).unwrap();
        assert!(verify(PAYLOAD, &header, SECRET, NOW + 10, DEFAULT_TOLERANCE_SECS).is_ok());
    }

    #[test]
    fn rejects_a_tampered_payload() {
        let header = sign(PAYLOAD, SECRET, NOW).unwrap();
        let tampered = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;
        assert!(verify(tampered, &header, SECRET, NOW, DEFAULT_TOLERANCE_SECS).is_err());
    }

    #[test]
    fn rejects_the_wrong_secret() {
        let header = sign(PAYLOAD, "whsec_other", NOW).unwrap();
        assert!(verify(PAYLOAD, &header, SECRET, NOW, DEFAULT_TOLERANCE_SECS).is_err());
    }

    #[test]
    fn rejects_stale_events() {
        let header = sign(PAYLOAD, SECRET, NOW).unwrap();
        let later = NOW + DEFAULT_TOLERANCE_SECS + 1;
        assert!(verify(PAYLOAD, &header, SECRET, later, DEFAULT_TOLERANCE_SECS).is_err());
    }

    #[test]
    fn rejects_extreme_timestamps_without_overflow() {
        for timestamp in [i64::MIN, i64::MAX] {
            let header = sign(PAYLOAD, SECRET, timestamp).unwrap();
            assert!(verify(PAYLOAD, &header, SECRET, NOW, DEFAULT_TOLERANCE_SECS).is_err());
        }
    }

    #[test]
    fn accepts_any_matching_v1_candidate() {
        let valid = sign(PAYLOAD, SECRET, NOW).unwrap();
        let v1 = valid.split_once(",v1=").unwrap().1;
        let header = format!("t={NOW},v1={},v1={v1}", "00".repeat(32));
        assert!(verify(PAYLOAD, &header, SECRET, NOW, DEFAULT_TOLERANCE_SECS).is_ok());
    }

    #[test]
    fn rejects_malformed_headers() {
        let missing_v1 = format!("t={NOW}");
        for header in ["", "t=abc,v1=00", "v1=00", missing_v1.as_str(), "garbage"] {
            assert!(
                verify(PAYLOAD, header, SECRET, NOW, DEFAULT_TOLERANCE_SECS).is_err(),
                "{header:?} should be rejected"
            );
        }
    }
}
