//! HMAC-SHA256 webhook signature checks for Chapa and Stripe.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::PaymentError;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a Stripe signature timestamp, in seconds.
pub const STRIPE_TOLERANCE_SECS: u64 = 300;

fn mac(secret: &str) -> Result<HmacSha256, PaymentError> {
    // HMAC accepts keys of any length
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| PaymentError::InvalidSignature)
}

/// Hex-encoded HMAC-SHA256 of `payload`, as a provider would send it.
#[cfg(test)]
pub fn sign_hex(secret: &str, payload: &[u8]) -> Result<String, PaymentError> {
    let mut mac = mac(secret)?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a hex signature over `payload`.
fn verify_hex(secret: &str, payload: &[u8], signature_hex: &str) -> Result<(), PaymentError> {
    let expected = hex::decode(signature_hex.trim()).map_err(|_| PaymentError::InvalidSignature)?;
    let mut mac = mac(secret)?;
    mac.update(payload);
    mac.verify_slice(&expected)
        .map_err(|_| PaymentError::InvalidSignature)
}

/// Verify Chapa's `x-chapa-signature` header: hex HMAC-SHA256 of the raw body.
pub fn verify_chapa(secret: &str, body: &[u8], signature: &str) -> Result<(), PaymentError> {
    verify_hex(secret, body, signature)
}

/// Verify a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=<hex>...]`).
///
/// The signed payload is `"{t}.{body}"`. Any matching `v1` entry is accepted as
/// long as `t` is within [`STRIPE_TOLERANCE_SECS`] of `now_unix`.
pub fn verify_stripe(
    secret: &str,
    body: &[u8],
    header: &str,
    now_unix: i64,
) -> Result<(), PaymentError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(PaymentError::InvalidSignature)?;
    if now_unix.abs_diff(timestamp) > STRIPE_TOLERANCE_SECS {
        return Err(PaymentError::InvalidSignature);
    }

    let mut signed = format!("{timestamp}.").into_bytes();
    signed.extend_from_slice(body);

    if signatures
        .iter()
        .any(|signature| verify_hex(secret, &signed, signature).is_ok())
    {
        Ok(())
    } else {
        Err(PaymentError::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"event":"charge.success","tx_ref":"alga-1"}"#;

    #[test]
    fn chapa_signature_round_trips() {
        let signature = sign_hex("whsec", BODY).unwrap();
        assert!(verify_chapa("whsec", BODY, &signature).is_ok());
    }

    #[test]
    fn chapa_rejects_tampered_body_and_garbage() {
        let signature = sign_hex("whsec", BODY).unwrap();
        assert!(verify_chapa("whsec", b"{}", &signature).is_err());
        assert!(verify_chapa("other", BODY, &signature).is_err());
        assert!(verify_chapa("whsec", BODY, "not-hex").is_err());
    }

    #[test]
    fn stripe_accepts_any_matching_v1() {
        let now = 1_700_000_000;
        let mut signed = format!("{now}.").into_bytes();
        signed.extend_from_slice(BODY);
        let good = sign_hex("whsec_stripe", &signed).unwrap();
        let header = format!("t={now},v1=deadbeef,v1={good}");

        assert!(verify_stripe("whsec_stripe", BODY, &header, now + 10).is_ok());
    }

    #[test]
    fn stripe_rejects_stale_timestamp() {
        let then = 1_700_000_000;
        let mut signed = format!("{then}.").into_bytes();
        signed.extend_from_slice(BODY);
        let good = sign_hex("whsec_stripe", &signed).unwrap();
        let header = format!("t={then},v1={good}");

        assert!(verify_stripe("whsec_stripe", BODY, &header, then + STRIPE_TOLERANCE_SECS as i64 + 1).is_err());
    }

    #[test]
    fn stripe_rejects_extreme_timestamps() {
        let now = 1_700_000_000;
        for header in [
            "t=-9223372036854775808,v1=00",
            "t=9223372036854775807,v1=00",
        ] {
            assert!(matches!(
                verify_stripe("s", BODY, header, now),
                Err(PaymentError::InvalidSignature)
            ));
        }
        assert!(verify_stripe("s", BODY, "t=0,v1=00", i64::MIN).is_err());
    }

    #[test]
    fn stripe_rejects_missing_parts() {
        assert!(verify_stripe("s", BODY, "v1=abcd", 0).is_err());
        assert!(verify_stripe("s", BODY, "t=0", 0).is_err());
        assert!(verify_stripe("s", BODY, "", 0).is_err());
    }
}
