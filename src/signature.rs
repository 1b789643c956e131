use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

/// Hex length of a SHA-256 MAC as Razorpay sends it
const SIGNATURE_HEX_LEN: usize = 64;

/// Checks Razorpay signatures for checkout callbacks and webhooks
#[derive(Clone)]
pub struct SignatureVerifier {
    key_secret: String,
    webhook_secret: String,
}

impl SignatureVerifier {
    pub fn new(key_secret: &str, webhook_secret: &str) -> Self {
        Self {
            key_secret: key_secret.to_string(),
            webhook_secret: webhook_secret.to_string(),
        }
    }

    /// Checkout callback: HMAC-SHA256 over `order_id|payment_id` with the API key secret
    pub fn verify_payment(&self, order_id: &str, payment_id: &str, signature: &str) -> AppResult<()> {
        let mut mac = new_mac(&self.key_secret)?;
        mac.update(order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());
        check(mac, signature)
    }

    /// Webhook: HMAC-SHA256 over the raw request body with the webhook secret
    pub fn verify_webhook(&self, body: &[u8], signature: &str) -> AppResult<()> {
        let mut mac = new_mac(&self.webhook_secret)?;
        mac.update(body);
        check(mac, signature)
    }
}

fn new_mac(secret: &str) -> AppResult<HmacSha256> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::InternalError(format!("invalid signing key: {}", e)))
}

/// Exact lowercase hex of the full MAC length
fn is_canonical_hex(signature: &str) -> bool {
    signature.len() == SIGNATURE_HEX_LEN
        && signature
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

fn check(mac: HmacSha256, signature: &str) -> AppResult<()> {
    if !is_canonical_hex(signature) {
        return Err(AppError::InvalidSignature);
    }
    let expected = hex::decode(signature).map_err(|_| AppError::InvalidSignature)?;
    // verify_slice compares in constant time
    mac.verify_slice(&expected)
        .map_err(|_| AppError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, message: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(message);
        hex::encode(mac.finalize().into_bytes())
    }

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new("key_secret", "whsec_secret")
    }

    #[test]
    fn valid_payment_signature_is_accepted() {
        let signature = sign("key_secret", b"order_9|pay_1");
        assert!(verifier()
            .verify_payment("order_9", "pay_1", &signature)
            .is_ok());
    }

    #[test]
    fn any_single_byte_mutation_is_rejected() {
        let signature = sign("key_secret", b"order_9|pay_1");

        for i in 0..signature.len() {
            for replacement in 0u8..=255 {
                let mut bytes = signature.clone().into_bytes();
                if bytes[i] == replacement {
                    continue;
                }
                bytes[i] = replacement;
                let mutated = String::from_utf8_lossy(&bytes).into_owned();

                let result = verifier().verify_payment("order_9", "pay_1", &mutated);
                assert!(
                    matches!(result, Err(AppError::InvalidSignature)),
                    "mutation at {i} to {replacement:#04x} accepted"
                );
            }
        }
    }

    #[test]
    fn uppercase_and_padded_signatures_are_rejected() {
        let signature = sign("key_secret", b"order_9|pay_1");
        let position = signature
            .find(|c: char| c.is_ascii_alphabetic())
            .expect("hmac hex has a letter");

        let mut flipped = signature.clone();
        flipped.replace_range(
            position..position + 1,
            &signature[position..position + 1].to_ascii_uppercase(),
        );

        for candidate in [
            flipped,
            signature.to_ascii_uppercase(),
            format!(" {}", signature),
            format!("{} ", signature),
            format!("{}\n", signature),
        ] {
            assert!(matches!(
                verifier().verify_payment("order_9", "pay_1", &candidate),
                Err(AppError::InvalidSignature)
            ));
        }

        let body = br#"{"event":"payment.captured"}"#;
        let webhook_signature = sign("whsec_secret", body);
        assert!(verifier().verify_webhook(body, &webhook_signature).is_ok());
        assert!(matches!(
            verifier().verify_webhook(body, &webhook_signature.to_ascii_uppercase()),
            Err(AppError::InvalidSignature)
        ));
    }

    #[test]
    fn signature_is_bound_to_the_order() {
        let signature = sign("key_secret", b"order_1|pay_1");
        assert!(matches!(
            verifier().verify_payment("order_9", "pay_1", &signature),
            Err(AppError::InvalidSignature)
        ));
    }

    #[test]
    fn non_hex_and_empty_signatures_are_rejected() {
        assert!(matches!(
            verifier().verify_payment("order_9", "pay_1", "not-hex"),
            Err(AppError::InvalidSignature)
        ));
        assert!(matches!(
            verifier().verify_payment("order_9", "pay_1", ""),
            Err(AppError::InvalidSignature)
        ));
    }

    #[test]
    fn webhook_signature_covers_exact_bytes() {
        let body = br#"{"event":"payment.captured"}"#;
        let signature = sign("whsec_secret", body);

        assert!(verifier().verify_webhook(body, &signature).is_ok());

        let reformatted = br#"{"event": "payment.captured"}"#;
        assert!(matches!(
            verifier().verify_webhook(reformatted, &signature),
            Err(AppError::InvalidSignature)
        ));
    }

    #[test]
    fn webhook_secret_is_distinct_from_key_secret() {
        let body = br#"{"event":"payment.captured"}"#;
        let signature = sign("key_secret", body);
        assert!(matches!(
            verifier().verify_webhook(body, &signature),
            Err(AppError::InvalidSignature)
        ));
    }
}
