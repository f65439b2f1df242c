// src/api/signature.rs

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use crate::errors::{BotError, Result};

/// Checks the platform's ed25519 request signatures.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    key: VerifyingKey,
}

impl SignatureVerifier {
    /// Builds a verifier from the hex-encoded application public key.
    pub fn from_hex(public_key: &str) -> Result<Self> {
        let bytes: [u8; 32] = hex::decode(public_key.trim())
            .ok()
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| BotError::Config("DISCORD_PUBLIC_KEY must be 32 hex-encoded bytes".to_string()))?;
        let key = VerifyingKey::from_bytes(&bytes)
            .map_err(|e| BotError::Config(format!("DISCORD_PUBLIC_KEY is not a valid key: {}", e)))?;
        Ok(Self { key })
    }

    /// The signed message is the timestamp header followed by the raw body.
    pub fn verify(&self, timestamp: &str, body: &[u8], signature_hex: &str) -> bool {
        let Some(bytes) = hex::decode(signature_hex)
            .ok()
            .and_then(|b| <[u8; 64]>::try_from(b).ok())
        else {
            return false;
        };
        let signature = Signature::from_bytes(&bytes);

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);
        self.key.verify(&message, &signature).is_ok()
    }
}
