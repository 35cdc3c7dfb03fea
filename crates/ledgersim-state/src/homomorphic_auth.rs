use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// A keyed commitment binding a payload to the authenticator's key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomomorphicCommitment {
    pub value: String,
    pub commitment: String,
}

/// Keyed MAC authenticator with a structural combine operation.
///
/// "Homomorphic" holds only in the structural sense: combining is
/// associative and deterministic over string concatenation. No algebraic
/// property beyond concatenation may be relied upon.
pub struct HomomorphicAuthenticator {
    key: Vec<u8>,
}

impl HomomorphicAuthenticator {
    pub fn new(key: &str) -> Self {
        HomomorphicAuthenticator {
            key: key.as_bytes().to_vec(),
        }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.key).expect("HMAC accepts keys of any length")
    }

    /// HMAC-SHA256 over `data`, hex-encoded.
    pub fn authenticate(&self, data: &str) -> String {
        let mut mac = self.mac();
        mac.update(data.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Recompute the MAC for `data` and compare in constant time.
    pub fn verify(&self, data: &str, commitment: &str) -> bool {
        let raw = match hex::decode(commitment) {
            Ok(raw) => raw,
            Err(_) => return false,
        };
        let mut mac = self.mac();
        mac.update(data.as_bytes());
        mac.verify_slice(&raw).is_ok()
    }

    /// Combine member commitments: the payload is the concatenation of
    /// member payloads, the MAC is the HMAC over the concatenation of
    /// member MACs.
    pub fn combine_commitments(
        &self,
        commitments: &[HomomorphicCommitment],
    ) -> HomomorphicCommitment {
        let mut combined_value = String::new();
        let mut combined_macs = String::new();
        for c in commitments {
            combined_value.push_str(&c.value);
            combined_macs.push_str(&c.commitment);
        }

        HomomorphicCommitment {
            value: combined_value,
            commitment: self.authenticate(&combined_macs),
        }
    }

    /// Authenticate a payload and package it as a commitment.
    pub fn commit(&self, value: &str) -> HomomorphicCommitment {
        HomomorphicCommitment {
            value: value.to_string(),
            commitment: self.authenticate(value),
        }
    }
}
