use std::collections::HashMap;

use num_bigint::BigUint;
use sha2::{Digest, Sha256};

/// RSA-style accumulator: an exponent-based set commitment with a
/// membership witness per element.
///
/// Parameters are demonstration-sized (N = 251·239, G = 3) and
/// hash_to_prime performs no primality test — it only forces the exponent
/// odd. No adversarial rigor is claimed at this size.
///
/// INVARIANT: for every element e currently in the set,
/// witness(e)^hash_to_prime(e) mod N == state.
pub struct RsaAccumulator {
    modulus: BigUint,
    generator: BigUint,
    state: BigUint,
    elements: Vec<String>,
    witnesses: HashMap<String, BigUint>,
}

impl RsaAccumulator {
    pub fn new() -> Self {
        let p = BigUint::from(251u32);
        let q = BigUint::from(239u32);
        let generator = BigUint::from(3u32);

        RsaAccumulator {
            modulus: p * q,
            state: generator.clone(),
            generator,
            elements: Vec::new(),
            witnesses: HashMap::new(),
        }
    }

    /// Map a string to an odd big integer: SHA-256 interpreted as a big
    /// integer, plus one when even.
    fn hash_to_prime(data: &str) -> BigUint {
        let digest = Sha256::digest(data.as_bytes());
        let mut value = BigUint::from_bytes_be(&digest);
        if !value.bit(0) {
            value += 1u32;
        }
        value
    }

    /// Fold the accumulator state over a new element and maintain every
    /// witness.
    ///
    /// Batched update: existing witnesses absorb the new exponent
    /// (w' ← w'^p(e) mod N); the new element's witness is the generator
    /// raised through all prior exponents.
    pub fn add_element(&mut self, element: &str) {
        let prime = Self::hash_to_prime(element);

        self.state = self.state.modpow(&prime, &self.modulus);

        for witness in self.witnesses.values_mut() {
            *witness = witness.modpow(&prime, &self.modulus);
        }

        let mut witness = self.generator.clone();
        for existing in &self.elements {
            witness = witness.modpow(&Self::hash_to_prime(existing), &self.modulus);
        }

        self.elements.push(element.to_string());
        self.witnesses.insert(element.to_string(), witness);
    }

    /// Check witness^hash_to_prime(element) mod N == state.
    pub fn verify_membership(&self, element: &str, witness: &BigUint) -> bool {
        let prime = Self::hash_to_prime(element);
        witness.modpow(&prime, &self.modulus) == self.state
    }

    /// Stored witness for an element, if it is in the set.
    pub fn witness(&self, element: &str) -> Option<&BigUint> {
        self.witnesses.get(element)
    }

    pub fn state(&self) -> &BigUint {
        &self.state
    }

    pub fn elements(&self) -> &[String] {
        &self.elements
    }
}

impl Default for RsaAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
