use crate::AuthError;

/// One-way salted password hashing (bcrypt).
///
/// Both operations are CPU-bound; async callers should run them on
/// a blocking thread (see [`crate::SessionIssuer`]).
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash with a fresh random salt; the same input never hashes the same way twice.
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        bcrypt::hash(plaintext, self.cost).map_err(|e| AuthError::Hashing(e.to_string()))
    }

    /// Check a plaintext against a stored hash.
    ///
    /// A wrong password and an unparseable hash are reported identically.
    pub fn verify(&self, hash: &str, plaintext: &str) -> Result<(), AuthError> {
        match bcrypt::verify(plaintext, hash) {
            Ok(true) => Ok(()),
            Ok(false) | Err(_) => Err(AuthError::CredentialMismatch),
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const TEST_COST: u32 = 4;

    #[test]
    fn verify_accepts_own_hash() {
        let hasher = PasswordHasher::new(TEST_COST);
        let hash = hasher.hash("correct horse").unwrap();
        assert!(hasher.verify(&hash, "correct horse").is_ok());
    }

    #[test]
    fn hashing_is_salted() {
        let hasher = PasswordHasher::new(TEST_COST);
        assert_ne!(hasher.hash("pw").unwrap(), hasher.hash("pw").unwrap());
    }

    #[test]
    fn malformed_hash_looks_like_mismatch() {
        let hasher = PasswordHasher::new(TEST_COST);
        let err = hasher.verify("not-a-bcrypt-hash", "pw").unwrap_err();
        assert!(matches!(err, AuthError::CredentialMismatch));
    }

    #[test]
    fn invalid_cost_is_a_hashing_error() {
        let hasher = PasswordHasher::new(99);
        assert!(matches!(hasher.hash("pw"), Err(AuthError::Hashing(_))));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn distinct_passwords_do_not_verify(p1 in "[a-zA-Z0-9]{1,24}", p2 in "[a-zA-Z0-9]{1,24}") {
            prop_assume!(p1 != p2);
            let hasher = PasswordHasher::new(TEST_COST);
            let hash = hasher.hash(&p1).unwrap();
            prop_assert!(hasher.verify(&hash, &p1).is_ok());
            prop_assert!(hasher.verify(&hash, &p2).is_err());
        }
    }
}
