use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tracing::error;

/// Minimum accepted plaintext length at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

lazy_static! {
    /// Stand-in hash checked when no account matches, hashed with the same
    /// parameters as real ones.
    static ref DUMMY_HASH: String = hash_password("gigstm-no-such-account").unwrap();
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Verifies against `hash`, or against [`DUMMY_HASH`] when there is no
/// account, so an unknown email costs one Argon2 run like a wrong password.
pub fn verify_password_or_dummy(plain: &str, hash: Option<&str>) -> anyhow::Result<bool> {
    match hash {
        Some(hash) => verify_password(plain, hash),
        None => {
            verify_password(plain, &DUMMY_HASH)?;
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let password = "secret1";
        let hash = hash_password(password).expect("hashing should succeed");
        assert_ne!(hash, password);
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("secret1").unwrap();
        let b = hash_password("secret1").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash_password("correct-horse-battery-staple").expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn missing_account_runs_a_full_verification() {
        let dummy = PasswordHash::new(&DUMMY_HASH).expect("dummy hash parses");
        let real_hash = hash_password("secret1").unwrap();
        let real = PasswordHash::new(&real_hash).unwrap();
        assert_eq!(dummy.algorithm, real.algorithm);
        assert_eq!(dummy.version, real.version);
        assert_eq!(dummy.params, real.params);

        assert!(!verify_password_or_dummy("gigstm-no-such-account", None).unwrap());
        assert!(verify_password_or_dummy("secret1", Some(&real_hash)).unwrap());
        assert!(!verify_password_or_dummy("secret2", Some(&real_hash)).unwrap());
    }
}
