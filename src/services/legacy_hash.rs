// src/services/legacy_hash.rs
//
// Hashes escritos por la versión anterior del panel (werkzeug):
//   pbkdf2:sha256:<iteraciones>$<salt>$<hex>
//   scrypt:<n>:<r>:<p>$<salt>$<hex>
// Solo se verifican; al entrar se reemplazan por bcrypt.

use sha2::Sha256;

use crate::common::error::AppError;

// Iteraciones de werkzeug 2.x cuando el método no las trae
const DEFAULT_PBKDF2_ITERATIONS: u32 = 260_000;

#[derive(Debug, Clone, PartialEq)]
pub enum WerkzeugHash {
    Pbkdf2Sha256 { iterations: u32, salt: String, hash: Vec<u8> },
    Scrypt { log_n: u8, r: u32, p: u32, salt: String, hash: Vec<u8> },
}

impl WerkzeugHash {
    /// `None` si el texto no tiene formato werkzeug (p. ej. es bcrypt).
    pub fn parse(stored: &str) -> Option<Self> {
        let mut parts = stored.trim().splitn(3, '$');
        let method = parts.next()?;
        let salt = parts.next()?.to_string();
        let hash = hex::decode(parts.next()?).ok()?;
        if hash.is_empty() {
            return None;
        }

        let params: Vec<&str> = method.split(':').collect();
        match params.as_slice() {
            ["pbkdf2", "sha256"] => Some(Self::Pbkdf2Sha256 {
                iterations: DEFAULT_PBKDF2_ITERATIONS,
                salt,
                hash,
            }),
            ["pbkdf2", "sha256", iterations] => Some(Self::Pbkdf2Sha256 {
                iterations: iterations.parse().ok().filter(|i| *i > 0)?,
                salt,
                hash,
            }),
            ["scrypt", n, r, p] => {
                let n: u64 = n.parse().ok()?;
                // n tiene que ser potencia de dos
                if n < 2 || !n.is_power_of_two() {
                    return None;
                }
                Some(Self::Scrypt {
                    log_n: n.trailing_zeros() as u8,
                    r: r.parse().ok()?,
                    p: p.parse().ok()?,
                    salt,
                    hash,
                })
            }
            _ => None,
        }
    }

    pub fn verify(&self, password: &str) -> Result<bool, AppError> {
        match self {
            Self::Pbkdf2Sha256 { iterations, salt, hash } => {
                let mut derived = vec![0u8; hash.len()];
                pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), *iterations, &mut derived);
                Ok(derived == *hash)
            }
            Self::Scrypt { log_n, r, p, salt, hash } => {
                let params = scrypt::Params::new(*log_n, *r, *p, hash.len())
                    .map_err(|e| anyhow::anyhow!("Parámetros scrypt inválidos: {}", e))?;
                let mut derived = vec![0u8; hash.len()];
                scrypt::scrypt(password.as_bytes(), salt.as_bytes(), &params, &mut derived)
                    .map_err(|e| anyhow::anyhow!("Falla en scrypt: {}", e))?;
                Ok(derived == *hash)
            }
        }
    }
}

/// Verifica un hash werkzeug en un hilo bloqueante.
pub async fn verify_werkzeug_password(password: String, stored: WerkzeugHash) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || stored.verify(&password))
        .await
        .map_err(|e| anyhow::anyhow!("Falla en la tarea de verificación: {}", e))?
}

#[cfg(test)]
mod tests {
    use super::*;

    const PBKDF2: &str =
        "pbkdf2:sha256:1000$Xy7kP2qL$9c297fac7e201c759fbbbe03ad37c9f15d2ac21cc20bdd60fe70ea7672fc14c1";
    const SCRYPT: &str = "scrypt:1024:8:1$Qm3vT9wZ$857c5fa63bcb4d58f9137f0227a3eb3080a2f9111915e11eda7bd1f89a4738fc6bb5c815392b365546cf99dde0ead8182c260960dd56d67c858941c96f6f1687";

    #[test]
    fn parses_both_methods() {
        assert!(matches!(
            WerkzeugHash::parse(PBKDF2),
            Some(WerkzeugHash::Pbkdf2Sha256 { iterations: 1000, .. })
        ));
        assert!(matches!(
            WerkzeugHash::parse(SCRYPT),
            Some(WerkzeugHash::Scrypt { log_n: 10, r: 8, p: 1, .. })
        ));
    }

    #[test]
    fn bcrypt_and_garbage_are_not_werkzeug() {
        assert_eq!(WerkzeugHash::parse("$2b$04$abcdefghijklmnopqrstuu"), None);
        assert_eq!(WerkzeugHash::parse("fibra123"), None);
        assert_eq!(WerkzeugHash::parse("scrypt:1000:8:1$salt$abcd"), None);
        assert_eq!(WerkzeugHash::parse("pbkdf2:md5:1000$salt$abcd"), None);
        assert_eq!(WerkzeugHash::parse("pbkdf2:sha256:1000$salt$zz"), None);
    }

    #[test]
    fn pbkdf2_checks_the_password() {
        let stored = WerkzeugHash::parse(PBKDF2).unwrap();
        assert!(stored.verify("fibra123").unwrap());
        assert!(!stored.verify("fibra124").unwrap());
    }

    #[test]
    fn scrypt_checks_the_password() {
        let stored = WerkzeugHash::parse(SCRYPT).unwrap();
        assert!(stored.verify("fibra123").unwrap());
        assert!(!stored.verify("otra").unwrap());
    }
}
