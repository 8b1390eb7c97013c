use std::str::FromStr;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::claims::Claims;
use crate::config::{ttl_from_minutes, JwtConfig};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("failed to sign token: {0}")]
    Encoding(String),
}

/// Signs and verifies bearer tokens. Tokens are never stored server-side and
/// cannot be revoked; a leaked token stays valid until its `exp`.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    ttl: Duration,
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> anyhow::Result<Self> {
        let algorithm = Algorithm::from_str(&cfg.algorithm)
            .map_err(|e| anyhow::anyhow!("unknown JWT algorithm {}: {}", cfg.algorithm, e))?;
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            anyhow::bail!("JWT algorithm {} is not an HMAC algorithm", cfg.algorithm);
        }
        if cfg.secret.is_empty() {
            anyhow::bail!("JWT secret must not be empty");
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            algorithm,
            ttl: ttl_from_minutes(cfg.ttl_minutes)?,
        })
    }

    /// Issues a token for `subject` with the configured default TTL.
    pub fn issue(&self, subject: &str) -> Result<String, TokenError> {
        self.issue_with_ttl(subject, self.ttl)
    }

    pub fn issue_with_ttl(&self, subject: &str, ttl: Duration) -> Result<String, TokenError> {
        let now = OffsetDateTime::now_utc();
        let exp = now
            .checked_add(ttl)
            .ok_or_else(|| TokenError::Encoding("expiry out of range".into()))?;
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;
        debug!(exp = claims.exp, "jwt signed");
        Ok(token)
    }

    /// Verifies signature, algorithm and expiry, returning the subject claim.
    pub fn decode(&self, token: &str) -> Result<String, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            }
        })?;
        if data.claims.sub.is_empty() {
            return Err(TokenError::Invalid("empty subject".into()));
        }
        debug!("jwt verified");
        Ok(data.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str, algorithm: &str) -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: secret.into(),
            algorithm: algorithm.into(),
            ttl_minutes: 30,
        })
        .expect("valid jwt config")
    }

    #[test]
    fn issue_and_decode_roundtrip() {
        let keys = make_keys("dev-secret", "HS256");
        let token = keys.issue("a@x.com").expect("issue");
        assert_eq!(keys.decode(&token).expect("decode"), "a@x.com");
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = make_keys("dev-secret", "HS256");
        let token = keys
            .issue_with_ttl("a@x.com", Duration::seconds(-5))
            .expect("issue");
        assert!(matches!(keys.decode(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let keys = make_keys("dev-secret", "HS256");
        let token = keys.issue("a@x.com").expect("issue");
        let idx = token.find('.').unwrap() + 5;
        let mut bytes = token.into_bytes();
        bytes[idx] = if bytes[idx] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();
        assert!(keys.decode(&tampered).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let good = make_keys("secret-one", "HS256");
        let bad = make_keys("secret-two", "HS256");
        let token = good.issue("a@x.com").expect("issue");
        assert!(matches!(bad.decode(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn other_algorithm_is_rejected() {
        let hs512 = make_keys("same-secret", "HS512");
        let hs256 = make_keys("same-secret", "HS256");
        let token = hs512.issue("a@x.com").expect("issue");
        assert!(hs256.decode(&token).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let keys = make_keys("dev-secret", "HS256");
        assert!(keys.decode("invalid.token.here").is_err());
        assert!(keys.decode("").is_err());
    }

    #[test]
    fn config_rejects_non_hmac_algorithms() {
        let cfg = JwtConfig {
            secret: "s".into(),
            algorithm: "RS256".into(),
            ttl_minutes: 30,
        };
        assert!(JwtKeys::from_config(&cfg).is_err());
        let cfg = JwtConfig {
            algorithm: "nope".into(),
            ..cfg
        };
        assert!(JwtKeys::from_config(&cfg).is_err());
    }

    #[test]
    fn config_rejects_bad_ttls() {
        for ttl_minutes in [0, -1, i64::MAX] {
            let cfg = JwtConfig {
                secret: "s".into(),
                algorithm: "HS256".into(),
                ttl_minutes,
            };
            assert!(JwtKeys::from_config(&cfg).is_err(), "ttl {ttl_minutes}");
        }
    }

    #[test]
    fn oversized_override_fails_without_panicking() {
        let keys = make_keys("dev-secret", "HS256");
        assert!(matches!(
            keys.issue_with_ttl("a@x.com", Duration::days(10_000_000)),
            Err(TokenError::Encoding(_))
        ));
    }
}
