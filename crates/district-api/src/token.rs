use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use district_types::api::Claims;
use district_types::models::Identity;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyError {
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is malformed")]
    Malformed,
}

/// Signs and verifies HS256 bearer tokens.
///
/// Holds only immutable key material, so one instance is shared by every
/// request task. Expiry is checked against the `now` passed to [`verify`],
/// with `leeway` added to the token's expiry to absorb clock skew.
///
/// [`verify`]: TokenCodec::verify
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    leeway: Duration,
}

impl TokenCodec {
    pub fn new(secret: &[u8], leeway: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // jsonwebtoken reads the system clock; expiry is checked in `verify` instead
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "iat", "exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            leeway,
        }
    }

    /// Instants keep microsecond precision; anything finer is truncated.
    pub fn sign(
        &self,
        subject: &str,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> jsonwebtoken::errors::Result<String> {
        let claims = Claims {
            sub: subject.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            iat_us: issued_at.timestamp_micros(),
            exp_us: expires_at.timestamp_micros(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// A token is expired from its expiry instant onwards (plus leeway).
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, VerifyError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    VerifyError::InvalidSignature
                }
                _ => VerifyError::Malformed,
            }
        })?;
        let claims = data.claims;

        if claims.sub.is_empty() {
            return Err(VerifyError::Malformed);
        }
        let issued_at = instant(claims.iat, claims.iat_us)?;
        let expires_at = instant(claims.exp, claims.exp_us)?;

        if now >= expires_at + self.leeway {
            return Err(VerifyError::Expired);
        }

        Ok(Identity {
            subject: claims.sub,
            issued_at,
            expires_at,
        })
    }
}

/// The seconds claim must agree with its microsecond counterpart.
fn instant(secs: i64, micros: i64) -> Result<DateTime<Utc>, VerifyError> {
    let at = DateTime::from_timestamp_micros(micros).ok_or(VerifyError::Malformed)?;
    if at.timestamp() != secs {
        return Err(VerifyError::Malformed);
    }
    Ok(at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;
    use std::thread;

    fn codec() -> TokenCodec {
        TokenCodec::new(b"test-secret", Duration::zero())
    }

    fn issued() -> (DateTime<Utc>, DateTime<Utc>) {
        let iat = Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap();
        (iat, iat + Duration::hours(24))
    }

    #[test]
    fn sign_then_verify_yields_subject() {
        let codec = codec();
        let (iat, exp) = issued();
        let token = codec.sign("account-1", iat, exp).unwrap();

        let identity = codec.verify(&token, iat).unwrap();
        assert_eq!(identity.subject, "account-1");
        assert_eq!(identity.issued_at, iat);
        assert_eq!(identity.expires_at, exp);
    }

    #[test]
    fn verifying_twice_is_idempotent() {
        let codec = codec();
        let (iat, exp) = issued();
        let token = codec.sign("account-1", iat, exp).unwrap();
        let now = iat + Duration::minutes(5);

        assert_eq!(codec.verify(&token, now), codec.verify(&token, now));
    }

    #[test]
    fn expiry_boundary() {
        let codec = codec();
        let (iat, exp) = issued();
        let token = codec.sign("account-1", iat, exp).unwrap();

        assert_eq!(codec.verify(&token, exp), Err(VerifyError::Expired));
        assert!(codec.verify(&token, exp - Duration::microseconds(1)).is_ok());
    }

    #[test]
    fn sub_second_expiry_is_kept() {
        let codec = codec();
        let iat = Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap() + Duration::milliseconds(700);
        let exp = iat + Duration::hours(24);
        let token = codec.sign("account-1", iat, exp).unwrap();

        let identity = codec.verify(&token, iat).unwrap();
        assert_eq!(identity.issued_at, iat);
        assert_eq!(identity.expires_at, exp);

        assert!(codec.verify(&token, exp - Duration::microseconds(1)).is_ok());
        assert_eq!(codec.verify(&token, exp), Err(VerifyError::Expired));
    }

    #[test]
    fn mismatched_second_claims_are_malformed() {
        let (iat, exp) = issued();
        let claims = Claims {
            sub: "account-1".into(),
            iat: iat.timestamp(),
            exp: exp.timestamp() + 3600,
            iat_us: iat.timestamp_micros(),
            exp_us: exp.timestamp_micros(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert_eq!(codec().verify(&token, iat), Err(VerifyError::Malformed));
    }

    #[test]
    fn leeway_extends_expiry() {
        let codec = TokenCodec::new(b"test-secret", Duration::seconds(30));
        let (iat, exp) = issued();
        let token = codec.sign("account-1", iat, exp).unwrap();

        assert!(codec.verify(&token, exp + Duration::seconds(29)).is_ok());
        assert_eq!(
            codec.verify(&token, exp + Duration::seconds(30)),
            Err(VerifyError::Expired)
        );
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let (iat, exp) = issued();
        let token = TokenCodec::new(b"other-secret", Duration::zero())
            .sign("account-1", iat, exp)
            .unwrap();

        assert_eq!(codec().verify(&token, iat), Err(VerifyError::InvalidSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        let (iat, _) = issued();
        assert_eq!(codec().verify("not-a-token", iat), Err(VerifyError::Malformed));
        assert_eq!(codec().verify("", iat), Err(VerifyError::Malformed));
    }

    #[test]
    fn shared_across_threads() {
        let codec = Arc::new(codec());
        let (iat, exp) = issued();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let codec = codec.clone();
                thread::spawn(move || {
                    let subject = format!("account-{i}");
                    let token = codec.sign(&subject, iat, exp).unwrap();
                    assert_eq!(codec.verify(&token, iat).unwrap().subject, subject);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }
}
