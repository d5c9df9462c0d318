use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::clock::ClockState;
use crate::{error::AppError, models::Role};

/// Claims
///
/// Payload signed into every token. The token is self-contained: verifying it needs only
/// the server secret, never a lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user id.
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    /// Issued At (iat), seconds since the epoch.
    pub iat: i64,
    /// Expiration Time (exp), seconds since the epoch. Always greater than `iat`.
    pub exp: i64,
}

/// Identity
///
/// The triple a token proves. It only lives as long as the token or the request using it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject_id: Uuid,
    pub email: String,
    pub role: Role,
}

/// TokenService
///
/// Issues and verifies HMAC-SHA256 signed tokens. Holds only read-only key material and
/// a clock, so one instance is shared by every request without locking.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
    clock: ClockState,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &str, ttl_minutes: i64, clock: ClockState) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against our own clock below, with no leeway.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: Duration::try_minutes(ttl_minutes).unwrap_or(Duration::MAX),
            clock,
        }
    }

    /// issue
    ///
    /// Signs a token for the given identity, valid from now until now + TTL.
    pub fn issue(&self, subject_id: Uuid, email: &str, role: Role) -> Result<String, AppError> {
        let now = self.clock.now();
        let claims = Claims {
            sub: subject_id,
            email: email.to_string(),
            role,
            iat: now.timestamp(),
            exp: now
                .checked_add_signed(self.ttl)
                .ok_or_else(|| AppError::internal("token expiry out of range"))?
                .timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("failed to sign token: {e}")))
    }

    /// verify
    ///
    /// Checks signature, structure and expiry. Every failure collapses into
    /// `AppError::InvalidToken`; the reason is only visible in debug logs.
    pub fn verify(&self, token: &str) -> Result<Identity, AppError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!(reason = ?e.kind(), "token rejected");
            AppError::InvalidToken
        })?;
        let claims = data.claims;

        if claims.exp <= claims.iat {
            tracing::debug!("token rejected: exp not after iat");
            return Err(AppError::InvalidToken);
        }
        if claims.exp <= self.clock.now().timestamp() {
            tracing::debug!("token rejected: expired");
            return Err(AppError::InvalidToken);
        }

        Ok(Identity {
            subject_id: claims.sub,
            email: claims.email,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use std::sync::Arc;

    const SECRET: &str = "unit-test-secret";

    fn service(clock: &ManualClock) -> TokenService {
        TokenService::new(SECRET, 60, Arc::new(clock.clone()))
    }

    #[test]
    fn verify_returns_the_issued_identity() {
        let clock = ManualClock::starting_now();
        let tokens = service(&clock);
        let id = Uuid::new_v4();

        for role in [Role::User, Role::Admin] {
            let token = tokens.issue(id, "a@b.com", role).unwrap();
            let identity = tokens.verify(&token).unwrap();
            assert_eq!(
                identity,
                Identity {
                    subject_id: id,
                    email: "a@b.com".to_string(),
                    role,
                }
            );
        }
    }

    #[test]
    fn token_is_valid_until_ttl_then_rejected() {
        let clock = ManualClock::starting_now();
        let tokens = service(&clock);
        let token = tokens.issue(Uuid::new_v4(), "a@b.com", Role::User).unwrap();

        clock.advance(Duration::minutes(59));
        assert!(tokens.verify(&token).is_ok());

        clock.advance(Duration::minutes(1));
        assert!(matches!(tokens.verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn spliced_payload_fails_signature_check() {
        let clock = ManualClock::starting_now();
        let tokens = service(&clock);
        let id = Uuid::new_v4();
        let user_token = tokens.issue(id, "a@b.com", Role::User).unwrap();
        let admin_token = tokens.issue(id, "a@b.com", Role::Admin).unwrap();

        let user_parts: Vec<&str> = user_token.split('.').collect();
        let admin_parts: Vec<&str> = admin_token.split('.').collect();
        let forged = format!("{}.{}.{}", user_parts[0], admin_parts[1], user_parts[2]);

        assert!(matches!(tokens.verify(&forged), Err(AppError::InvalidToken)));
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let clock = ManualClock::starting_now();
        let other = TokenService::new("another-secret", 60, Arc::new(clock.clone()));
        let token = other.issue(Uuid::new_v4(), "a@b.com", Role::Admin).unwrap();

        assert!(matches!(
            service(&clock).verify(&token),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn oversized_ttl_is_an_error_not_a_panic() {
        let clock = ManualClock::starting_now();
        let tokens = TokenService::new(SECRET, i64::MAX, Arc::new(clock));
        assert!(matches!(
            tokens.issue(Uuid::new_v4(), "a@b.com", Role::User),
            Err(AppError::Internal(_))
        ));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let clock = ManualClock::starting_now();
        let tokens = service(&clock);
        for garbage in ["", "abc", "a.b.c", "Bearer x.y.z"] {
            assert!(matches!(tokens.verify(garbage), Err(AppError::InvalidToken)));
        }
    }
}
