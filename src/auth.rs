// Access Control - password hashing, token issuance, bearer gate
//
// Passwords are stored as `salt$hex(sha256(salt + password))`. Tokens are
// HS256 JWTs carrying the member id as subject, expiring after the
// configured TTL. The gate never explains why a token failed: missing
// header, wrong scheme, missing token, bad signature, and expiry all
// collapse into allowed=false.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{DomainError, Result};
use crate::store::Storage;

pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

// ============================================================================
// PASSWORD HASHING
// ============================================================================

pub fn hash_password(password: &str) -> String {
    let salt = uuid::Uuid::new_v4().simple().to_string();
    format!("{salt}${}", digest(&salt, password))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, expected)) => digest(salt, password) == expected,
        None => false,
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// ACCESS GATE
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Per-request authorization outcome, derived once from the Authorization
/// header and handed to every resolver.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    pub allowed: bool,
    pub subject: Option<String>,
}

impl AuthContext {
    /// Raise NotAllowed unless the caller presented a valid token.
    pub fn require(&self) -> Result<&str> {
        match (self.allowed, self.subject.as_deref()) {
            (true, Some(subject)) => Ok(subject),
            _ => Err(DomainError::NotAllowed),
        }
    }
}

#[derive(Clone)]
pub struct AccessGate {
    secret: String,
    ttl_secs: u64,
}

impl AccessGate {
    pub fn new(secret: impl Into<String>, ttl_secs: u64) -> Self {
        AccessGate {
            secret: secret.into(),
            ttl_secs,
        }
    }

    /// Sign a token for the subject with the configured expiry.
    pub fn generate_token(&self, subject: &str) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now,
            exp: now + self.ttl_secs as i64,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| DomainError::persistence(format!("token signing failed: {e}")))
    }

    /// Parse and verify a `Bearer <token>` header value. Every failure mode
    /// yields the same unauthenticated context.
    pub fn authorize(&self, header: Option<&str>) -> AuthContext {
        let Some(raw) = header else {
            return AuthContext::default();
        };

        let mut parts = raw.splitn(2, ' ');
        if parts.next() != Some("Bearer") {
            return AuthContext::default();
        }
        let token = match parts.next() {
            Some(token) if !token.is_empty() => token,
            _ => return AuthContext::default(),
        };

        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(data) => AuthContext {
                allowed: true,
                subject: Some(data.claims.sub),
            },
            Err(_) => AuthContext::default(),
        }
    }
}

// ============================================================================
// LOGIN
// ============================================================================

/// Exchange credentials for a token.
pub fn login(
    storage: &Storage,
    gate: &AccessGate,
    username: &str,
    password: &str,
) -> Result<String> {
    if username.is_empty() || password.is_empty() {
        return Err(DomainError::MissingCredentials);
    }

    let member = storage
        .members
        .find_by_username(username)?
        .ok_or(DomainError::InvalidCredentials)?;

    if !verify_password(password, &member.password_hash) {
        return Err(DomainError::InvalidCredentials);
    }

    gate.generate_token(&member.id)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Member;

    fn gate() -> AccessGate {
        AccessGate::new("test-secret", DEFAULT_TOKEN_TTL_SECS)
    }

    #[test]
    fn test_hash_and_verify_password() {
        let stored = hash_password("hunter2");
        assert!(stored.contains('$'));
        assert!(verify_password("hunter2", &stored));
        assert!(!verify_password("hunter3", &stored));
    }

    #[test]
    fn test_same_password_hashes_differently() {
        // distinct salts
        assert_ne!(hash_password("hunter2"), hash_password("hunter2"));
    }

    #[test]
    fn test_verify_rejects_malformed_stored_value() {
        assert!(!verify_password("hunter2", "no-dollar-sign"));
    }

    #[test]
    fn test_token_round_trip() {
        let gate = gate();
        let token = gate.generate_token("member-1").unwrap();

        let ctx = gate.authorize(Some(&format!("Bearer {token}")));
        assert!(ctx.allowed);
        assert_eq!(ctx.subject.as_deref(), Some("member-1"));
        assert_eq!(ctx.require().unwrap(), "member-1");
    }

    #[test]
    fn test_missing_header_not_allowed() {
        let ctx = gate().authorize(None);
        assert!(!ctx.allowed);
        assert!(ctx.subject.is_none());
        assert_eq!(ctx.require().unwrap_err().code(), "NOT_ALLOWED_ERROR");
    }

    #[test]
    fn test_wrong_scheme_not_allowed() {
        let gate = gate();
        let token = gate.generate_token("member-1").unwrap();
        assert!(!gate.authorize(Some(&format!("Basic {token}"))).allowed);
        assert!(!gate.authorize(Some(&format!("bearer {token}"))).allowed);
    }

    #[test]
    fn test_missing_token_not_allowed() {
        let gate = gate();
        assert!(!gate.authorize(Some("Bearer")).allowed);
        assert!(!gate.authorize(Some("Bearer ")).allowed);
    }

    #[test]
    fn test_garbage_token_not_allowed() {
        assert!(!gate().authorize(Some("Bearer not.a.jwt")).allowed);
    }

    #[test]
    fn test_token_from_other_secret_not_allowed() {
        let other = AccessGate::new("different-secret", DEFAULT_TOKEN_TTL_SECS);
        let token = other.generate_token("member-1").unwrap();
        assert!(!gate().authorize(Some(&format!("Bearer {token}"))).allowed);
    }

    #[test]
    fn test_login_happy_path() {
        let storage = Storage::in_memory();
        let member = Member::new("alice".to_string(), hash_password("hunter2"));
        storage.members.insert(&member).unwrap();

        let gate = gate();
        let token = login(&storage, &gate, "alice", "hunter2").unwrap();

        let ctx = gate.authorize(Some(&format!("Bearer {token}")));
        assert_eq!(ctx.subject.as_deref(), Some(member.id.as_str()));
    }

    #[test]
    fn test_login_missing_credentials() {
        let storage = Storage::in_memory();
        let err = login(&storage, &gate(), "", "hunter2").unwrap_err();
        assert_eq!(err.code(), "MISSING_CREDENTIALS");
        let err = login(&storage, &gate(), "alice", "").unwrap_err();
        assert_eq!(err.code(), "MISSING_CREDENTIALS");
    }

    #[test]
    fn test_login_unknown_user_and_bad_password_look_alike() {
        let storage = Storage::in_memory();
        let member = Member::new("alice".to_string(), hash_password("hunter2"));
        storage.members.insert(&member).unwrap();

        let gate = gate();
        let unknown = login(&storage, &gate, "mallory", "hunter2").unwrap_err();
        let wrong = login(&storage, &gate, "alice", "wrong").unwrap_err();
        assert_eq!(unknown, wrong);
        assert_eq!(unknown.code(), "INVALID_CREDENTIALS");
    }
}
