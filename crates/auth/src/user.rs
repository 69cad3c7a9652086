//! Back-office user identity.
//!
//! Users authenticate with email + password and carry exactly one role;
//! the permission set is always derived from the role at request time.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use remitdesk_audit::Audited;
use remitdesk_core::{DomainError, Entity, OrganisationId, RoleId, UserId};

use crate::principal::AccountStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub organisation_id: OrganisationId,
    pub email: String,
    pub display_name: String,
    /// Argon2 PHC string; redacted from audit snapshots.
    pub password_hash: String,
    pub role_id: RoleId,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

impl User {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        organisation_id: OrganisationId,
        email: impl Into<String>,
        display_name: impl Into<String>,
        password: &str,
        role_id: RoleId,
    ) -> Result<Self, DomainError> {
        let email = email.into();
        if !email.contains('@') {
            return Err(DomainError::validation("email must contain '@'"));
        }
        Ok(Self {
            id: UserId::new(),
            organisation_id,
            email,
            display_name: display_name.into(),
            password_hash: hash_password(password)?,
            role_id,
            status: AccountStatus::Active,
            created_at: Utc::now(),
        })
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Audited for User {
    const ENTITY_TYPE: &'static str = "user";

    fn tracked_fields() -> &'static [&'static str] {
        &["email", "display_name", "role_id", "status"]
    }

    fn display_id(id: &Self::Id) -> String {
        id.to_string()
    }
}

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, DomainError> {
    if password.len() < 8 {
        return Err(DomainError::validation(
            "password must be at least 8 characters",
        ));
    }
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| DomainError::internal(format!("password hashing failed: {e}")))
}

/// Constant-shape verification: malformed hashes verify as false, not as errors.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse!!", &hash));
    }

    #[test]
    fn short_passwords_rejected() {
        assert!(hash_password("short").is_err());
    }

    #[test]
    fn malformed_hash_verifies_false() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn user_requires_plausible_email() {
        let err = User::new(
            OrganisationId::new(),
            "not-an-email",
            "Ops",
            "password123",
            RoleId::new(),
        );
        assert!(err.is_err());
    }
}
