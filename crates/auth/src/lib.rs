//! `remitdesk-auth` — authentication/authorization boundary (zero-trust).
//!
//! Credential verification, the closed permission registry, and the pure
//! access-decision function live here. This crate is intentionally decoupled
//! from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod user;

pub use authorize::{authorize, AuthzError};
pub use claims::{Claims, Hs256TokenVerifier, TokenError, TokenVerifier};
pub use permissions::{Permission, PermissionDef, REGISTRY};
pub use principal::{AccountStatus, Principal};
pub use roles::{PermissionEntry, Role, RolePermission};
pub use user::{hash_password, verify_password, User};
