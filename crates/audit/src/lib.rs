//! `remitdesk-audit` — tamper-evident audit trail for sensitive entities.
//!
//! The pieces compose outside-in:
//!
//! - [`context`]: per-request metadata (actor, ip, request id) seeded by the
//!   HTTP layer and consumed, once, by the audit decorator.
//! - [`repository`]: the narrow persistence port domain code talks to.
//! - [`interceptor`]: [`AuditedRepository`], a decorator implementing the
//!   same port around any inner repository, capturing before/after state.
//! - [`diff`] / [`redact`]: field-level change computation over a tracked
//!   allow-list, and unconditional secret scrubbing of snapshots.
//! - [`writer`]: asynchronous, best-effort persistence of [`AuditRecord`]s;
//!   audit failures are logged, never surfaced to the primary operation.

pub mod context;
pub mod diff;
pub mod interceptor;
pub mod record;
pub mod redact;
pub mod repository;
pub mod store;
pub mod writer;

pub use context::{RequestContext, RequestContextStore, RequestScope};
pub use diff::{diff_tracked, FieldChange};
pub use interceptor::{Audited, AuditedRepository};
pub use record::{AuditAction, AuditRecord, BULK_ENTITY_ID};
pub use redact::{redact_secrets, REDACTION_MARKER, SECRET_FIELDS};
pub use repository::Repository;
pub use store::{AuditQuery, AuditStore};
pub use writer::{AuditWriter, AuditWriterHandle};
