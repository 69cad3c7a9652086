//! Infrastructure wiring: stores, the audit pipeline, and the decorated
//! repositories handlers talk to.

use std::sync::Arc;
use std::time::Duration;

use remitdesk_audit::{writer, AuditStore, AuditedRepository, AuditWriter, RequestContextStore};
use remitdesk_auth::{Hs256TokenVerifier, Role, RolePermission, User};
use remitdesk_infra::{
    InMemoryAuditStore, InMemoryRbacStore, InMemoryTransactionStore, InMemoryUserStore,
};
use remitdesk_remit::Transaction;

#[cfg(feature = "postgres")]
use remitdesk_infra::PostgresAuditStore;
#[cfg(feature = "postgres")]
use sqlx::PgPool;

/// Capacity of the in-flight audit queue.
const AUDIT_QUEUE_CAPACITY: usize = 1024;

/// How long shutdown waits for the audit queue to flush.
pub const AUDIT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything the HTTP handlers need, wired once at startup.
///
/// The four audited entity types (transactions, roles, grants, users) are
/// reached only through their [`AuditedRepository`] decorators; the audit
/// query surface reads the store directly.
pub struct AppServices {
    pub verifier: Arc<Hs256TokenVerifier>,
    pub contexts: Arc<RequestContextStore>,
    pub rbac: Arc<InMemoryRbacStore>,
    pub audit_store: Arc<dyn AuditStore>,
    pub audit_writer: AuditWriter,
    pub transactions: AuditedRepository<Transaction, InMemoryTransactionStore>,
    pub roles: AuditedRepository<Role, InMemoryRbacStore>,
    pub grants: AuditedRepository<RolePermission, InMemoryRbacStore>,
    pub users: AuditedRepository<User, InMemoryUserStore>,
}

/// Audit persistence: Postgres when the `postgres` feature is enabled and
/// `DATABASE_URL` is set, in-memory otherwise.
async fn build_audit_store() -> Arc<dyn AuditStore> {
    #[cfg(feature = "postgres")]
    if let Ok(url) = std::env::var("DATABASE_URL") {
        let pool = PgPool::connect(&url)
            .await
            .unwrap_or_else(|e| panic!("failed to connect to audit database: {e}"));
        tracing::info!("audit trail backed by postgres");
        return Arc::new(PostgresAuditStore::new(pool));
    }

    Arc::new(InMemoryAuditStore::new())
}

pub async fn build_services(jwt_secret: String) -> AppServices {
    let verifier = Arc::new(Hs256TokenVerifier::new(jwt_secret.as_bytes()));
    let contexts = Arc::new(RequestContextStore::default());

    let rbac = Arc::new(InMemoryRbacStore::new());
    rbac.seed_registry();

    let audit_store = build_audit_store().await;
    let (audit_writer, _audit_worker) = writer::spawn(audit_store.clone(), AUDIT_QUEUE_CAPACITY);

    let transactions = AuditedRepository::new(
        Arc::new(InMemoryTransactionStore::new()),
        contexts.clone(),
        audit_writer.clone(),
    );
    let roles = AuditedRepository::new(rbac.clone(), contexts.clone(), audit_writer.clone());
    let grants = AuditedRepository::new(rbac.clone(), contexts.clone(), audit_writer.clone());
    let users = AuditedRepository::new(
        Arc::new(InMemoryUserStore::new()),
        contexts.clone(),
        audit_writer.clone(),
    );

    AppServices {
        verifier,
        contexts,
        rbac,
        audit_store,
        audit_writer,
        transactions,
        roles,
        grants,
        users,
    }
}
