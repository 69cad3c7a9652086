//! Per-request context threaded into the audit layer.
//!
//! The HTTP layer seeds an entry at request start and stamps the actor once
//! authentication resolves. The audit decorator consumes the entry (single
//! use) when it records a mutation; the response hook removes whatever is
//! left. TTL eviction is the backstop against entries leaked by aborted
//! requests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value as JsonValue;

use remitdesk_core::{OrganisationId, RequestId, UserId};

/// Caller metadata captured for the lifetime of one HTTP request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    pub user_id: Option<UserId>,
    pub organisation_id: Option<OrganisationId>,
    pub ip_address: Option<String>,
    pub request_id: Option<RequestId>,
    pub user_agent: Option<String>,
    pub metadata: Option<JsonValue>,
}

impl RequestContext {
    /// Context for mutations with no resolvable caller (system actions,
    /// requests that never authenticated).
    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// Lookup key the persistence port carries through the call chain.
///
/// Passing the key explicitly (rather than reading ambient global state)
/// keeps repositories testable and makes the single shared map below a pure
/// propagation detail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestScope {
    pub request_id: Option<RequestId>,
}

impl RequestScope {
    pub fn for_request(request_id: RequestId) -> Self {
        Self {
            request_id: Some(request_id),
        }
    }

    /// Scope with no request attached; the decorator falls back to an
    /// anonymous context.
    pub fn anonymous() -> Self {
        Self::default()
    }
}

struct Entry {
    context: RequestContext,
    inserted_at: Instant,
}

/// Process-wide store of in-flight request contexts, keyed by request id.
///
/// Concurrent requests always use distinct generated ids, so lookups never
/// collide. Entries must not outlive their request: they are deleted on
/// first consumption or on response completion, and [`evict_expired`]
/// sweeps anything a crashed request left behind.
///
/// [`evict_expired`]: RequestContextStore::evict_expired
pub struct RequestContextStore {
    entries: Mutex<HashMap<RequestId, Entry>>,
    ttl: Duration,
}

impl RequestContextStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Insert (or replace) the context for a request id.
    pub fn seed(&self, request_id: RequestId, context: RequestContext) {
        let mut entries = self.entries.lock().expect("context store poisoned");
        entries.insert(
            request_id,
            Entry {
                context,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Merge the authenticated actor into an already-seeded entry.
    ///
    /// No-op when the entry is gone (already consumed); the actor is then
    /// simply absent from any later audit record, which fails safe.
    pub fn stamp_actor(
        &self,
        request_id: RequestId,
        user_id: UserId,
        organisation_id: OrganisationId,
    ) {
        let mut entries = self.entries.lock().expect("context store poisoned");
        if let Some(entry) = entries.get_mut(&request_id) {
            entry.context.user_id = Some(user_id);
            entry.context.organisation_id = Some(organisation_id);
        }
    }

    /// Consume the context for a request id (single use).
    ///
    /// Returns the anonymous context when nothing is stored - the audit
    /// path must never fail because context is missing.
    pub fn take(&self, scope: RequestScope) -> RequestContext {
        let Some(request_id) = scope.request_id else {
            return RequestContext::anonymous();
        };
        let mut entries = self.entries.lock().expect("context store poisoned");
        entries
            .remove(&request_id)
            .map(|e| e.context)
            .unwrap_or_else(RequestContext::anonymous)
    }

    /// Delete without consuming (response-completion cleanup).
    pub fn remove(&self, request_id: RequestId) {
        let mut entries = self.entries.lock().expect("context store poisoned");
        entries.remove(&request_id);
    }

    /// Sweep entries older than the TTL. Returns the number evicted.
    pub fn evict_expired(&self) -> usize {
        let mut entries = self.entries.lock().expect("context store poisoned");
        let before = entries.len();
        entries.retain(|_, e| e.inserted_at.elapsed() < self.ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("context store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RequestContextStore {
    fn default() -> Self {
        // Generous enough for any real request; short enough that leaks
        // cannot accumulate meaningfully.
        Self::new(Duration::from_secs(300))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_for(ip: &str) -> RequestContext {
        RequestContext {
            ip_address: Some(ip.to_string()),
            ..RequestContext::default()
        }
    }

    #[test]
    fn take_is_single_use() {
        let store = RequestContextStore::default();
        let id = RequestId::new();
        store.seed(id, ctx_for("10.0.0.1"));

        let scope = RequestScope::for_request(id);
        let first = store.take(scope);
        assert_eq!(first.ip_address.as_deref(), Some("10.0.0.1"));

        // Second consumption falls back to anonymous.
        assert_eq!(store.take(scope), RequestContext::anonymous());
    }

    #[test]
    fn missing_entry_degrades_to_anonymous() {
        let store = RequestContextStore::default();
        let scope = RequestScope::for_request(RequestId::new());
        assert_eq!(store.take(scope), RequestContext::anonymous());
        assert_eq!(store.take(RequestScope::anonymous()), RequestContext::anonymous());
    }

    #[test]
    fn concurrent_requests_use_distinct_keys() {
        let store = RequestContextStore::default();
        let a = RequestId::new();
        let b = RequestId::new();
        store.seed(a, ctx_for("10.0.0.1"));
        store.seed(b, ctx_for("10.0.0.2"));

        assert_eq!(
            store.take(RequestScope::for_request(b)).ip_address.as_deref(),
            Some("10.0.0.2")
        );
        assert_eq!(
            store.take(RequestScope::for_request(a)).ip_address.as_deref(),
            Some("10.0.0.1")
        );
    }

    #[test]
    fn stamp_actor_merges_into_seeded_entry() {
        let store = RequestContextStore::default();
        let id = RequestId::new();
        let user = UserId::new();
        let org = OrganisationId::new();

        store.seed(id, ctx_for("10.0.0.1"));
        store.stamp_actor(id, user, org);

        let ctx = store.take(RequestScope::for_request(id));
        assert_eq!(ctx.user_id, Some(user));
        assert_eq!(ctx.organisation_id, Some(org));
        assert_eq!(ctx.ip_address.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn eviction_sweeps_expired_entries_only() {
        let store = RequestContextStore::new(Duration::from_secs(0));
        store.seed(RequestId::new(), RequestContext::anonymous());
        assert_eq!(store.len(), 1);
        assert_eq!(store.evict_expired(), 1);
        assert!(store.is_empty());

        let long_lived = RequestContextStore::new(Duration::from_secs(600));
        long_lived.seed(RequestId::new(), RequestContext::anonymous());
        assert_eq!(long_lived.evict_expired(), 0);
        assert_eq!(long_lived.len(), 1);
    }

    #[test]
    fn remove_discards_without_consuming() {
        let store = RequestContextStore::default();
        let id = RequestId::new();
        store.seed(id, ctx_for("10.0.0.1"));
        store.remove(id);
        assert!(store.is_empty());
    }
}
