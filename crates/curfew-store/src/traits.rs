//! Store trait definitions

use crate::{AuditEvent, StoreResult};

/// Main store trait
pub trait Store: Send + Sync {
    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}

/// Store that accepts and forgets everything, used when auditing is disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl Store for NullStore {
    fn append_audit(&self, _event: AuditEvent) -> StoreResult<()> {
        Ok(())
    }

    fn get_recent_audits(&self, _limit: usize) -> StoreResult<Vec<AuditEvent>> {
        Ok(Vec::new())
    }

    fn is_healthy(&self) -> bool {
        true
    }
}
