use crate::db::DbPool;
use crate::errors::ServiceError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Handle to one client organization's isolated store.
///
/// Every service call takes a `TenantContext`, so the routing decision
/// ("which store does this call operate against") is made exactly once,
/// at the edge, and threaded through explicitly rather than via a global
/// registry.
#[derive(Clone)]
pub struct TenantContext {
    tenant_code: String,
    db: Arc<DbPool>,
}

impl TenantContext {
    pub fn new(tenant_code: impl Into<String>, db: Arc<DbPool>) -> Self {
        Self {
            tenant_code: tenant_code.into(),
            db,
        }
    }

    pub fn tenant_code(&self) -> &str {
        &self.tenant_code
    }

    /// The tenant's store handle. Borrowed by every query in the call.
    pub fn db(&self) -> &DbPool {
        &self.db
    }
}

impl fmt::Debug for TenantContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantContext")
            .field("tenant_code", &self.tenant_code)
            .finish()
    }
}

/// Resolves tenant identifiers to store handles.
///
/// Provisioning and credential validation live outside this crate; the
/// surrounding system implements this trait over whatever directory it
/// keeps (connection-string table, per-client config, ...).
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn resolve(&self, tenant_code: &str) -> Result<TenantContext, ServiceError>;
}

/// Directory over a fixed set of already-connected stores.
///
/// Suitable for tests and single-tenant embedding.
pub struct StaticTenantDirectory {
    tenants: Vec<(String, Arc<DbPool>)>,
}

impl StaticTenantDirectory {
    pub fn new(tenants: Vec<(String, Arc<DbPool>)>) -> Self {
        Self { tenants }
    }
}

#[async_trait]
impl TenantDirectory for StaticTenantDirectory {
    async fn resolve(&self, tenant_code: &str) -> Result<TenantContext, ServiceError> {
        self.tenants
            .iter()
            .find(|(code, _)| code == tenant_code)
            .map(|(code, db)| TenantContext::new(code.clone(), db.clone()))
            .ok_or_else(|| ServiceError::NotFound(format!("Unknown tenant {}", tenant_code)))
    }
}
