//! # Platform User Records
//!
//! The platform-internal user a completed presentation resolves to:
//! either insert-or-find by the vendor's user id, or an anonymous record
//! when no identity resolution was required.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use credex_core::{CredexError, TenantId, Timestamp, UserId, VendorUserId};

/// Platform-internal user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformUser {
    /// Platform identifier.
    pub id: UserId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// The vendor's identifier, `None` for anonymous users.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_user_id: Option<VendorUserId>,
    /// When the record was created.
    pub created_at: Timestamp,
}

/// Persistent record of platform users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert-or-find the user for a vendor user id. Repeated calls with
    /// the same id return the same record.
    async fn upsert_by_vendor_user_id(
        &self,
        tenant_id: &TenantId,
        vendor_user_id: &VendorUserId,
    ) -> Result<PlatformUser, CredexError>;

    /// Create an anonymous user for flows with no identity resolution.
    async fn create_anonymous(&self, tenant_id: &TenantId) -> Result<PlatformUser, CredexError>;
}

/// Mutex-guarded in-memory user store.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    by_vendor_id: Mutex<HashMap<(TenantId, VendorUserId), PlatformUser>>,
}

impl MemoryUserStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn upsert_by_vendor_user_id(
        &self,
        tenant_id: &TenantId,
        vendor_user_id: &VendorUserId,
    ) -> Result<PlatformUser, CredexError> {
        let mut users = self.by_vendor_id.lock().unwrap_or_else(|e| e.into_inner());
        let user = users
            .entry((*tenant_id, vendor_user_id.clone()))
            .or_insert_with(|| PlatformUser {
                id: UserId::new(),
                tenant_id: *tenant_id,
                vendor_user_id: Some(vendor_user_id.clone()),
                created_at: Timestamp::now(),
            });
        Ok(user.clone())
    }

    async fn create_anonymous(&self, tenant_id: &TenantId) -> Result<PlatformUser, CredexError> {
        Ok(PlatformUser {
            id: UserId::new(),
            tenant_id: *tenant_id,
            vendor_user_id: None,
            created_at: Timestamp::now(),
        })
    }
}
