//! Realm Manager Protocol Buffer Definitions
//!
//! This crate contains the protocol buffer definitions for the realm manager
//! gRPC service.
//!
//! # Usage
//!
//! ```ignore
//! use realm_mgr_proto::realm_mgr::v1::{CreateRealmRequest, GetRealmRequest};
//! use realm_mgr_proto::{RealmManagerServiceClient, RealmManagerServiceServer};
//! ```

/// Realm manager protocol definitions.
///
/// Contains `RealmManagerService` with the realm lifecycle RPCs and a health check.
pub mod realm_mgr {
    pub mod v1 {
        tonic::include_proto!("realm_mgr.v1");
    }
}

// ============================================================================
// Re-exports: RealmManagerService
// ============================================================================

pub use realm_mgr::v1::{
    // Shared message types
    EnumStatus,
    Realm,
    // Client and server
    realm_manager_service_client::RealmManagerServiceClient,
    realm_manager_service_server::{RealmManagerService, RealmManagerServiceServer},
};
