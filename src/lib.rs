// Loyalty Platform - Core Library
// Exposes all modules for use in the API server and tests

pub mod auth;
pub mod config;
pub mod eligibility;
pub mod entities;
pub mod error;
pub mod graphql;
pub mod pagination;
pub mod rest;
pub mod store;
pub mod workflow;

// Re-export commonly used types
pub use auth::{hash_password, login, verify_password, AccessGate, AuthContext};
pub use config::Config;
pub use eligibility::EligibilityEngine;
pub use entities::{
    EnrollmentRequest, EnrollmentStatus, Member, MemberUpdate, Promo, PromoStatus,
    PromoTemplate, RequiredMemberField, Vendor, VendorType,
};
pub use error::{DomainError, ErrorBody, Result};
pub use pagination::{decode_cursor, encode_cursor, paginate, Connection, Edge, PageInfo};
pub use rest::{build_router, AppState};
pub use store::{
    EnrollmentStore, MemberStore, MemoryStore, PromoStore, SqliteStore, Storage, VendorStore,
};
pub use workflow::EnrollmentWorkflow;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
