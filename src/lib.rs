//! warden - a grant-based ACL evaluation engine.
//!
//! ## Modules
//!
//! - **domain**: grantees, resources, permissions, the strength lattice, grants
//! - **hierarchy**: resource ancestor-chain walking
//! - **membership**: group membership resolution (membership-as-grant)
//! - **store**: grant and user persistence (Mongo-backed, in-memory for tests)
//! - **cache**: TTL-bounded decision/membership/ancestor caching
//! - **decision**: the `check` evaluation engine
//! - **lifecycle**: grant issue/revoke and the invalidation it triggers
//! - **introspection**: effective permissions, inheritance chains, the permission matrix
//! - **audit**: append-only grant activity log
//! - **worker**: scheduled expiration and lookahead notification jobs
//! - **business_rules**: self-service profile edit field restrictions
//! - **bootstrap**: idempotent superuser seeding

pub mod audit;
pub mod auth;
pub mod bootstrap;
pub mod business_rules;
pub mod cache;
pub mod config;
pub mod db;
pub mod decision;
pub mod domain;
pub mod error;
pub mod hierarchy;
pub mod introspection;
pub mod lifecycle;
pub mod logging;
pub mod membership;
pub mod store;
pub mod worker;

pub use config::Args;
pub use error::{Result, WardenError};
