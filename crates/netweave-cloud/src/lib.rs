//! Netweave Cloud Infrastructure
//!
//! This crate provides the provider-neutral half of Netweave: a network
//! topology is expressed as an ordered set of resource declarations whose
//! inputs may reference attributes of previously declared resources.
//! Providers apply the graph front to back against a cloud control plane.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                topology.kdl (data)               │
//! │                  netweave-core                   │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               netweave-cloud                     │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │   ResourceGraph (ordered declarations)    │   │
//! │  │   trait CloudProvider { ... }             │   │
//! │  └──────────────────────────────────────────┘   │
//! └───────────────────────┬─────────────────────────┘
//!                         │
//!                 ┌───────▼───────┐
//!                 │  aws provider │
//!                 └───────────────┘
//! ```
//!
//! The graph enforces declared-before-use: a declaration may only reference
//! resources that already sit earlier in the graph, so the dependency DAG
//! degenerates to the authored total order.

pub mod apply;
pub mod error;
pub mod graph;
pub mod provider;
pub mod resource;

// Re-exports
pub use apply::{ApplyRecord, ApplyResult};
pub use error::{CloudError, Result};
pub use graph::{Outputs, ResourceGraph};
pub use provider::{AuthStatus, CloudProvider};
pub use resource::{AttrRef, Input, ResourceDecl, ResourceKind};
