//! AWS provider for Netweave
//!
//! This crate turns a validated topology configuration into an ordered
//! resource declaration graph (VPC, subnets, gateways, routing, security
//! group, one instance) and implements the CloudProvider trait for AWS.
//!
//! # Features
//!
//! - Topology assembly: one linear pass from configuration to graph
//! - Graph application via the `aws` CLI (EC2 and STS subcommands)
//! - AMI resolution by name pattern, virtualization type and owner
//!
//! # Requirements
//!
//! - `aws` CLI must be installed and configured
//! - Credentials and default region are managed through the CLI's own
//!   configuration
//!
//! # Example
//!
//! ```ignore
//! use netweave_core::parse_kdl_file;
//! use netweave_cloud::CloudProvider;
//! use netweave_cloud_aws::{AwsProvider, build_topology};
//!
//! let config = parse_kdl_file("topology.kdl")?;
//! let graph = build_topology(&config)?;
//!
//! let provider = AwsProvider::new().with_region("eu-central-1");
//! let auth = provider.check_auth().await?;
//! if !auth.authenticated {
//!     panic!("Not authenticated: {:?}", auth.error);
//! }
//!
//! let result = provider.apply(&graph).await?;
//! ```

pub mod awscli;
pub mod error;
pub mod provider;
pub mod topology;

pub use awscli::AwsCli;
pub use error::{AwsError, Result};
pub use provider::AwsProvider;
pub use topology::{ANYWHERE, build_topology};
