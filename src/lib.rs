//! Configuration-rewrite engine for WSO2 server distributions.
//!
//! A single downloaded distribution is respecialized into different
//! deployment topologies — single node, gateway fan-out, Identity Server
//! as Key Manager, fully distributed — against a chosen relational
//! backend, by rewriting the on-disk XML/TOML configuration artifacts in
//! place.
//!
//! # Architecture
//!
//! ```text
//! deployment (layout recipes)
//!     │  ordered sequences of artifact mutations per node role
//!     ▼
//! artifact (one module per configuration file)
//!     │  parse → locate → mutate → serialize → write
//!     ▼
//! parser (document engines)
//!     ├── query:  path addresses over the XML tree
//!     ├── mutate: comment-preserving tree splices
//!     └── toml:   dotted-key merges over deployment.toml
//! ```
//!
//! Every XML change leaves a two-comment audit trail in the document —
//! the exact prior value plus a short `HYDROGENERATED:` description —
//! which is the product's only undo path. TOML changes log to a
//! `*.changes` side file instead.
//!
//! Addressing data (artifact paths, path queries, ports, dotted keys)
//! lives in [`maps::SchemaMap`], one immutable value per product
//! version, injected into every mutation function.
//!
//! # Example
//!
//! ```rust,ignore
//! use hydrogen::confs::LayoutConfs;
//! use hydrogen::deployment::multiple_gateway;
//! use hydrogen::maps::{ProductVersion, SchemaMap};
//!
//! let maps = SchemaMap::for_version(ProductVersion::V26);
//! let confs = LayoutConfs { offset: 1, ..LayoutConfs::default() };
//! multiple_gateway::configure_publish_multiple_gateway(
//!     &maps, working_dir, 2, &environments, &confs,
//! )?;
//! ```

pub mod artifact;
pub mod confs;
pub mod deployment;
pub mod maps;
pub mod parser;

#[cfg(test)]
pub(crate) mod fixtures;

pub use confs::{DatasourceConfs, DatasourceSet, DeploymentConfs, EnvironmentConfs, LayoutConfs};
pub use maps::{ProductVersion, SchemaMap};
