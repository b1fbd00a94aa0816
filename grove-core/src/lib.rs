//! Core library that grows a family tree into a 3-D branching mesh.
//!
//! Main components:
//! - [`genealogy`] — person records, validation, and the immutable tree.
//! - [`prominence`] — biography-driven visual parameters.
//! - [`growth`] — deterministic growth of the branch skeleton.
//! - [`skeleton`] — branch segments, joints and chains.
//! - [`spline`] — smooth center curves and transported frames.
//! - [`tessellation`] — tubes, joint bridges, caps and tips.
//! - [`mesh`] — GPU-ready vertices and the mesh builder.
//! - [`normal_buffer`] — per-vertex normal accumulation.
//! - [`picking`] — capsule BVH for ray picking.
//! - [`scene`] — the full pipeline and the host-owned state.
//! - [`config`] — tunables for every stage.
//! - [`error`] — load and config errors.
//! - [`seed`] — stable hashing and per-person random streams.
//! - [`types`] — shared type aliases and IDs.

pub mod config;
pub mod error;
pub mod genealogy;
pub mod growth;
pub mod mesh;
pub mod normal_buffer;
pub mod picking;
pub mod prominence;
pub mod scene;
pub mod seed;
pub mod skeleton;
pub mod spline;
pub mod tessellation;
pub mod types;

pub use config::Config;
pub use error::{ConfigError, LoadError, StructuralError};
pub use genealogy::{Genealogy, GenealogyDocument, Person, PersonInfo};
pub use scene::{Grove, Snapshot};
