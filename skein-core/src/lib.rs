//! skein core — the project call-graph pipeline.
//!
//! Feeds per-file graphs from `skein-graphs` through a two-phase build:
//! parallel per-file analysis (exports, imports, type discovery, call
//! resolution), then serial cross-file assembly into an immutable
//! [`project::ProjectSnapshot`] that answers [`call_graph::CallGraph`]
//! queries and supports incremental file updates.

pub mod analysis;
pub mod builder;
pub mod call_graph;
pub mod config;
pub mod error;
pub mod module_resolution;
pub mod project;
pub mod registry;

pub use analysis::{FileAnalysis, FunctionCall};
pub use builder::{CallGraphBuilder, CancelFlag, FileSource};
pub use call_graph::{CallEdge, CallEdgeKind, CallGraph, CallGraphOptions, CallNode};
pub use config::SkeinConfig;
pub use error::{Result, SkeinError};
pub use project::{DefinitionHost, FileState, ProjectSnapshot};
