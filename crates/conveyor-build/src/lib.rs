//! Deployment archive packaging and infrastructure rendering for conveyor.
//!
//! # Build stage
//!
//! ```text
//! conveyor build
//!   1. Discover  ── cargo metadata → handler binary name
//!   2. Compile   ── cargo build --release --target <triple>   ([build].compile)
//!   3. Collect   ── git ls-files (or a directory walk) → sorted file list
//!   4. Archive   ── zip, fixed timestamps, `bootstrap` entry → .conveyor/<function>.zip
//! ```
//!
//! # Archive contents
//!
//! - All tracked and untracked (non-ignored) files of the handler tree
//! - `target/`, `.git/`, `.conveyor/` and `[build].exclude` prefixes are left out
//! - The compiled handler, if any, as `bootstrap` with mode 0755
//!
//! # Infrastructure
//!
//! [`TerraformGenerator`] renders declarations that reference resource
//! names only through variables; [`infra::write_vars`] fills those
//! variables from the same configuration the pipeline reads.

pub mod archive;
pub mod assets;
pub mod compile;
pub mod infra;
pub mod terraform;

pub use archive::{ArchiveSpec, Artifact};
pub use terraform::TerraformGenerator;
