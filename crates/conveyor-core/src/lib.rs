//! Core types and configuration for conveyor.
//!
//! This crate defines the `conveyor.toml` schema ([`ConveyorConfig`]),
//! the provisioning inputs shared by the pipeline and the Terraform
//! declarations ([`ResourceNames`], [`DeployTarget`]), handler crate
//! discovery ([`HandlerCrate`]), and shared error types.

pub mod assets;
pub mod cargo;
pub mod config;
pub mod error;
pub mod resources;

pub use assets::{LocalAsset, sha256_hex};
pub use cargo::{BinaryTarget, HandlerCrate};
pub use config::{
    BuildConfig, CdnConfig, ConveyorConfig, FrontendConfig, FunctionConfig, ProjectConfig,
};
pub use error::{Error, Result};
pub use resources::{DeployTarget, ResourceNames};
