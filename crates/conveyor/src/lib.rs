//! Ship a Rust API to AWS Lambda and a static frontend to S3 + CloudFront.
//!
//! This is the unified facade crate that re-exports all conveyor sub-crates.
//! Use feature flags to control which components are included.
//!
//! # Feature flags
//!
//! | Feature | Default | Crate | Description |
//! |---------|---------|-------|-------------|
//! | `core` | yes | [`conveyor-core`](https://crates.io/crates/conveyor-core) | Configuration, resource names, asset digests |
//! | `build` | yes | [`conveyor-build`](https://crates.io/crates/conveyor-build) | Archive packaging and Terraform rendering |
//! | `cloud` | yes | [`conveyor-cloud`](https://crates.io/crates/conveyor-cloud) | Lambda, S3 and CloudFront operations |
//! | `api` | no | `hello-api` | The single-route Axum API |
//!
//! # Quick start
//!
//! ```toml
//! [dependencies]
//! conveyor = "0.3"
//! ```
//!
//! ```rust,no_run
//! use std::path::Path;
//! use conveyor::{ConveyorConfig, ResourceNames};
//! use conveyor::build::TerraformGenerator;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConveyorConfig::load_with_env(Path::new("."))?;
//! let names = ResourceNames::from_config(&config)?;
//! let generator = TerraformGenerator::new(
//!     &names,
//!     "storefront",
//!     "../.conveyor/hello-api.zip",
//!     &config.build.target,
//! );
//! let tfvars = generator.render_tfvars()?;
//! # Ok(())
//! # }
//! ```

// Core types flattened into root namespace for convenience.
#[cfg(feature = "core")]
pub use conveyor_core::*;

/// Archive packaging, asset scanning and Terraform rendering.
///
/// See [`conveyor-build`](https://crates.io/crates/conveyor-build) for details.
#[cfg(feature = "build")]
pub mod build {
    pub use conveyor_build::*;
}

/// Lambda, S3 and CloudFront operations through the AWS CLI.
///
/// See [`conveyor-cloud`](https://crates.io/crates/conveyor-cloud) for details.
#[cfg(feature = "cloud")]
pub mod cloud {
    pub use conveyor_cloud::*;
}

/// The API served from Lambda.
///
/// **Requires** the `api` feature flag (not enabled by default).
#[cfg(feature = "api")]
pub mod api {
    pub use hello_api::*;
}
