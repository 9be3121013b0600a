//! Provisioning inputs shared by the pipeline and the Terraform variables.
//!
//! Both consumers read names from [`ResourceNames`], so a function or
//! bucket name is written down exactly once: in `conveyor.toml` or the
//! environment.

use serde::Serialize;

use crate::ConveyorConfig;

/// Names of the resources the provisioning tool owns.
///
/// Field names match the Terraform variable names, so serializing this
/// struct produces a valid `*.tfvars.json` body.
///
/// # Examples
///
/// ```
/// use conveyor_core::{ConveyorConfig, ResourceNames};
///
/// let mut config = ConveyorConfig::default();
/// config.function.name = Some("hello-api".to_owned());
/// config.frontend.bucket = Some("hello-frontend".to_owned());
///
/// let names = ResourceNames::from_config(&config).unwrap();
/// assert_eq!(names.region, "us-east-1");
/// assert_eq!(names.function_name, "hello-api");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceNames {
    pub region: String,
    pub function_name: String,
    pub bucket_name: String,
}

/// Everything the deploy stages address: the provisioning inputs plus the
/// distribution id the provisioning tool reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployTarget {
    pub names: ResourceNames,
    pub distribution_id: String,
}

impl ResourceNames {
    /// Resolve and validate names from configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingSetting`](crate::Error::MissingSetting) if the function or bucket is unset
    /// - [`Error::InvalidResourceName`](crate::Error::InvalidResourceName) if a name breaks AWS naming rules
    pub fn from_config(config: &ConveyorConfig) -> crate::Result<Self> {
        let function_name = config
            .function_name()
            .ok_or(crate::Error::MissingSetting {
                key: "[function].name",
                env: "CONVEYOR_FUNCTION_NAME",
            })?;
        let bucket_name = config
            .frontend
            .bucket
            .as_deref()
            .ok_or(crate::Error::MissingSetting {
                key: "[frontend].bucket",
                env: "CONVEYOR_BUCKET",
            })?;

        validate_region(&config.project.region)?;
        validate_function_name(function_name)?;
        validate_bucket_name(bucket_name)?;

        Ok(Self {
            region: config.project.region.clone(),
            function_name: function_name.to_owned(),
            bucket_name: bucket_name.to_owned(),
        })
    }
}

impl DeployTarget {
    pub fn from_config(config: &ConveyorConfig) -> crate::Result<Self> {
        let names = ResourceNames::from_config(config)?;
        let distribution_id = config
            .cdn
            .distribution_id
            .as_deref()
            .ok_or(crate::Error::MissingSetting {
                key: "[cdn].distribution_id",
                env: "CONVEYOR_DISTRIBUTION_ID",
            })?;
        validate_distribution_id(distribution_id)?;

        Ok(Self {
            names,
            distribution_id: distribution_id.to_owned(),
        })
    }
}

fn invalid(kind: &'static str, name: &str, reason: &'static str) -> crate::Error {
    crate::Error::InvalidResourceName {
        kind,
        name: name.to_owned(),
        reason,
    }
}

/// Lambda: 1-64 characters of letters, digits, hyphens, underscores.
pub fn validate_function_name(name: &str) -> crate::Result<()> {
    const KIND: &str = "function name";
    if name.is_empty() || name.len() > 64 {
        return Err(invalid(KIND, name, "must be 1-64 characters"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(invalid(
            KIND,
            name,
            "only letters, digits, hyphens and underscores are allowed",
        ));
    }
    Ok(())
}

/// S3 general purpose bucket rules.
pub fn validate_bucket_name(name: &str) -> crate::Result<()> {
    const KIND: &str = "bucket name";
    if name.len() < 3 || name.len() > 63 {
        return Err(invalid(KIND, name, "must be 3-63 characters"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(invalid(
            KIND,
            name,
            "only lowercase letters, digits, hyphens and dots are allowed",
        ));
    }
    let first_last_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    if !first_last_ok(name.chars().next()) || !first_last_ok(name.chars().last()) {
        return Err(invalid(KIND, name, "must begin and end with a letter or digit"));
    }
    if name.contains("..") {
        return Err(invalid(KIND, name, "must not contain two adjacent dots"));
    }
    if name.split('.').count() == 4 && name.split('.').all(|p| p.parse::<u8>().is_ok()) {
        return Err(invalid(KIND, name, "must not be formatted as an IP address"));
    }
    Ok(())
}

/// AWS region codes look like `us-east-1` or `ap-southeast-2`.
pub fn validate_region(region: &str) -> crate::Result<()> {
    let parts: Vec<&str> = region.split('-').collect();
    let well_formed = parts.len() >= 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()))
        && parts
            .last()
            .is_some_and(|p| p.chars().all(|c| c.is_ascii_digit()));
    if well_formed {
        Ok(())
    } else {
        Err(invalid("region", region, "expected a region code like us-east-1"))
    }
}

/// CloudFront ids are uppercase alphanumerics.
pub fn validate_distribution_id(id: &str) -> crate::Result<()> {
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(invalid(
            "distribution id",
            id,
            "expected uppercase letters and digits, e.g. E2QWRUHAPOMQZL",
        ))
    }
}
