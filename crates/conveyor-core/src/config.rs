use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Name of the configuration file looked up in the project directory.
pub const CONFIG_FILE: &str = "conveyor.toml";

/// conveyor.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConveyorConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub function: FunctionConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub frontend: FrontendConfig,
    #[serde(default)]
    pub cdn: CdnConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name, used for tagging and as the function name fallback
    pub name: Option<String>,
    /// AWS region every resource lives in (defaults to us-east-1)
    #[serde(default = "default_region")]
    pub region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionConfig {
    /// Lambda function name
    pub name: Option<String>,
    /// Handler crate directory, relative to the project directory
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,
    /// Public URL of the deployed API, probed by `deploy --verify`
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Compile the handler and ship it as `bootstrap` inside the archive
    #[serde(default = "default_compile")]
    pub compile: bool,
    /// Target triple for the compiled handler
    #[serde(default = "default_target")]
    pub target: String,
    /// Directory receiving the deployment archive
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Extra path prefixes left out of the archive
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendConfig {
    /// Static asset directory mirrored to the bucket
    #[serde(default = "default_asset_dir")]
    pub asset_dir: PathBuf,
    /// S3 bucket name
    pub bucket: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CdnConfig {
    /// CloudFront distribution id (a Terraform output)
    pub distribution_id: Option<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: None,
            region: default_region(),
        }
    }
}

impl Default for FunctionConfig {
    fn default() -> Self {
        Self {
            name: None,
            source_dir: default_source_dir(),
            url: None,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            compile: default_compile(),
            target: default_target(),
            output_dir: default_output_dir(),
            exclude: Vec::new(),
        }
    }
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            asset_dir: default_asset_dir(),
            bucket: None,
        }
    }
}

impl ConveyorConfig {
    /// Load from conveyor.toml at the given path, or return defaults if not found.
    pub fn load(project_dir: &Path) -> crate::Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE);
        if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                    path: config_path.clone(),
                    source: e,
                })?;
            toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
                path: config_path,
                source: e,
            })
        } else {
            tracing::debug!(path = %config_path.display(), "no config file; using defaults");
            Ok(Self::default())
        }
    }

    /// Load conveyor.toml, then apply overrides from the process environment.
    pub fn load_with_env(project_dir: &Path) -> crate::Result<Self> {
        let mut config = Self::load(project_dir)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override file values with environment values.
    ///
    /// Empty values are ignored. For the region, `CONVEYOR_REGION` wins over
    /// `AWS_REGION`, which wins over `AWS_DEFAULT_REGION`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(region) = ["CONVEYOR_REGION", "AWS_REGION", "AWS_DEFAULT_REGION"]
            .iter()
            .find_map(|k| get(*k))
        {
            self.project.region = region;
        }
        if let Some(name) = get("CONVEYOR_FUNCTION_NAME") {
            self.function.name = Some(name);
        }
        if let Some(url) = get("CONVEYOR_API_URL") {
            self.function.url = Some(url);
        }
        if let Some(bucket) = get("CONVEYOR_BUCKET") {
            self.frontend.bucket = Some(bucket);
        }
        if let Some(id) = get("CONVEYOR_DISTRIBUTION_ID") {
            self.cdn.distribution_id = Some(id);
        }
    }

    /// Function name: `[function].name`, falling back to `[project].name`.
    pub fn function_name(&self) -> Option<&str> {
        self.function
            .name
            .as_deref()
            .or(self.project.name.as_deref())
    }
}

fn default_region() -> String {
    "us-east-1".to_owned()
}

fn default_source_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_compile() -> bool {
    true
}

fn default_target() -> String {
    "x86_64-unknown-linux-musl".to_owned()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".conveyor")
}

fn default_asset_dir() -> PathBuf {
    PathBuf::from("frontend")
}
