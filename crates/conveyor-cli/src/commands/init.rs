use std::path::Path;

const CONVEYOR_TOML: &str = r#"[project]
# name = "hello-api"
# region = "us-east-1"

[function]
# name = "hello-api"
# source_dir = "."
# url = "https://<id>.lambda-url.us-east-1.on.aws/"

[build]
# compile = true
# target = "x86_64-unknown-linux-musl"
# output_dir = ".conveyor"
# exclude = []

[frontend]
# asset_dir = "frontend"
# bucket = "hello-api-site"

[cdn]
# distribution_id = "E2EXAMPLE12345"
"#;

const ENV_EXAMPLE: &str = r#"AWS_REGION=us-east-1
CONVEYOR_FUNCTION_NAME=hello-api
CONVEYOR_BUCKET=hello-api-site
CONVEYOR_DISTRIBUTION_ID=E2EXAMPLE12345
CONVEYOR_API_URL=https://<id>.lambda-url.us-east-1.on.aws/
"#;

const GITIGNORE_ENTRY: &str = ".conveyor/";

/// Initialize conveyor in an existing Rust project.
pub async fn init_project() -> anyhow::Result<()> {
    // Must be inside a Cargo project
    if !Path::new("Cargo.toml").exists() {
        anyhow::bail!("Cargo.toml not found. Run this command from a Rust project root.");
    }

    let mut created = Vec::new();

    for (file, content) in [
        (conveyor_core::config::CONFIG_FILE, CONVEYOR_TOML),
        (".env.example", ENV_EXAMPLE),
    ] {
        let path = Path::new(file);
        if path.exists() {
            eprintln!("{file} already exists, skipping");
        } else {
            std::fs::write(path, content)?;
            created.push(file);
        }
    }

    // Build output must not count as an uncommitted change
    if ignore_output_dir(Path::new(".gitignore"))? {
        created.push(".gitignore");
    }

    if created.is_empty() {
        println!("Nothing to create — already initialized.");
    } else {
        for f in &created {
            println!("Created {f}");
        }
    }

    println!();
    println!("Next steps:");
    println!();
    println!("  1. Fill in conveyor.toml (or copy .env.example to .env)");
    println!();
    println!("  2. Declare the infrastructure:");
    println!("     conveyor infra init");
    println!();
    println!("  3. Deploy:");
    println!("     conveyor deploy");

    Ok(())
}

/// Add the build output directory to `.gitignore`. Returns whether the file
/// changed.
fn ignore_output_dir(gitignore: &Path) -> std::io::Result<bool> {
    let existing = match std::fs::read_to_string(gitignore) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e),
    };

    if existing
        .lines()
        .any(|l| matches!(l.trim(), ".conveyor" | ".conveyor/" | "/.conveyor" | "/.conveyor/"))
    {
        return Ok(false);
    }

    let mut updated = existing;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(GITIGNORE_ENTRY);
    updated.push('\n');
    std::fs::write(gitignore, updated)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_config_parses_to_defaults() {
        let config: conveyor_core::ConveyorConfig = toml::from_str(CONVEYOR_TOML).unwrap();
        assert_eq!(config.project.region, "us-east-1");
        assert!(config.function.name.is_none());
        assert!(config.build.compile);
    }

    #[test]
    fn gitignore_entry_appended_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".gitignore");
        std::fs::write(&path, "/target").unwrap();

        assert!(ignore_output_dir(&path).unwrap());
        assert!(!ignore_output_dir(&path).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "/target\n.conveyor/\n");
    }

    #[test]
    fn gitignore_created_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".gitignore");

        assert!(ignore_output_dir(&path).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), ".conveyor/\n");
    }
}
