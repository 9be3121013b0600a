use std::path::Path;
use std::process::Stdio;

pub(super) const WORKFLOW_PATH: &str = ".github/workflows/conveyor.yml";

/// GitHub Actions secret the workflow assumes an IAM role with.
const ROLE_SECRET: &str = "AWS_DEPLOY_ROLE_ARN";

/// Write the GitHub Actions workflow: a `build` job producing the archive
/// and a `deploy` job publishing it.
pub async fn ci_init() -> anyhow::Result<()> {
    let workflow_path = Path::new(WORKFLOW_PATH);
    if workflow_path.exists() {
        anyhow::bail!(
            "Workflow already exists at {WORKFLOW_PATH} — edit it directly, or delete it to re-run ci init"
        );
    }

    let config = super::load_config(Path::new("."))?;
    let function_name = super::require_function_name(&config)?;
    let artifact = super::artifact_path(&config, function_name);
    let artifact = artifact.to_string_lossy().replace('\\', "/");

    if let Some(parent) = workflow_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(
        workflow_path,
        generate_workflow_yaml(&artifact, &config.build.target),
    )?;
    println!("Generated: {WORKFLOW_PATH}");

    println!();
    println!("Next steps:");
    println!();
    match detect_github_repo().await {
        Ok(repo) => {
            println!("  1. Store the deploy role for {repo}:");
            println!("     gh secret set {ROLE_SECRET} --repo {repo}");
        }
        Err(e) => {
            tracing::debug!(error = %e, "github remote not detected");
            println!("  1. Add the repository secret {ROLE_SECRET} (IAM role trusted for GitHub OIDC)");
        }
    }
    println!();
    println!("  2. Push to main -> build, then deploy.");

    Ok(())
}

/// Detect the GitHub owner/repo from the git remote origin URL.
async fn detect_github_repo() -> anyhow::Result<String> {
    let output = tokio::process::Command::new("git")
        .args(["remote", "get-url", "origin"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        anyhow::bail!("No git remote 'origin' found");
    }

    let url = String::from_utf8(output.stdout)?.trim().to_owned();
    parse_github_repo(&url)
        .ok_or_else(|| anyhow::anyhow!("Remote '{url}' is not a GitHub repository"))
}

/// Parse "owner/repo" from SSH and HTTPS GitHub URLs.
fn parse_github_repo(url: &str) -> Option<String> {
    let rest = url
        .strip_prefix("git@github.com:")
        .or_else(|| url.strip_prefix("https://github.com/"))
        .or_else(|| url.strip_prefix("http://github.com/"))?;
    let rest = rest.strip_suffix('/').unwrap_or(rest);
    let repo = rest.strip_suffix(".git").unwrap_or(rest);
    (!repo.is_empty()).then(|| repo.to_owned())
}

/// Generate the GitHub Actions workflow yaml content.
fn generate_workflow_yaml(artifact: &str, target: &str) -> String {
    format!(
        r#"# Generated by: conveyor ci init
name: Deploy

on:
  push:
    branches: [main]

env:
  CARGO_TERM_COLOR: always
  CONVEYOR_REGION: ${{{{ vars.AWS_REGION }}}}

jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4

      - name: Install Rust
        uses: dtolnay/rust-toolchain@stable
        with:
          targets: {target}

      - name: Install musl tools
        run: sudo apt-get update && sudo apt-get install -y musl-tools

      - name: Cache conveyor binary
        uses: actions/cache@v4
        with:
          path: ~/.cargo/bin/conveyor
          key: conveyor-cli-${{{{ hashFiles('Cargo.lock') }}}}

      - name: Install conveyor
        run: |
          if ! command -v conveyor &> /dev/null; then
            cargo install conveyor-cli
          fi

      - name: Build
        run: conveyor build

      - uses: actions/upload-artifact@v4
        with:
          name: lambda-archive
          path: {artifact}
          if-no-files-found: error

  deploy:
    needs: build
    runs-on: ubuntu-latest
    permissions:
      contents: read
      id-token: write
    concurrency: deploy

    steps:
      - uses: actions/checkout@v4

      - uses: actions/download-artifact@v4
        with:
          name: lambda-archive
          path: {artifact_dir}

      - uses: aws-actions/configure-aws-credentials@v4
        with:
          role-to-assume: ${{{{ secrets.{ROLE_SECRET} }}}}
          aws-region: ${{{{ vars.AWS_REGION }}}}

      - name: Install Rust
        uses: dtolnay/rust-toolchain@stable

      - name: Cache conveyor binary
        uses: actions/cache@v4
        with:
          path: ~/.cargo/bin/conveyor
          key: conveyor-cli-${{{{ hashFiles('Cargo.lock') }}}}

      - name: Install conveyor
        run: |
          if ! command -v conveyor &> /dev/null; then
            cargo install conveyor-cli
          fi

      - name: Deploy
        run: conveyor deploy --artifact {artifact} --wait
"#,
        artifact_dir = artifact.rsplit_once('/').map_or(".", |(dir, _)| dir),
    )
}
