mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "conveyor",
    about = "Ship a Rust API to AWS Lambda and a static frontend to S3 + CloudFront"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add conveyor to an existing Rust project
    Init,
    /// Compile the handler and package the deployment archive
    Build,
    /// Build, publish the API, sync the frontend, invalidate the CDN
    Deploy {
        /// Publish a prebuilt archive instead of building
        #[arg(long)]
        artifact: Option<PathBuf>,
        /// Wait for the CloudFront invalidation to complete
        #[arg(long)]
        wait: bool,
        /// Call the API after deploying and check its response
        #[arg(long)]
        verify: bool,
        /// Allow deploying with uncommitted changes
        #[arg(long)]
        allow_dirty: bool,
    },
    /// Manage the Terraform declarations
    Infra {
        #[command(subcommand)]
        action: InfraAction,
    },
    /// Manage CI/CD pipeline
    Ci {
        #[command(subcommand)]
        action: CiAction,
    },
    /// Check AWS setup and readiness
    Doctor,
    /// Show function and distribution status
    Status,
    /// Stream Lambda logs
    Logs {
        /// Tail logs in real-time
        #[arg(long, short = 'f')]
        follow: bool,
    },
    /// Delete the local build output
    Clean,
}

#[derive(Subcommand)]
enum InfraAction {
    /// Write main.tf, variables.tf, outputs.tf and the variable file into infra/
    Init,
    /// Re-render the variable file from conveyor.toml
    Vars,
}

#[derive(Subcommand)]
enum CiAction {
    /// Write the GitHub Actions workflow (build, then deploy)
    Init,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        tracing::warn!(error = %e, "failed to load .env");
    }

    let cli = Cli::parse();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:?}");
            let source: &(dyn std::error::Error + 'static) = e.as_ref();
            if let Some(hint) = conveyor_cloud::FailureKind::of(source).hint() {
                eprintln!();
                eprintln!("hint: {hint}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Init => commands::init_project().await?,
        Commands::Build => commands::build().await?,
        Commands::Deploy {
            artifact,
            wait,
            verify,
            allow_dirty,
        } => {
            commands::deploy(commands::DeployOptions {
                artifact,
                allow_dirty,
                wait,
                verify,
            })
            .await?
        }
        Commands::Infra { action } => match action {
            InfraAction::Init => commands::infra_init().await?,
            InfraAction::Vars => commands::infra_vars().await?,
        },
        Commands::Ci { action } => match action {
            CiAction::Init => commands::ci_init().await?,
        },
        Commands::Doctor => commands::doctor().await?,
        Commands::Status => commands::status().await?,
        Commands::Logs { follow } => commands::logs(follow).await?,
        Commands::Clean => commands::clean().await?,
    }

    Ok(())
}
