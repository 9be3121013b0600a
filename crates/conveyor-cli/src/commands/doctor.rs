use conveyor_cloud::{AwsClient, CheckResult};
use conveyor_core::ConveyorConfig;
use conveyor_core::config::CONFIG_FILE;
use std::path::Path;

pub async fn doctor() -> anyhow::Result<()> {
    let project_dir = Path::new(".");
    // Diagnostics must run even when conveyor.toml is missing or invalid
    let (config, config_check) = match ConveyorConfig::load_with_env(project_dir) {
        Ok(config) if project_dir.join(CONFIG_FILE).exists() => (config, CheckResult::ok("Found")),
        Ok(config) => (config, CheckResult::fail("Not found — run: conveyor init")),
        Err(e) => (ConveyorConfig::default(), CheckResult::fail(&e.to_string())),
    };

    let client = AwsClient::new();
    let mut report = client.doctor(&config).await;
    report.config_file = config_check;

    println!();
    println!("{report}");

    if !report.all_passed() {
        anyhow::bail!("some checks failed — see above for details");
    }

    Ok(())
}
