//! Export every user with access to one Salesforce object, and which object
//! permissions they hold, to a CSV file.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use log::info;

use sfdc_object_permissions::LogLevel;
use sfdc_object_permissions::auth::credentials::login;
use sfdc_object_permissions::cache::ContentCache;
use sfdc_object_permissions::config::Config;
use sfdc_object_permissions::permissions::export_object_permissions;
use sfdc_object_permissions::salesforce::client::SalesforceClient;

#[derive(Parser)]
#[command(name = "object-permissions")]
#[command(about = "Export users' object permissions for a Salesforce object to CSV")]
#[command(version)]
struct Cli {
    /// Environment name from the config file
    #[arg(short = 'e', long = "environment")]
    environment: String,

    /// The Salesforce object name
    #[arg(short = 'o', long = "objectName")]
    object_name: String,

    /// The CSV file to write
    #[arg(short = 'f', long = "file", value_name = "CSVFILE")]
    file: PathBuf,

    /// Overwrite any existing file
    #[arg(long)]
    force: bool,

    /// Path to config.json
    #[arg(long, env = "OBJECT_PERMISSIONS_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// Log every request
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::default()
    };
    env_logger::Builder::new()
        .filter_level(log_level.into())
        .parse_env(env_logger::Env::default())
        .init();

    let started = Instant::now();
    let result = run(&cli).await;
    info!("Total time: {:.3}s", started.elapsed().as_secs_f64());
    result
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = Config::load(&cli.config)?;
    let environment = config.environment(&cli.environment)?;

    info!("Logging in to {}", cli.environment);
    let session = login(&environment.auth_config())
        .await
        .with_context(|| format!("Failed to log in to {}", cli.environment))?;

    let client = SalesforceClient::new(
        &session.instance_url,
        &session.access_token,
        &environment.api_version,
    )?;
    let cache = ContentCache::from_config(&config.cache);
    info!("Using cache {}", cache.dir().display());

    let written =
        export_object_permissions(&client, &cache, &cli.object_name, &cli.file, cli.force).await?;
    info!("Wrote {} users to {}", written, cli.file.display());

    Ok(())
}
