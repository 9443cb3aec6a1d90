use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use backend_output_fetcher::cli::{self, Cli, Commands, FetchArgs, ShowArgs};
use backend_output_fetcher::cloudformation::CloudFormationProvider;
use backend_output_fetcher::config::{self, ConfigEntry};
use backend_output_fetcher::{writer, BackendOutputResolver, Error};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Fetch(args) => fetch(args).await,
        Commands::Show(args) => show(args).await,
    };

    if let Err(error) = result {
        eprintln!("Error: {:#}", error);
        if let Some(error) = error.downcast_ref::<Error>() {
            eprintln!("Resolution: {}", cli::remediation(error));
        }
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn show(args: ShowArgs) -> Result<()> {
    let handle = args
        .stack_handle()
        .ok_or_else(|| anyhow!("Provide either --stack-name or --namespace, --name and --deployment-type"))?;

    let provider = CloudFormationProvider::new(args.region.as_deref()).await;
    let resolver = BackendOutputResolver::new(Arc::new(provider));

    let backend_output = resolver.resolve(&handle).await?;
    println!("{}", writer::to_json(&backend_output)?);

    return Ok(());
}

async fn fetch(args: FetchArgs) -> Result<()> {
    let config = config::parse(&args.config)
        .with_context(|| format!("Unable to load {}", args.config.display()))?;

    let results = futures::future::join_all(config.iter().map(fetch_entry)).await;

    let mut failures = 0;
    for (config_entry, result) in config.iter().zip(results) {
        if let Err(error) = result {
            failures += 1;
            eprintln!("Error: {:#}", error);
            if let Some(error) = error.downcast_ref::<Error>() {
                eprintln!("Resolution: {}", cli::remediation(error));
            }
            tracing::error!(json = %config_entry.json.location.display(), "backend output was not written");
        }
    }

    if failures > 0 {
        return Err(anyhow!("{} of {} backends failed", failures, config.len()));
    }

    return Ok(());
}

async fn fetch_entry(config_entry: &ConfigEntry) -> Result<()> {
    let handle = config_entry
        .stack_handle()
        .ok_or_else(|| anyhow!("Config entry has no stack reference"))?;

    let provider = CloudFormationProvider::new(config_entry.region.as_deref()).await;
    let resolver = BackendOutputResolver::new(Arc::new(provider));

    let backend_output = resolver.resolve(&handle).await?;
    tracing::info!(stack = %handle, groups = backend_output.len(), "resolved backend output");

    writer::write(config_entry, &backend_output)
        .with_context(|| format!("Unable to write outputs of {}", handle))?;

    return Ok(());
}
