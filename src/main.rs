use anyhow::Result;
use clap::Parser;
use rpcheckup::cli::{Args, ConfigDiscovery};
use rpcheckup::orchestrator;
use rpcheckup::services::SupportTable;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = ConfigDiscovery::load(args.config.as_deref())?;
    let options = args.resolve(config);

    info!("Starting rpCheckup");
    let paths = orchestrator::run(&options, &SupportTable::default()).await?;
    info!("HTML report: {}", paths.html.display());
    info!("CSV report: {}", paths.csv.display());
    Ok(())
}
