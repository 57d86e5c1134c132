//! The audit run.
//!
//! Postgres up, then (unless skipped) the introspector up, initialized,
//! importing and torn down, then the report, its output, and finally
//! Postgres down unless asked to leave it running.
//!
//! Nothing is cleaned up when a stage fails: containers are left in place for
//! inspection and are replaced by the next run.

use crate::cli::RunOptions;
use crate::container::RuntimeSession;
use crate::credentials;
use crate::output::{self, ReportPaths};
use crate::report::{Report, ReportPipeline};
use crate::services::{DatabaseService, SupportTable, ToolService};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Run the whole audit against the ambient container runtime.
///
/// Ctrl-C cancels the session, which interrupts whichever pull, health poll
/// or exec is in flight.
pub async fn run(options: &RunOptions, support: &SupportTable) -> Result<ReportPaths> {
    let session = RuntimeSession::open()
        .await
        .context("Failed to get docker client. Is it installed?")?;

    let cancel = session.cancellation().clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            cancel.cancel();
        }
    });

    let result = run_in(&session, options, support).await;
    interrupt.abort();
    result
}

async fn run_in(
    session: &Arc<RuntimeSession>,
    options: &RunOptions,
    support: &SupportTable,
) -> Result<ReportPaths> {
    let database = DatabaseService::start(session, &options.database, options.reuse_postgres)
        .await
        .context("Failed to start postgres")?;

    if options.skip_introspector {
        info!("Skipping import, using existing data");
    } else {
        let env = credentials::load_environment()
            .await
            .context("Failed to load AWS credentials")?;
        import(session, options, &database, &env, support).await?;
    }

    let report = ReportPipeline::default()
        .generate(&database.connection_string(&options.database.importer))
        .await
        .context("Failed to generate report")?;

    let paths = publish(&report, options)?;

    if options.leave_postgres {
        info!("Leaving postgres running at {}", database.address());
    } else {
        database
            .shut_down()
            .await
            .context("Failed to shut down postgres")?;
    }

    Ok(paths)
}

/// Start the introspector against `database`, import, and tear it down.
pub async fn import(
    session: &Arc<RuntimeSession>,
    options: &RunOptions,
    database: &DatabaseService,
    env: &[(String, String)],
    support: &SupportTable,
) -> Result<()> {
    let tool = ToolService::start(
        session,
        &options.introspector,
        database,
        options.pull_introspector,
        options.introspector_output,
    )
    .await
    .context("Failed to start introspector")?;

    tool.initialize()
        .await
        .context("Failed to init introspector")?;

    let spec = support.service_spec();
    info!("Running introspector with service spec {}", spec);
    info!("Introspector run may take a few minutes");
    tool.run_import(env, &spec)
        .await
        .context("Introspector import failed")?;

    tool.shut_down()
        .await
        .context("Failed to shut down introspector")?;
    Ok(())
}

/// Print the report if asked, then write its files.
pub fn publish(report: &Report, options: &RunOptions) -> Result<ReportPaths> {
    if options.print_to_stdout {
        output::print_rows(report).context("Failed to print report")?;
    }
    output::write_reports(report, &options.output_dir).context("Failed to write reports")
}
