use anyhow::Context;
use clap::Parser;
use idlesweep::memory::{MemoryConnection, MemoryExecutionContext, MemoryTransactionManager};
use idlesweep::{
    ChannelNotificationSink, DataSourceInfo, IdleReaper, PendingTerminations, ProgressMonitor,
    SweepConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Run simulated idle-transaction sweeps against in-memory connections
#[derive(Parser, Debug)]
#[command(name = "idlesweep", version, about)]
struct Args {
    /// Data source id
    #[arg(long, default_value = "ds-1")]
    resource: String,

    /// Data source display name
    #[arg(long, default_value = "Local")]
    name: String,

    /// Number of execution contexts holding an idle transaction
    #[arg(long, default_value_t = 3)]
    contexts: usize,

    /// 1-based indexes of contexts whose rollback fails
    #[arg(long, value_delimiter = ',')]
    fail: Vec<usize>,

    /// Number of sweeps submitted at once for the same data source
    #[arg(long, default_value_t = 1)]
    concurrent: usize,

    /// Simulated rollback latency in milliseconds
    #[arg(long, default_value_t = 50)]
    latency_ms: u64,

    /// JSON sweep configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

async fn build_pending(args: &Args) -> anyhow::Result<PendingTerminations> {
    let mut pending = PendingTerminations::new();
    for index in 1..=args.contexts {
        let connection = Arc::new(MemoryConnection::new(index as u64));
        connection.begin().await?;

        let context = MemoryExecutionContext::new(
            &format!("{}-ctx-{}", args.resource, index),
            args.resource.as_str(),
            Arc::clone(&connection),
        );
        let manager = MemoryTransactionManager::new(connection)
            .with_delay(Duration::from_millis(args.latency_ms));
        if args.fail.contains(&index) {
            manager.fail_with("simulated connection fault");
        }

        pending.push(Arc::new(context), Arc::new(manager));
    }
    Ok(pending)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            let json = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            SweepConfig::from_json(&json)?
        }
        None => SweepConfig::default(),
    };

    let (sink, mut notifications) = ChannelNotificationSink::channel();
    let reaper = IdleReaper::with_config(config, Arc::new(sink))?;

    // Ctrl-C cancels every sweep; rollbacks already started still finish
    let monitor = ProgressMonitor::new();
    let interrupt = monitor.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let mut handles = Vec::with_capacity(args.concurrent);
    for _ in 0..args.concurrent.max(1) {
        let pending = build_pending(&args).await?;
        handles.push(reaper.submit(
            DataSourceInfo::new(args.resource.as_str(), &args.name),
            pending,
            monitor.child(),
        ));
    }

    for handle in handles {
        let report = handle.await??;
        println!("{}", report);
        for failure in report.failures() {
            if let Some(err) = failure.error() {
                println!("  {}: {}", failure.context(), err);
            }
        }
    }

    drop(reaper);
    while let Some(notification) = notifications.recv().await {
        println!(
            "[{}] {} {}: {}",
            notification.created_at.format("%H:%M:%S"),
            notification.severity,
            notification.resource,
            notification.message
        );
    }

    Ok(())
}
