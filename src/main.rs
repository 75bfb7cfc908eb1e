use shamva_collector::{
    shared::{
        config::{AgentConfig, LoggingConfig},
        logging,
    },
    features::{
        delivery::HttpDeliveryClient,
        scheduling::{CycleRunner, Scheduler, TerminationSignals, TokioSleeper},
        system_metrics::SystemMetricsCollector,
    },
    AgentContext, AgentError, AsyncDataCollector,
};
use log::{error, info};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // The log level lives in the config file, so config errors are reported
    // through a default logger.
    let (path, config) = match AgentConfig::load() {
        Ok(loaded) => loaded,
        Err(e) => {
            logging::init(&LoggingConfig::default());
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    logging::init(&config.logging);
    logging::install_panic_hook();
    info!("Loaded configuration from {}", path.display());

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AgentConfig) -> Result<(), AgentError> {
    let ctx = AgentContext::new(config)?;
    let mut signals = TerminationSignals::register().map_err(AgentError::Signal)?;

    let collector = SystemMetricsCollector::new();
    collector.validate().await?;

    let client = HttpDeliveryClient::new(&ctx)?;
    let runner = CycleRunner::new(&ctx, collector, client, TokioSleeper);

    Scheduler::new(&ctx, runner)
        .run(async move {
            let signal = signals.recv().await;
            info!("Received {}, shutting down gracefully...", signal);
        })
        .await;

    Ok(())
}
