// cogload-monitor: run the pipeline against a sample source and watch
// classification events from a terminal. Development harness; production
// deployments embed the library behind their own service surface.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use cogload::ingest::mock::{MockHeadband, MockProfile};
use cogload::{AppConfig, PipelineEngine, ThresholdModel};

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("cogload-monitor error: {err:?}");
            ExitCode::from(1)
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "cogload-monitor", about = "Cognitive load pipeline monitor CLI")]
struct Cli {
    /// Path to a JSON config file (defaults used when absent)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a trained decision-model artifact (JSON)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Synthetic signal profile for the mock headband
    #[arg(long, value_enum, default_value_t = Profile::Calm)]
    profile: Profile,

    /// Start persisting events immediately
    #[arg(long)]
    record: bool,

    /// How long to run before shutting down (seconds; 0 = until Ctrl-C)
    #[arg(long, default_value_t = 0)]
    duration_secs: u64,

    /// Bind address for the debug HTTP server (requires debug_http feature)
    #[cfg(feature = "debug_http")]
    #[arg(long, default_value = "127.0.0.1:8787")]
    http_addr: String,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Profile {
    Calm,
    Focused,
    Stressed,
}

impl From<Profile> for MockProfile {
    fn from(profile: Profile) -> Self {
        match profile {
            Profile::Calm => MockProfile::Calm,
            Profile::Focused => MockProfile::Focused,
            Profile::Stressed => MockProfile::Stressed,
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::default(),
    };

    let model = match &cli.model {
        Some(path) => ThresholdModel::load_from_file(path)
            .with_context(|| format!("loading model artifact {:?}", path))?,
        None => ThresholdModel {
            ci_alpha_threshold: 10.0,
        },
    };

    let source = Arc::new(MockHeadband::new(cli.profile.into()));
    let engine = PipelineEngine::new(config, source, Arc::new(model))
        .context("initializing pipeline engine")?;
    let handle = engine.handle();

    if cli.record {
        handle.start_recording().context("starting recording")?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    runtime.block_on(async move {
        let mut events = handle.subscribe_events();
        let printer = tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                println!(
                    "{}  CI_Alpha {:>7.2}  {}  confidence {:.2}",
                    event.timestamp.to_rfc3339(),
                    event.ci_alpha,
                    event.label.as_str(),
                    event.confidence
                );
            }
        });

        #[cfg(feature = "debug_http")]
        {
            let addr: std::net::SocketAddr = cli
                .http_addr
                .parse()
                .context("parsing debug HTTP bind address")?;
            let http_handle = handle.clone();
            tokio::spawn(async move {
                if let Err(err) = cogload::http::run_http_server(http_handle, addr).await {
                    log::error!("[Http] debug server stopped: {}", err);
                }
            });
        }

        let engine_task = tokio::spawn(engine.run());

        if cli.duration_secs > 0 {
            tokio::time::sleep(Duration::from_secs(cli.duration_secs)).await;
        } else {
            tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
        }

        handle.shutdown();
        engine_task
            .await
            .context("joining evaluator task")?
            .context("evaluator failed")?;
        printer.abort();
        Ok(())
    })
}
