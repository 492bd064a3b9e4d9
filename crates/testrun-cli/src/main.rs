//! TestRun CLI.
//!
//! `testrun run` starts a log server, launches a test harness pointed at it
//! and exits with the verdict the harness reports. `testrun relay` forwards
//! TAP output from stdin to a running log server.

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use clap::{Parser, Subcommand};
use testrun_core::{EventKind, Platform, RunEvent, TapSummary};
use testrun_log_server::{log_server_with_config, LogServerConfig};
use testrun_reporter::{HttpTransport, TapReporter};
use testrun_runner::tasks::CommandSpec;
use testrun_runner::{BoxError, Runner, RunnerConfig, TaskDescriptor};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Placeholder replaced by the log server port in harness arguments.
const PORT_PLACEHOLDER: &str = "{port}";

/// Environment variable carrying the log server port to the harness.
const PORT_ENV: &str = "TESTRUN_LOG_PORT";

/// Run test harnesses and collect their TAP results.
#[derive(Parser, Debug)]
#[command(name = "testrun", about = "Run test harnesses and collect their TAP results")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start a log server, launch a harness and wait for its verdict
    Run {
        /// Log server bind address
        #[arg(long, default_value = "0.0.0.0:0")]
        bind: String,

        /// Do not echo received log lines
        #[arg(long)]
        quiet: bool,

        /// Harness command; `{port}` is replaced by the log server port
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Forward TAP lines read from stdin to a log server
    Relay {
        /// Log server port
        #[arg(long)]
        port: u16,

        /// Log server host
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Platform tag attached to every line
        #[arg(long, default_value = "node")]
        platform: Platform,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Diagnostics go to stderr; stdout carries the echoed TAP stream.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            bind,
            quiet,
            command,
        } => run(bind, quiet, command).await,
        Commands::Relay {
            port,
            host,
            platform,
        } => relay(&host, port, platform).await,
    }
}

/// Build the harness command for a known log server port.
fn harness_spec(command: &[String], port: u16) -> Option<CommandSpec> {
    let (program, args) = command.split_first()?;
    let port = port.to_string();
    Some(
        CommandSpec::new(program.clone())
            .with_args(args.iter().map(|arg| arg.replace(PORT_PLACEHOLDER, &port)))
            .with_env(PORT_ENV, port),
    )
}

async fn run(
    bind: String,
    quiet: bool,
    command: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let port = Arc::new(AtomicU16::new(0));
    let summary = Arc::new(Mutex::new(TapSummary::default()));

    let launch = {
        let port = port.clone();
        TaskDescriptor::named(
            "launchHarness",
            move |_, _| {
                let spec = harness_spec(&command, port.load(Ordering::SeqCst));
                async move {
                    let spec = spec.ok_or("missing harness command")?;
                    spec.execute().await?;
                    Ok::<(), BoxError>(())
                }
            },
            Vec::new(),
        )
    };

    let runner = Runner::new(RunnerConfig::new(vec![
        log_server_with_config(LogServerConfig {
            bind_addr: bind,
            echo_to_console: !quiet,
        }),
        launch,
    ]));

    runner.on(EventKind::LogStart, move |event| {
        if let RunEvent::LogStart { port: bound } = event {
            port.store(*bound, Ordering::SeqCst);
        }
    });
    let tally = summary.clone();
    runner.on(EventKind::LogData, move |event| {
        if let RunEvent::LogData { line, .. } = event {
            tally
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .observe(line);
        }
    });

    info!(run_id = %runner.run_id(), "Starting test run");
    let result = runner.run().await;

    let summary = summary.lock().unwrap_or_else(PoisonError::into_inner).clone();
    info!(%summary, "Test run finished");

    match &result {
        Ok(()) => {}
        Err(e) if e.run_failure().is_some() => error!(error = %e, "Harness reported failures"),
        Err(e) => error!(error = %e, "Test run failed"),
    }
    Ok(result?)
}

async fn relay(
    host: &str,
    port: u16,
    platform: Platform,
) -> Result<(), Box<dyn std::error::Error>> {
    let transport = HttpTransport::with_host(host, port);
    info!(url = %transport.url(), platform = %platform, "Relaying stdin to log server");
    let reporter = TapReporter::new(transport, platform);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut forwarded = 0u64;
    while let Some(line) = lines.next_line().await? {
        reporter.log(&line).await;
        forwarded += 1;
    }

    info!(forwarded, "Input closed");
    Ok(())
}
