use crate::controller::{run_controller, LifecyclePhase, UiCommand};
use crate::model::{ClientConfig, ClientEvent, RunIdentifier, RunResults, DEFAULT_CATEGORY};
use crate::service::JobServiceClient;
use crate::text_summary::{build_report, build_text_summary, report_categories};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "arbitrage-watch",
    version,
    about = "Start, watch and browse arbitrage analysis runs"
)]
pub struct Cli {
    /// Base URL of the job service (the API lives under /api)
    #[arg(long, default_value = "http://localhost:214")]
    pub base_url: String,

    /// Model provider passed to the job service when starting a run
    #[arg(long, default_value = "openai")]
    pub model: String,

    /// Opportunity category to show first (Real, Value, Logic)
    #[arg(long, default_value = DEFAULT_CATEGORY)]
    pub category: String,

    /// Show every category in --show/--run output instead of only --category
    #[arg(long)]
    pub all_categories: bool,

    /// Status poll interval
    #[arg(long, default_value = "2s")]
    pub poll_interval: humantime::Duration,

    /// How long "Complete!" stays on screen before results are loaded
    #[arg(long, default_value = "1s")]
    pub completion_delay: humantime::Duration,

    /// Duration of the per-card refresh placeholder
    #[arg(long, default_value = "1s")]
    pub refresh_delay: humantime::Duration,

    /// Per-request timeout for job service calls
    #[arg(long, default_value = "10s")]
    pub timeout: humantime::Duration,

    /// Print known run identifiers and exit (no TUI)
    #[arg(long, conflicts_with_all = ["show", "run"])]
    pub list: bool,

    /// Print the opportunities of one run and exit (no TUI)
    #[arg(long, value_name = "RUN", conflicts_with = "run")]
    pub show: Option<String>,

    /// Start a run, stream its progress to stderr and print its opportunities (no TUI)
    #[arg(long)]
    pub run: bool,

    /// Print JSON instead of text for --list, --show and --run
    #[arg(long)]
    pub json: bool,

    /// Write the loaded result set as JSON (--show and --run)
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Directory for exports made from the TUI (defaults to the download directory)
    #[arg(long)]
    pub export_dir: Option<PathBuf>,

    /// Log file (defaults to the cache directory in TUI mode, stderr otherwise)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn is_headless(&self) -> bool {
        self.list || self.show.is_some() || self.run
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if args.json && !args.is_headless() {
        return Err(anyhow::anyhow!(
            "--json needs one of --list, --show or --run."
        ));
    }
    if args.export_json.is_some() && !(args.show.is_some() || args.run) {
        return Err(anyhow::anyhow!(
            "--export-json can only be used with --show or --run."
        ));
    }

    let cfg = build_config(&args);
    let client = JobServiceClient::new(&cfg).context("failed to build job service client")?;

    if args.list {
        return run_list(&args, &client).await;
    }
    if let Some(run) = args.show.as_deref() {
        let run = RunIdentifier::new(run);
        let results = client
            .run_results(&run)
            .await
            .with_context(|| format!("failed to load results of run {run}"))?;
        let (out_tx, out_handle) = spawn_output_writer();
        let res = emit_results(&args, &run, &results, &out_tx);
        drop(out_tx);
        let _ = out_handle.await;
        return res;
    }
    if args.run {
        return run_watch(&args, cfg, client).await;
    }

    #[cfg(feature = "tui")]
    {
        crate::tui::run(args, cfg, client).await
    }
    #[cfg(not(feature = "tui"))]
    {
        Err(anyhow::anyhow!(
            "built without TUI support; use --list, --show or --run"
        ))
    }
}

/// Build a `ClientConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> ClientConfig {
    ClientConfig {
        base_url: args.base_url.clone(),
        user_agent: format!("arbitrage-watch/{}", env!("CARGO_PKG_VERSION")),
        request_timeout: Duration::from(args.timeout),
        poll_interval: Duration::from(args.poll_interval),
        completion_delay: Duration::from(args.completion_delay),
        refresh_delay: Duration::from(args.refresh_delay),
        initial_category: args.category.clone(),
        // Headless runs only care about the run they start themselves.
        show_finished_on_launch: !args.run,
    }
}

async fn run_list(args: &Cli, client: &JobServiceClient) -> Result<()> {
    let runs = client.list_runs().await.context("failed to list runs")?;
    let (out_tx, out_handle) = spawn_output_writer();
    if args.json {
        let _ = out_tx.send(OutputLine::Stdout(serde_json::to_string_pretty(&runs)?));
    } else if runs.is_empty() {
        let _ = out_tx.send(OutputLine::Stderr("No runs yet.".into()));
    } else {
        for run in runs {
            let _ = out_tx.send(OutputLine::Stdout(run.to_string()));
        }
    }
    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

/// Print (and optionally export) a loaded result set.
fn emit_results(
    args: &Cli,
    run: &RunIdentifier,
    results: &RunResults,
    out_tx: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    if let Some(path) = args.export_json.as_deref() {
        crate::export::export_json(path, run, results)?;
        let _ = out_tx.send(OutputLine::Stderr(format!(
            "Exported JSON: {}",
            path.display()
        )));
    }

    let categories = report_categories(results, &args.category, args.all_categories);
    let report = build_report(run, results, &categories);
    if args.json {
        let _ = out_tx.send(OutputLine::Stdout(serde_json::to_string_pretty(&report)?));
    } else {
        for line in build_text_summary(&report).lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }
    Ok(())
}

/// Start a run and follow it through the controller until its results arrive.
async fn run_watch(args: &Cli, cfg: ClientConfig, client: JobServiceClient) -> Result<()> {
    let (out_tx, out_handle) = spawn_output_writer();
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<ClientEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let handle = tokio::spawn(async move { run_controller(&cfg, client, evt_tx, cmd_rx).await });
    let _ = cmd_tx.send(UiCommand::StartRun {
        model: args.model.clone(),
    });
    let _ = out_tx.send(OutputLine::Stderr(format!(
        "Starting run with model {}",
        args.model
    )));

    let mut seen_running = false;
    let mut seen_completing = false;
    let mut last_label = String::new();

    let outcome: Result<()> = loop {
        let ev = tokio::select! {
            ev = evt_rx.recv() => ev,
            _ = tokio::signal::ctrl_c() => {
                break Err(anyhow::anyhow!("interrupted"));
            }
        };
        let Some(ev) = ev else {
            break Err(anyhow::anyhow!("controller stopped unexpectedly"));
        };
        match ev {
            ClientEvent::View(view) => {
                let progress = &view.progress;
                if progress.visible && !progress.label.is_empty() && progress.label != last_label
                {
                    last_label = progress.label.clone();
                    let _ = out_tx.send(OutputLine::Stderr(last_label.clone()));
                }
                match view.phase {
                    // The label is only filled in by a status poll that saw the job running.
                    LifecyclePhase::Running if !progress.label.is_empty() => seen_running = true,
                    LifecyclePhase::Completing => seen_completing = true,
                    LifecyclePhase::Idle
                        if seen_running && !seen_completing && view.trigger_enabled =>
                    {
                        break Err(anyhow::anyhow!(
                            "run ended without results (last step: {})",
                            progress.label
                        ));
                    }
                    _ => {}
                }
            }
            ClientEvent::Alert(msg) => break Err(anyhow::anyhow!(msg)),
            ClientEvent::Info(msg) => {
                let _ = out_tx.send(OutputLine::Stderr(msg));
            }
            ClientEvent::ResultsLoaded { run, results } if seen_completing => {
                break emit_results(args, &run, &results, &out_tx);
            }
            ClientEvent::ResultsLoaded { .. } => {}
            ClientEvent::LoadFailed { run, message } => {
                break Err(anyhow::anyhow!(
                    "failed to load results of run {run}: {message}"
                ));
            }
        }
    };

    let _ = cmd_tx.send(UiCommand::Quit);
    handle.await.context("controller task failed")??;
    drop(out_tx);
    let _ = out_handle.await;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_job_service_contract() {
        let args = Cli::parse_from(["arbitrage-watch"]);
        let cfg = build_config(&args);
        assert_eq!(cfg.poll_interval, Duration::from_millis(2000));
        assert_eq!(cfg.completion_delay, Duration::from_millis(1000));
        assert_eq!(cfg.refresh_delay, Duration::from_millis(1000));
        assert_eq!(cfg.initial_category, "Real");
        assert!(cfg.show_finished_on_launch);
        assert_eq!(args.model, "openai");
        assert!(!args.is_headless());
    }

    #[test]
    fn headless_run_ignores_previous_completion() {
        let args = Cli::parse_from(["arbitrage-watch", "--run", "--model", "gemini"]);
        assert!(args.is_headless());
        assert!(!build_config(&args).show_finished_on_launch);
    }

    #[test]
    fn durations_accept_humantime() {
        let args = Cli::parse_from(["arbitrage-watch", "--poll-interval", "500ms"]);
        assert_eq!(
            build_config(&args).poll_interval,
            Duration::from_millis(500)
        );
    }

    #[test]
    fn list_conflicts_with_show() {
        assert!(Cli::try_parse_from(["arbitrage-watch", "--list", "--show", "x"]).is_err());
    }

    #[tokio::test]
    async fn json_without_headless_mode_is_rejected() {
        let args = Cli::parse_from(["arbitrage-watch", "--json"]);
        let err = run(args).await.unwrap_err();
        assert!(err.to_string().contains("--json"));
    }
}
