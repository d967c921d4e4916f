//! Async driver around [`ClientController`].
//!
//! Owns the status poll timer, dispatches job service calls and feeds their answers back
//! into the controller on a single task, so controller state is never shared.

use super::state::{ClientController, StatusOutcome};
use crate::model::{ClientConfig, ClientEvent, JobStatus, RunIdentifier, RunResults};
use crate::service::{JobServiceClient, ServiceError};
use anyhow::Result;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    StartRun { model: String },
    LoadRun(RunIdentifier),
    SelectTab(String),
    RefreshHistory,
    RefreshCard(usize),
    Quit,
}

/// Answers of one-off service calls, routed back to the driver loop.
enum Outcome {
    History {
        announce: bool,
        res: Result<Vec<RunIdentifier>, ServiceError>,
    },
    Started(Result<(), ServiceError>),
    Results {
        generation: u64,
        run: RunIdentifier,
        res: Result<RunResults, ServiceError>,
    },
    CardRefreshed(usize),
}

struct Driver<'a> {
    cfg: &'a ClientConfig,
    client: JobServiceClient,
    state: ClientController,
    event_tx: UnboundedSender<ClientEvent>,
    outcome_tx: UnboundedSender<Outcome>,
    // Bumped on every results request; older answers are dropped.
    results_generation: u64,
}

impl Driver<'_> {
    fn publish(&self) {
        let _ = self
            .event_tx
            .send(ClientEvent::View(Box::new(self.state.view())));
    }

    /// `announce` reports the reloaded run count as an info line.
    fn fetch_history(&self, announce: bool) {
        let client = self.client.clone();
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let res = client.list_runs().await;
            let _ = tx.send(Outcome::History { announce, res });
        });
    }

    fn load_results(&mut self, run: RunIdentifier) {
        self.results_generation += 1;
        let generation = self.results_generation;
        let client = self.client.clone();
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let res = client.run_results(&run).await;
            let _ = tx.send(Outcome::Results {
                generation,
                run,
                res,
            });
        });
    }

    fn start_run(&mut self, model: String) {
        if !self.state.request_start() {
            tracing::debug!("start ignored: trigger disabled");
            return;
        }
        tracing::info!(model = %model, "requesting new run");
        self.publish();
        let client = self.client.clone();
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(Outcome::Started(client.start_run(&model).await));
        });
    }

    fn refresh_card(&mut self, key: usize) {
        if !self.state.begin_card_refresh(key) {
            return;
        }
        self.publish();
        let delay = self.cfg.refresh_delay;
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Outcome::CardRefreshed(key));
        });
    }

    fn apply_outcome(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::History { announce, res: Ok(runs) } => {
                let count = runs.len();
                self.state.apply_history(runs);
                self.publish();
                if announce {
                    let _ = self
                        .event_tx
                        .send(ClientEvent::Info(format!("History reloaded ({count} runs)")));
                }
            }
            Outcome::History { res: Err(e), .. } => {
                tracing::warn!(error = %e, "failed to fetch history");
            }
            Outcome::Started(Ok(())) => {
                tracing::info!("run started");
                self.state.start_succeeded();
                self.publish();
            }
            Outcome::Started(Err(e)) => {
                tracing::warn!(error = %e, "failed to start job");
                self.state.start_failed();
                let _ = self
                    .event_tx
                    .send(ClientEvent::Alert(format!("Failed to start job: {e}")));
                self.publish();
            }
            Outcome::Results {
                generation,
                run,
                res,
            } => {
                if generation != self.results_generation {
                    tracing::debug!(%run, "dropping superseded results");
                    return;
                }
                match res {
                    Ok(results) => {
                        tracing::info!(%run, count = results.opportunities.len(), "results loaded");
                        self.state.replace_results(run.clone(), results.clone());
                        let _ = self
                            .event_tx
                            .send(ClientEvent::ResultsLoaded { run, results });
                        self.publish();
                    }
                    Err(e) => {
                        tracing::warn!(%run, error = %e, "failed to load results");
                        let _ = self.event_tx.send(ClientEvent::LoadFailed {
                            run,
                            message: e.to_string(),
                        });
                    }
                }
            }
            Outcome::CardRefreshed(key) => {
                self.state.finish_card_refresh(key);
                self.publish();
                let _ = self
                    .event_tx
                    .send(ClientEvent::Alert("Refresh feature coming soon!".into()));
            }
        }
    }
}

fn spawn_status_fetch(client: &JobServiceClient) -> JoinHandle<Result<JobStatus, ServiceError>> {
    let client = client.clone();
    tokio::spawn(async move { client.status().await })
}

/// Drive the poll/run/render cycle until `Quit` arrives or the command channel closes.
pub(crate) async fn run_controller(
    cfg: &ClientConfig,
    client: JobServiceClient,
    event_tx: UnboundedSender<ClientEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel::<Outcome>();
    let mut driver = Driver {
        cfg,
        client,
        state: ClientController::new(cfg.initial_category.clone()),
        event_tx,
        outcome_tx,
        results_generation: 0,
    };

    driver.publish();
    driver.fetch_history(false);

    let mut poll = tokio::time::interval(cfg.poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut status_task: Option<JoinHandle<Result<JobStatus, ServiceError>>> = None;
    let mut first_status = true;
    let mut completion: Option<(Instant, RunIdentifier)> = None;

    loop {
        tokio::select! {
            _ = poll.tick() => {
                // A slow answer from the previous tick must never overwrite a newer one.
                if let Some(stale) = status_task.take() {
                    tracing::debug!("previous status poll still pending; aborting it");
                    stale.abort();
                }
                status_task = Some(spawn_status_fetch(&driver.client));
            }
            // Keep the JoinHandle in place until this branch wins, otherwise a losing
            // branch would drop it and the answer would be lost.
            joined = async {
                match status_task.as_mut() {
                    Some(h) => h.await,
                    None => futures::future::pending().await,
                }
            } => {
                status_task = None;
                match joined {
                    Ok(Ok(status)) => {
                        if first_status && !cfg.show_finished_on_launch {
                            driver.state.prime(&status);
                        }
                        first_status = false;
                        if let StatusOutcome::Completed(run) = driver.state.apply_status(&status) {
                            tracing::info!(%run, "run completed");
                            completion = Some((Instant::now() + cfg.completion_delay, run));
                        }
                        driver.publish();
                    }
                    Ok(Err(e)) => tracing::warn!(error = %e, "status check failed"),
                    Err(e) if e.is_cancelled() => {}
                    Err(e) => tracing::warn!(error = %e, "status task failed"),
                }
            }
            _ = async {
                match completion.as_ref() {
                    Some((deadline, _)) => tokio::time::sleep_until(*deadline).await,
                    None => futures::future::pending().await,
                }
            } => {
                if let Some((_, run)) = completion.take() {
                    driver.state.finish_completion();
                    driver.publish();
                    driver.load_results(run);
                    driver.fetch_history(false);
                }
            }
            Some(outcome) = outcome_rx.recv() => {
                driver.apply_outcome(outcome);
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::StartRun { model }) => driver.start_run(model),
                    Some(UiCommand::LoadRun(run)) => driver.load_results(run),
                    Some(UiCommand::SelectTab(tab)) => {
                        driver.state.select_tab(tab);
                        driver.publish();
                    }
                    Some(UiCommand::RefreshHistory) => driver.fetch_history(true),
                    Some(UiCommand::RefreshCard(key)) => driver.refresh_card(key),
                    Some(UiCommand::Quit) | None => break,
                }
            }
        }
    }

    if let Some(h) = status_task.take() {
        h.abort();
    }
    Ok(())
}
