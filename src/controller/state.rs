//! Client-side view state and the run/poll lifecycle.
//!
//! `ClientController` is the only owner of the current result set and the active category.
//! It never performs I/O: the async driver feeds it service responses and acts on what it
//! returns.

use super::render::{render_results, RenderedResults};
use crate::model::{JobStatus, Opportunity, RunIdentifier, RunResults};
use std::collections::HashSet;

/// Label of the "nothing selected" entry at the top of the history selector.
pub const HISTORY_SENTINEL_LABEL: &str = "Select a run...";

pub const COMPLETE_LABEL: &str = "Complete!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Idle,
    Running,
    Completing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryOption {
    NoSelection,
    Run(RunIdentifier),
}

impl HistoryOption {
    pub fn label(&self) -> &str {
        match self {
            HistoryOption::NoSelection => HISTORY_SENTINEL_LABEL,
            HistoryOption::Run(id) => id.as_str(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressView {
    pub visible: bool,
    pub percent: u8,
    pub label: String,
}

/// What the driver has to do after a status poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusOutcome {
    Running,
    /// A run finished that has not been shown yet; load it after the completion delay.
    Completed(RunIdentifier),
    Settled,
}

/// Read-only snapshot handed to presentation layers.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub phase: LifecyclePhase,
    pub trigger_enabled: bool,
    pub progress: ProgressView,
    pub results_visible: bool,
    pub history: Vec<HistoryOption>,
    pub active_tab: String,
    pub loaded_run: Option<RunIdentifier>,
    pub rendered: RenderedResults,
    pub refreshing: HashSet<usize>,
}

/// Take the last `_`-delimited segment of a results directory path.
///
/// `results/results_20240101_120000` yields `120000`.
pub fn derive_run_identifier(results_dir: &str) -> RunIdentifier {
    let last = results_dir.rsplit('_').next().unwrap_or(results_dir);
    RunIdentifier::new(last)
}

#[derive(Debug)]
pub struct ClientController {
    results: Vec<Opportunity>,
    loaded_run: Option<RunIdentifier>,
    active_tab: String,
    history: Vec<HistoryOption>,
    trigger_enabled: bool,
    start_pending: bool,
    phase: LifecyclePhase,
    progress: ProgressView,
    results_visible: bool,
    last_handled: Option<RunIdentifier>,
    refreshing: HashSet<usize>,
}

impl ClientController {
    pub fn new(active_tab: impl Into<String>) -> Self {
        Self {
            results: Vec::new(),
            loaded_run: None,
            active_tab: active_tab.into(),
            history: vec![HistoryOption::NoSelection],
            trigger_enabled: true,
            start_pending: false,
            phase: LifecyclePhase::Idle,
            progress: ProgressView::default(),
            results_visible: false,
            last_handled: None,
            refreshing: HashSet::new(),
        }
    }

    pub fn render(&self) -> RenderedResults {
        render_results(&self.results, &self.active_tab)
    }

    pub fn view(&self) -> DashboardView {
        DashboardView {
            phase: self.phase,
            trigger_enabled: self.trigger_enabled,
            progress: self.progress.clone(),
            results_visible: self.results_visible,
            history: self.history.clone(),
            active_tab: self.active_tab.clone(),
            loaded_run: self.loaded_run.clone(),
            rendered: self.render(),
            refreshing: self.refreshing.clone(),
        }
    }

    /// Replace the history selector with the sentinel followed by `runs`, in order.
    pub fn apply_history(&mut self, runs: Vec<RunIdentifier>) {
        self.history = std::iter::once(HistoryOption::NoSelection)
            .chain(runs.into_iter().map(HistoryOption::Run))
            .collect();
    }

    /// Claim the trigger for a new start request. Returns `false` if a start is already in
    /// flight or the trigger is disabled, in which case nothing must be sent.
    pub fn request_start(&mut self) -> bool {
        if !self.trigger_enabled || self.start_pending {
            return false;
        }
        self.trigger_enabled = false;
        self.start_pending = true;
        true
    }

    pub fn start_succeeded(&mut self) {
        self.start_pending = false;
        self.phase = LifecyclePhase::Running;
        self.progress.visible = true;
        self.results_visible = false;
    }

    pub fn start_failed(&mut self) {
        self.start_pending = false;
        self.trigger_enabled = true;
    }

    pub fn apply_status(&mut self, status: &JobStatus) -> StatusOutcome {
        if status.is_running {
            self.trigger_enabled = false;
            self.phase = LifecyclePhase::Running;
            self.progress = ProgressView {
                visible: true,
                percent: status.progress.min(100),
                label: format!("{} ({}%)", status.current_step, status.progress),
            };
            return StatusOutcome::Running;
        }

        // A start request still in flight owns the trigger until it resolves.
        if !self.start_pending {
            self.trigger_enabled = true;
        }

        let completed = match status.results_dir.as_deref() {
            Some(dir) if status.progress == 100 => Some(derive_run_identifier(dir)),
            _ => None,
        };
        match completed {
            Some(run) if self.last_handled.as_ref() != Some(&run) => {
                self.phase = LifecyclePhase::Completing;
                self.progress = ProgressView {
                    visible: true,
                    percent: 100,
                    label: COMPLETE_LABEL.into(),
                };
                self.last_handled = Some(run.clone());
                StatusOutcome::Completed(run)
            }
            _ => {
                if self.phase == LifecyclePhase::Running {
                    // The run stopped without reporting completion; keep its last step visible.
                    self.phase = LifecyclePhase::Idle;
                }
                StatusOutcome::Settled
            }
        }
    }

    /// Treat a run that finished before this client started as already shown.
    pub fn prime(&mut self, status: &JobStatus) {
        if status.is_running || status.progress != 100 {
            return;
        }
        if let Some(dir) = status.results_dir.as_deref() {
            self.last_handled = Some(derive_run_identifier(dir));
        }
    }

    /// Called once the completion delay has elapsed, before the results are fetched.
    pub fn finish_completion(&mut self) {
        self.progress.visible = false;
        if self.phase == LifecyclePhase::Completing {
            self.phase = LifecyclePhase::Idle;
        }
    }

    /// Swap in a freshly loaded result set. The previous set is discarded, never merged.
    pub fn replace_results(&mut self, run: RunIdentifier, results: RunResults) {
        self.results = results.opportunities;
        self.loaded_run = Some(run);
        self.results_visible = true;
        self.refreshing.clear();
    }

    pub fn select_tab(&mut self, tab: impl Into<String>) {
        self.active_tab = tab.into();
    }

    /// Mark a card's refresh control busy. Returns `false` if it is already busy or the key
    /// does not belong to the current result set.
    pub fn begin_card_refresh(&mut self, key: usize) -> bool {
        if key >= self.results.len() {
            return false;
        }
        self.refreshing.insert(key)
    }

    pub fn finish_card_refresh(&mut self, key: usize) {
        self.refreshing.remove(&key);
    }
}
