use crate::controller::{ClientController, DashboardView, HistoryOption, OpportunityCard};
use crate::model::{ClientEvent, RunIdentifier, RunResults, CATEGORIES, KNOWN_MODELS};
use std::collections::VecDeque;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Cards,
    History,
}

pub struct UiState {
    /// Latest snapshot from the controller. Never mutated locally.
    pub view: DashboardView,
    pub models: Vec<String>,
    pub model_selected: usize,
    pub focus: Focus,
    pub history_selected: usize, // 0 = the "Select a run..." entry
    pub card_selected: usize,
    pub alerts: VecDeque<String>,
    pub info: String,
    pub show_help: bool,
    pub loaded: Option<(RunIdentifier, RunResults)>,
    pub export_dir: Option<PathBuf>,
}

impl UiState {
    pub fn new(initial_category: &str, model: &str) -> Self {
        let mut models: Vec<String> = KNOWN_MODELS.iter().map(|m| m.to_string()).collect();
        let model_selected = match models.iter().position(|m| m == model) {
            Some(i) => i,
            None => {
                models.push(model.to_string());
                models.len() - 1
            }
        };
        Self {
            view: ClientController::new(initial_category).view(),
            models,
            model_selected,
            focus: Focus::Cards,
            history_selected: 0,
            card_selected: 0,
            alerts: VecDeque::new(),
            info: String::new(),
            show_help: false,
            loaded: None,
            export_dir: None,
        }
    }

    pub fn selected_model(&self) -> &str {
        &self.models[self.model_selected]
    }

    pub fn cycle_model(&mut self) {
        self.model_selected = (self.model_selected + 1) % self.models.len();
    }

    /// Category after the active one, in tab order.
    pub fn next_tab(&self) -> &'static str {
        let current = CATEGORIES
            .iter()
            .position(|c| *c == self.view.active_tab);
        match current {
            Some(i) => CATEGORIES[(i + 1) % CATEGORIES.len()],
            None => CATEGORIES[0],
        }
    }

    pub fn cards(&self) -> &[OpportunityCard] {
        if self.view.results_visible {
            self.view.rendered.cards()
        } else {
            &[]
        }
    }

    pub fn selected_card(&self) -> Option<&OpportunityCard> {
        self.cards().get(self.card_selected)
    }

    pub fn selected_history_run(&self) -> Option<&RunIdentifier> {
        match self.view.history.get(self.history_selected) {
            Some(HistoryOption::Run(run)) => Some(run),
            _ => None,
        }
    }

    pub fn apply_event(&mut self, ev: ClientEvent) {
        match ev {
            ClientEvent::View(view) => {
                let tab_changed = view.active_tab != self.view.active_tab;
                self.view = *view;
                if tab_changed {
                    self.card_selected = 0;
                }
                self.clamp_selection();
            }
            ClientEvent::Alert(msg) => self.alerts.push_back(msg),
            ClientEvent::Info(msg) => self.info = msg,
            ClientEvent::ResultsLoaded { run, results } => {
                self.info = format!(
                    "Loaded run {run} ({} opportunities)",
                    results.opportunities.len()
                );
                self.card_selected = 0;
                self.loaded = Some((run, results));
            }
            ClientEvent::LoadFailed { run, message } => {
                self.info = format!("Failed to load run {run}: {message}");
            }
        }
    }

    fn clamp_selection(&mut self) {
        let cards = self.cards().len();
        if self.card_selected >= cards {
            self.card_selected = cards.saturating_sub(1);
        }
        let history = self.view.history.len();
        if self.history_selected >= history {
            self.history_selected = history.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_model_is_appended_and_selected() {
        let state = UiState::new("Real", "claude");
        assert_eq!(state.models, ["openai", "gemini", "claude"]);
        assert_eq!(state.selected_model(), "claude");
    }

    #[test]
    fn model_cycle_wraps() {
        let mut state = UiState::new("Real", "gemini");
        assert_eq!(state.selected_model(), "gemini");
        state.cycle_model();
        assert_eq!(state.selected_model(), "openai");
    }

    #[test]
    fn tabs_cycle_in_order() {
        let mut state = UiState::new("Real", "openai");
        assert_eq!(state.next_tab(), "Value");
        state.view.active_tab = "Logic".into();
        assert_eq!(state.next_tab(), "Real");
        state.view.active_tab = "Other".into();
        assert_eq!(state.next_tab(), "Real");
    }

    #[test]
    fn sentinel_is_not_a_run() {
        let mut state = UiState::new("Real", "openai");
        let mut c = ClientController::new("Real");
        c.apply_history(vec![RunIdentifier::new("a")]);
        state.apply_event(ClientEvent::View(Box::new(c.view())));
        assert_eq!(state.selected_history_run(), None);
        state.history_selected = 1;
        assert_eq!(state.selected_history_run(), Some(&RunIdentifier::new("a")));
    }

    #[test]
    fn shrinking_history_clamps_selection() {
        let mut state = UiState::new("Real", "openai");
        let mut c = ClientController::new("Real");
        c.apply_history(vec![RunIdentifier::new("a"), RunIdentifier::new("b")]);
        state.apply_event(ClientEvent::View(Box::new(c.view())));
        state.history_selected = 2;
        c.apply_history(vec![]);
        state.apply_event(ClientEvent::View(Box::new(c.view())));
        assert_eq!(state.history_selected, 0);
    }

    #[test]
    fn alerts_queue_up() {
        let mut state = UiState::new("Real", "openai");
        state.apply_event(ClientEvent::Alert("one".into()));
        state.apply_event(ClientEvent::Alert("two".into()));
        assert_eq!(state.alerts.front().map(String::as_str), Some("one"));
        assert_eq!(state.alerts.len(), 2);
    }
}
