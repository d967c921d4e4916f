//! Run lifecycle control.
//!
//! Owns the status poll, start requests, result loading and card rendering, and emits
//! events for presentation layers. UI/CLI layers only send [`UiCommand`]s and read
//! [`DashboardView`] snapshots.

mod driver;
mod render;
mod state;

pub(crate) use driver::{run_controller, UiCommand};
pub use render::{render_results, OpportunityCard, RenderedResults, NO_OPPORTUNITIES_MESSAGE};
pub use state::{ClientController, DashboardView, HistoryOption, LifecyclePhase};
