//! Category filtering and card rendering for a loaded result set.

use crate::model::{Opportunity, ProfitPotential};
use serde::Serialize;

pub const NO_OPPORTUNITIES_MESSAGE: &str = "No opportunities found for this category.";

/// One rendered result card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpportunityCard {
    /// Position of the opportunity in the current result set; stable across tab switches.
    pub key: usize,
    pub category: String,
    pub source: String,
    pub profit: ProfitPotential,
    pub title: String,
    pub description: String,
    /// Fill ratio for the confidence meter, clamped to `0.0..=1.0`.
    pub confidence_ratio: f64,
    /// Whole percent, truncated toward zero.
    pub confidence_percent: u8,
}

impl OpportunityCard {
    pub fn profit_badge(&self) -> String {
        format!("{} Profit", self.profit.as_str())
    }

    pub fn confidence_label(&self) -> String {
        format!("Confidence: {}%", self.confidence_percent)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RenderedResults {
    Empty(&'static str),
    Cards(Vec<OpportunityCard>),
}

impl RenderedResults {
    pub fn cards(&self) -> &[OpportunityCard] {
        match self {
            RenderedResults::Empty(_) => &[],
            RenderedResults::Cards(cards) => cards,
        }
    }
}

/// Filter `results` to the active category and order by profit tier, highest first.
///
/// The sort is stable, so opportunities of equal tier keep their order from the payload.
pub fn render_results(results: &[Opportunity], active_tab: &str) -> RenderedResults {
    let mut filtered: Vec<(usize, &Opportunity)> = results
        .iter()
        .enumerate()
        .filter(|(_, opp)| opp.category == active_tab)
        .collect();

    if filtered.is_empty() {
        return RenderedResults::Empty(NO_OPPORTUNITIES_MESSAGE);
    }

    filtered.sort_by(|(_, a), (_, b)| {
        b.profit_potential
            .priority()
            .cmp(&a.profit_potential.priority())
    });

    RenderedResults::Cards(
        filtered
            .into_iter()
            .map(|(key, opp)| build_card(key, opp))
            .collect(),
    )
}

fn build_card(key: usize, opp: &Opportunity) -> OpportunityCard {
    let ratio = if opp.confidence.is_finite() {
        opp.confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };
    OpportunityCard {
        key,
        category: opp.category.clone(),
        source: opp.source_label().to_string(),
        profit: opp.profit_potential,
        title: opp.market_title.clone(),
        description: opp.description.clone(),
        confidence_ratio: ratio,
        confidence_percent: whole_percent(ratio),
    }
}

/// Truncate `ratio` to a whole percent. The product is first snapped to six decimals,
/// since `0.29 * 100.0` lands just below 29.
fn whole_percent(ratio: f64) -> u8 {
    ((ratio * 100.0 * 1e6).round() / 1e6).trunc() as u8
}
