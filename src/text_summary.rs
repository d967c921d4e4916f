//! Text and JSON reports for headless output.
//!
//! Groups a loaded result set into rendered cards per category and formats them as
//! human-readable lines.

use crate::controller::{render_results, OpportunityCard, RenderedResults, NO_OPPORTUNITIES_MESSAGE};
use crate::model::{RunIdentifier, RunResults, CATEGORIES};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct CategoryReport {
    pub category: String,
    pub cards: Vec<OpportunityCard>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RunReport {
    pub run: RunIdentifier,
    pub categories: Vec<CategoryReport>,
}

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Categories to report: just `selected`, or every known category followed by any
/// category the result set carries that the client does not know about.
pub(crate) fn report_categories(results: &RunResults, selected: &str, all: bool) -> Vec<String> {
    if !all {
        return vec![selected.to_string()];
    }
    let mut out: Vec<String> = CATEGORIES.iter().map(|c| c.to_string()).collect();
    for opp in &results.opportunities {
        if !out.contains(&opp.category) {
            out.push(opp.category.clone());
        }
    }
    out
}

pub(crate) fn build_report(
    run: &RunIdentifier,
    results: &RunResults,
    categories: &[String],
) -> RunReport {
    let categories = categories
        .iter()
        .map(|category| {
            let cards = match render_results(&results.opportunities, category) {
                RenderedResults::Empty(_) => Vec::new(),
                RenderedResults::Cards(cards) => cards,
            };
            CategoryReport {
                category: category.clone(),
                cards,
            }
        })
        .collect();
    RunReport {
        run: run.clone(),
        categories,
    }
}

pub(crate) fn build_text_summary(report: &RunReport) -> TextSummary {
    let mut lines = vec![format!("Run: {}", report.run)];

    for section in &report.categories {
        lines.push(String::new());
        lines.push(format!("== {} ({}) ==", section.category, section.cards.len()));
        if section.cards.is_empty() {
            lines.push(NO_OPPORTUNITIES_MESSAGE.to_string());
            continue;
        }
        for card in &section.cards {
            lines.push(format!(
                "[{}] [{}] {}",
                card.source,
                card.profit_badge(),
                card.title
            ));
            if !card.description.trim().is_empty() {
                lines.push(format!("    {}", card.description.trim()));
            }
            lines.push(format!("    {}", card.confidence_label()));
        }
    }

    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Opportunity, ProfitPotential};

    fn results() -> RunResults {
        let opp = |category: &str, profit, title: &str, source: Option<&str>| Opportunity {
            category: category.into(),
            market_title: title.into(),
            description: "desc".into(),
            profit_potential: profit,
            confidence: 0.75,
            source: source.map(String::from),
        };
        RunResults {
            opportunities: vec![
                opp("Real", ProfitPotential::Low, "low real", None),
                opp("Real", ProfitPotential::High, "high real", Some("Algo")),
                opp("Spread", ProfitPotential::Medium, "odd one", None),
            ],
        }
    }

    #[test]
    fn single_category_by_default() {
        assert_eq!(report_categories(&results(), "Value", false), ["Value"]);
    }

    #[test]
    fn all_categories_appends_unknown_ones() {
        assert_eq!(
            report_categories(&results(), "Real", true),
            ["Real", "Value", "Logic", "Spread"]
        );
    }

    #[test]
    fn text_summary_lists_sorted_cards_and_empty_sections() {
        let run = RunIdentifier::new("120000");
        let categories = vec!["Real".to_string(), "Logic".to_string()];
        let report = build_report(&run, &results(), &categories);
        let lines = build_text_summary(&report).lines;

        assert_eq!(lines[0], "Run: 120000");
        assert_eq!(lines[2], "== Real (2) ==");
        assert_eq!(lines[3], "[Algo] [High Profit] high real");
        assert_eq!(lines[4], "    desc");
        assert_eq!(lines[5], "    Confidence: 75%");
        assert_eq!(lines[6], "[LLM] [Low Profit] low real");
        assert!(lines.contains(&"== Logic (0) ==".to_string()));
        assert_eq!(
            lines.last().map(String::as_str),
            Some("No opportunities found for this category.")
        );
    }

    #[test]
    fn report_serializes_cards() {
        let run = RunIdentifier::new("r");
        let report = build_report(&run, &results(), &["Real".to_string()]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["run"], "r");
        assert_eq!(json["categories"][0]["cards"][0]["source"], "Algo");
        assert_eq!(json["categories"][0]["cards"][0]["profit"], "High");
        assert_eq!(json["categories"][0]["cards"][1]["confidence_percent"], 75);
    }
}
