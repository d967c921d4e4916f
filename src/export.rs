use crate::model::{Opportunity, RunIdentifier, RunResults};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// JSON document written by exports.
#[derive(Debug, Serialize)]
struct ExportedRun<'a> {
    run: &'a RunIdentifier,
    exported_utc: String,
    opportunities: &'a [Opportunity],
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into())
}

/// Write a run's full result set as pretty JSON.
pub fn export_json(path: &Path, run: &RunIdentifier, results: &RunResults) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create export directory {}", parent.display()))?;
        }
    }
    let doc = ExportedRun {
        run,
        exported_utc: now_rfc3339(),
        opportunities: &results.opportunities,
    };
    let body = serde_json::to_string_pretty(&doc)?;
    std::fs::write(path, body).with_context(|| format!("write {}", path.display()))?;
    tracing::info!(path = %path.display(), "exported results");
    Ok(())
}

/// Directory for exports made without an explicit path.
pub fn default_export_dir() -> Result<PathBuf> {
    match dirs::download_dir() {
        Some(dir) => Ok(dir),
        None => std::env::current_dir().context("get current directory"),
    }
}

/// File name for an export of `run`, unique per second.
pub fn export_file_name(run: &RunIdentifier) -> String {
    let stamp = time::OffsetDateTime::now_utc()
        .format(time::macros::format_description!(
            "[year][month][day]-[hour][minute][second]"
        ))
        .unwrap_or_else(|_| "now".into());
    let safe: String = run
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    format!("arbitrage-{safe}-{stamp}.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProfitPotential;

    #[test]
    fn file_name_is_sanitized() {
        let name = export_file_name(&RunIdentifier::new("a/b c"));
        assert!(name.starts_with("arbitrage-a-b-c-"), "{name}");
        assert!(name.ends_with(".json"));
    }

    #[test]
    fn export_writes_opportunities() {
        let dir = std::env::temp_dir().join(format!(
            "arbitrage-watch-export-{}",
            std::process::id()
        ));
        let path = dir.join("nested").join("out.json");
        let results = RunResults {
            opportunities: vec![Opportunity {
                category: "Real".into(),
                market_title: "m".into(),
                description: "d".into(),
                profit_potential: ProfitPotential::High,
                confidence: 0.5,
                source: None,
            }],
        };
        export_json(&path, &RunIdentifier::new("120000"), &results).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["run"], "120000");
        assert_eq!(written["opportunities"][0]["type"], "Real");
        assert_eq!(written["opportunities"][0]["profit_potential"], "High");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
