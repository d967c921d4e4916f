use super::state::UiState;
use anyhow::Result;
use std::path::PathBuf;

/// Export the loaded result set into the export directory.
/// Returns the path of the exported file.
pub fn export_loaded_run(state: &UiState) -> Result<PathBuf> {
    let Some((run, results)) = state.loaded.as_ref() else {
        return Err(anyhow::anyhow!("no run loaded"));
    };
    let dir = match state.export_dir.clone() {
        Some(dir) => dir,
        None => crate::export::default_export_dir()?,
    };
    let path = dir.join(crate::export::export_file_name(run));
    crate::export::export_json(&path, run, results)?;
    Ok(path)
}

/// Export and update state.info with the outcome.
pub fn export_and_show_path(state: &mut UiState) {
    match export_loaded_run(state) {
        Ok(path) => {
            state.info = format!("Exported JSON: {}", path.display());
        }
        Err(e) => {
            state.info = format!("JSON export failed: {e:#}");
        }
    }
}
