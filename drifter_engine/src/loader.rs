//! Loading game definitions from disk.
//!
//! Games are stored as a RON-serialized `GameDef`. Loading parses the file and runs the
//! data validator, reporting every problem at once.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use drifter_data::{GameDef, validate_game};
use log::info;

/// Read, parse and validate a game file.
///
/// # Errors
/// Errors bubble up from file IO, RON deserialization, or validation.
pub fn load_game_def(path: &Path) -> Result<Arc<GameDef>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading game from '{}'", path.display()))?;
    let def = parse_game_def(&text).with_context(|| format!("loading game from '{}'", path.display()))?;
    info!(
        "loaded \"{}\" by {} from {}",
        def.header.name,
        def.header.author,
        path.display()
    );
    Ok(def)
}

/// Parse and validate a game from RON text.
///
/// # Errors
/// Malformed RON, or a definition that fails validation.
pub fn parse_game_def(text: &str) -> Result<Arc<GameDef>> {
    let def: GameDef = ron::from_str(text).context("parsing game RON")?;
    let errors = validate_game(&def);
    if !errors.is_empty() {
        let details = errors
            .into_iter()
            .map(|err| format!("- {err}"))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("game validation failed:\n{details}");
    }
    Ok(Arc::new(def))
}
