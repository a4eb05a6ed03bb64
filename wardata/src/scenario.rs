//! Scenario loading.

use crate::error::RulesError;
use crate::rules::Rules;
use crate::types::ScenarioDef;
use std::fs;
use std::path::Path;

const LITE_1941: &str = include_str!("../data/lite-1941.json");

/// Parse and compile a scenario from JSON text.
pub fn from_json_str(json: &str) -> Result<Rules, RulesError> {
    let def: ScenarioDef = serde_json::from_str(json)?;
    Rules::from_definition(def)
}

/// Load a scenario file from disk.
pub fn load_scenario(path: &Path) -> Result<Rules, RulesError> {
    log::info!("Loading scenario from {:?}", path);
    let text = fs::read_to_string(path).map_err(|source| RulesError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    from_json_str(&text)
}

/// Raw definition of the built-in five-faction scenario.
pub fn lite_definition() -> Result<ScenarioDef, RulesError> {
    Ok(serde_json::from_str(LITE_1941)?)
}

/// The built-in five-faction scenario.
pub fn lite() -> Result<Rules, RulesError> {
    from_json_str(LITE_1941)
}

/// Resolve a scenario name or path: `lite-1941` (or `lite`) selects the
/// built-in scenario, anything else is read from disk.
pub fn resolve(name_or_path: &str) -> Result<Rules, RulesError> {
    match name_or_path {
        "lite" | "lite-1941" => lite(),
        other => load_scenario(Path::new(other)),
    }
}
