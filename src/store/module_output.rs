//! store/module_output: descriptive metadata of one analysis-module output.
//!
//! Формат module_output.json: конкатенация компактных JSON-объектов через ",\n"
//! (не JSON-массив). Компактная сериализация serde_json экранирует переводы строк
//! внутри строк, поэтому литерал ",\n" встречается только как разделитель.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::consts::MODULE_OUTPUT_SEPARATOR;

/// Asset map of a module output: destination path (relative to the render dir) -> source file.
pub type AssetMap = BTreeMap<String, String>;

/// One output record of an analysis module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleOutput {
    #[serde(default)]
    pub sections: Vec<Value>,
    #[serde(default)]
    pub anchor: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub intro: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js: Option<AssetMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<AssetMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ModuleOutput {
    pub fn new<S: Into<String>>(name: S, anchor: S, intro: S) -> Self {
        Self {
            name: name.into(),
            anchor: anchor.into(),
            intro: intro.into(),
            ..Self::default()
        }
    }

    pub fn with_section(mut self, section: Value) -> Self {
        self.sections.push(section);
        self
    }
}

/// Serialize outputs as `obj,\nobj,\nobj` (no trailing separator).
pub fn encode_concat(outputs: &[ModuleOutput]) -> Result<String> {
    let mut parts = Vec::with_capacity(outputs.len());
    for o in outputs {
        parts.push(serde_json::to_string(o).context("serialize module output")?);
    }
    Ok(parts.join(MODULE_OUTPUT_SEPARATOR))
}

/// Parse a concatenation written by [`encode_concat`] (possibly appended several times).
pub fn parse_concat(s: &str) -> Result<Vec<ModuleOutput>> {
    let mut out = Vec::new();
    for (i, piece) in s.split(MODULE_OUTPUT_SEPARATOR).enumerate() {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        let o: ModuleOutput = serde_json::from_str(piece)
            .with_context(|| format!("parse module output #{}", i))?;
        out.push(o);
    }
    Ok(out)
}
