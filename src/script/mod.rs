//! Sequential JSON node scripts.
//!
//! A script is an ordered list of steps. Each step names a node kind and its parameters; operands
//! are numbers or `"@id"` references to earlier steps. Steps run strictly in order, once, with no
//! reordering or caching.

mod eval;
mod model;

pub use eval::ScriptResults;
pub use model::{CameraDef, LightDef, SceneDef, ScriptDef, Step, StepKind};

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::device::DeviceContext;
use crate::foundation::error::{TextureError, TextureResult};

/// Parsed script, ready to run on any device context.
#[derive(Clone, Debug)]
pub struct GraphScript {
    def: ScriptDef,
}

impl GraphScript {
    pub fn from_reader<R: std::io::Read>(r: R) -> TextureResult<Self> {
        let def: ScriptDef = serde_json::from_reader(r)
            .map_err(|e| TextureError::validation(format!("parse script JSON: {e}")))?;
        Self::from_def(def)
    }

    pub fn from_json(text: &str) -> TextureResult<Self> {
        Self::from_reader(text.as_bytes())
    }

    pub fn from_path(path: impl AsRef<Path>) -> TextureResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            TextureError::validation(format!("open script JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn from_def(def: ScriptDef) -> TextureResult<Self> {
        def.validate()?;
        Ok(Self { def })
    }

    pub fn def(&self) -> &ScriptDef {
        &self.def
    }

    /// Run every step in order on `ctx`.
    pub fn run(&self, ctx: &DeviceContext) -> TextureResult<ScriptResults> {
        eval::run(&self.def, ctx)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/script/script.rs"]
mod tests;
