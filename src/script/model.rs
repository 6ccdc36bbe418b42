use std::collections::HashSet;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{TextureError, TextureResult};
use crate::node::raymarch::DEFAULT_MAX_STEPS;
use crate::node::{CameraInfo, GradientKind, LightInfo, Op};

/// JSON form of a script.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptDef {
    pub width: u32,
    pub height: u32,
    pub steps: Vec<Step>,
    /// Step whose result is the script output; the last step when absent.
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    #[serde(flatten)]
    pub kind: StepKind,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum StepKind {
    Constant {
        value: f32,
    },
    CpuRandom {
        #[serde(default)]
        min: f32,
        #[serde(default = "one")]
        max: f32,
        #[serde(default)]
        seed: Option<u64>,
    },
    FbmNoise {
        #[serde(default)]
        octaves: Option<u32>,
        #[serde(default)]
        seed: Option<u64>,
        /// Step whose result seeds the noise; synthesized noise when absent.
        #[serde(default)]
        texture: Option<String>,
    },
    Gradient {
        kind: GradientKind,
    },
    /// Operands are kept as raw JSON and checked when the step runs.
    Op {
        op: Op,
        inputs: Vec<serde_json::Value>,
        #[serde(default)]
        min: Option<f32>,
        #[serde(default)]
        max: Option<f32>,
    },
    Raymarch {
        #[serde(default)]
        scene: SceneDef,
        #[serde(default = "default_steps")]
        max_steps: u32,
        #[serde(default)]
        camera: Option<CameraDef>,
        #[serde(default)]
        light: Option<LightDef>,
    },
}

impl StepKind {
    pub fn name(&self) -> &'static str {
        match self {
            StepKind::Constant { .. } => "constant",
            StepKind::CpuRandom { .. } => "cpu_random",
            StepKind::FbmNoise { .. } => "fbm_noise",
            StepKind::Gradient { .. } => "gradient",
            StepKind::Op { op, .. } => op.name(),
            StepKind::Raymarch { .. } => "raymarch",
        }
    }
}

fn one() -> f32 {
    1.0
}

fn default_steps() -> u32 {
    DEFAULT_MAX_STEPS
}

/// Built-in distance fields usable from scripts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneDef {
    #[default]
    Demo,
    UnitSphere,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraDef {
    pub campos: [f32; 3],
    pub camtarget: [f32; 3],
}

impl From<CameraDef> for CameraInfo {
    fn from(c: CameraDef) -> Self {
        CameraInfo {
            campos: Vec3::from_array(c.campos),
            camtarget: Vec3::from_array(c.camtarget),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LightDef {
    pub lightpos: [f32; 3],
    pub shadow_intensity: f32,
}

impl From<LightDef> for LightInfo {
    fn from(l: LightDef) -> Self {
        LightInfo {
            lightpos: Vec3::from_array(l.lightpos),
            shadow_intensity: l.shadow_intensity,
        }
    }
}

/// Strip the `@` of a step reference.
pub(crate) fn reference(text: &str) -> Option<&str> {
    text.strip_prefix('@').filter(|id| !id.is_empty())
}

impl ScriptDef {
    /// Structural checks: non-empty, unique ids, references only to earlier steps.
    pub fn validate(&self) -> TextureResult<()> {
        if self.steps.is_empty() {
            return Err(TextureError::validation("script has no steps"));
        }
        let mut seen = HashSet::new();
        for step in &self.steps {
            let check = |id: &str| {
                if seen.contains(id) {
                    Ok(())
                } else {
                    Err(TextureError::validation(format!(
                        "step '{}' references '{id}', which is not an earlier step",
                        step.id
                    )))
                }
            };
            match &step.kind {
                StepKind::Op { inputs, .. } => {
                    for id in inputs.iter().filter_map(|v| v.as_str().and_then(reference)) {
                        check(id)?;
                    }
                }
                StepKind::FbmNoise {
                    texture: Some(id), ..
                } => check(id)?,
                _ => {}
            }
            if !seen.insert(step.id.as_str()) {
                return Err(TextureError::validation(format!(
                    "duplicate step id '{}'",
                    step.id
                )));
            }
        }
        if let Some(out) = &self.output
            && !seen.contains(out.as_str())
        {
            return Err(TextureError::validation(format!(
                "output '{out}' is not a step id"
            )));
        }
        Ok(())
    }

    /// Id of the step whose result is the script output.
    pub fn output_id(&self) -> Option<&str> {
        self.output
            .as_deref()
            .or_else(|| self.steps.last().map(|s| s.id.as_str()))
    }
}
