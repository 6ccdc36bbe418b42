use std::collections::HashMap;

use super::model::{SceneDef, ScriptDef, Step, StepKind, reference};
use crate::device::DeviceContext;
use crate::foundation::core::{Canvas, PixelBuffer, TextureData};
use crate::foundation::error::{TextureError, TextureResult};
use crate::node::{
    CameraInfo, Constant, CpuRandom, FbmNoise, Gradient, LightInfo, Node, NoiseTexture, Op,
    OpNode, Value,
};
use crate::pipeline::RaymarchPipeline;
use crate::scene::{Bxdf, DistanceField};

/// Results of a script run, keyed by step id.
#[derive(Debug, Default)]
pub struct ScriptResults {
    order: Vec<String>,
    values: HashMap<String, PixelBuffer>,
    output: Option<String>,
}

impl ScriptResults {
    pub fn get(&self, id: &str) -> Option<&PixelBuffer> {
        self.values.get(id)
    }

    /// Step ids in execution order.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn output(&self) -> Option<&PixelBuffer> {
        self.output.as_deref().and_then(|id| self.get(id))
    }
}

pub(super) fn run(def: &ScriptDef, ctx: &DeviceContext) -> TextureResult<ScriptResults> {
    let canvas = Canvas::new(ctx, def.width, def.height)?;
    let mut results = ScriptResults {
        output: def.output_id().map(str::to_owned),
        ..ScriptResults::default()
    };
    for step in &def.steps {
        let _span = tracing::debug_span!("step", id = %step.id, node = step.kind.name()).entered();
        let out = run_step(step, &canvas, &results)?;
        results.order.push(step.id.clone());
        results.values.insert(step.id.clone(), out);
    }
    Ok(results)
}

fn run_step(step: &Step, canvas: &Canvas, done: &ScriptResults) -> TextureResult<PixelBuffer> {
    match &step.kind {
        StepKind::Constant { value } => Constant::new(*value).configure(canvas, None)?.execute(),
        StepKind::CpuRandom { min, max, seed } => {
            let mut node = CpuRandom::new(*min, *max);
            if let Some(seed) = seed {
                node = node.with_seed(*seed);
            }
            node.configure(canvas)?.execute()
        }
        StepKind::FbmNoise {
            octaves,
            seed,
            texture,
        } => {
            let mut node = FbmNoise::new();
            if let Some(octaves) = octaves {
                node = node.with_octaves(*octaves);
            }
            if let Some(seed) = seed {
                node = node.with_seed(*seed);
            }
            let texture = match texture {
                Some(id) => {
                    let seed = lookup(done, &step.id, id)?;
                    Some(NoiseTexture::Array(TextureData::from(seed)))
                }
                None => None,
            };
            node.configure(canvas, texture)?.execute()
        }
        StepKind::Gradient { kind } => Gradient::new(*kind).configure(canvas)?.execute(),
        StepKind::Op {
            op,
            inputs,
            min,
            max,
        } => {
            let values = inputs
                .iter()
                .map(|v| operand(done, &step.id, v))
                .collect::<TextureResult<Vec<_>>>()?;
            let mut node = if *op == Op::Clamp {
                OpNode::clamp(min.unwrap_or(0.0), max.unwrap_or(1.0))
            } else {
                OpNode::new(*op)
            };
            node.configure(canvas, &values)?.execute()
        }
        StepKind::Raymarch {
            scene,
            max_steps,
            camera,
            light,
        } => {
            let field = match scene {
                SceneDef::Demo => DistanceField::demo_scene(),
                SceneDef::UnitSphere => DistanceField::unit_sphere(),
            };
            let camera: Option<CameraInfo> = camera.map(Into::into);
            let light: Option<LightInfo> = light.map(Into::into);
            RaymarchPipeline::with_max_steps(
                canvas,
                &field,
                &Bxdf::lambert(),
                light.as_ref(),
                camera.as_ref(),
                *max_steps,
            )?
            .render_frame()
        }
    }
}

fn lookup<'a>(done: &'a ScriptResults, step: &str, id: &str) -> TextureResult<&'a PixelBuffer> {
    done.get(id).ok_or_else(|| {
        TextureError::validation(format!("step '{step}' references unknown step '{id}'"))
    })
}

/// A number or an `"@id"` reference; anything else is an unsupported value.
fn operand<'a>(
    done: &'a ScriptResults,
    step: &str,
    v: &serde_json::Value,
) -> TextureResult<Value<'a>> {
    if let Some(id) = v.as_str().and_then(reference) {
        return lookup(done, step, id).map(Value::Buffer);
    }
    Value::try_from(v).map_err(|e| match e {
        TextureError::UnsupportedValueType(msg) => {
            TextureError::unsupported_value(format!("step '{step}': {msg}"))
        }
        other => other,
    })
}
