use serde::{Deserialize, Serialize};

use super::value::{Value, coerce};
use super::{
    Launch, Node, allocate_output, configured, set_declared, set_size_uniforms, upload,
};
use crate::device::program::TOKEN_CALC;
use crate::device::{DeviceBuffer, DeviceProgram, ProgramSource, ShaderTemplate, UniformValue};
use crate::foundation::core::{Canvas, Extent, PixelBuffer};
use crate::foundation::error::{TextureError, TextureResult};

/// Elementwise operation of the arithmetic family. All four channels, alpha included, are
/// transformed identically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    Add,
    Multiply,
    Divide,
    Power,
    Atan2,
    /// `max(min(x, max_bound), min_bound)` with bounds from [`OpNode::clamp`].
    Clamp,
    OneMinus,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    SinH,
    CosH,
    TanH,
    /// Natural logarithm.
    Log,
    Log2,
    /// `a * (1 - t) + b * t`, inputs `(a, b, t)`.
    Mix,
    /// Cubic Hermite step, inputs `(edge0, edge1, x)`.
    Smoothstep,
}

impl Op {
    pub const ALL: [Op; 19] = [
        Op::Add,
        Op::Multiply,
        Op::Divide,
        Op::Power,
        Op::Atan2,
        Op::Clamp,
        Op::OneMinus,
        Op::Sin,
        Op::Cos,
        Op::Tan,
        Op::Asin,
        Op::Acos,
        Op::SinH,
        Op::CosH,
        Op::TanH,
        Op::Log,
        Op::Log2,
        Op::Mix,
        Op::Smoothstep,
    ];

    /// Number of operands bound to slots `1..=arity`.
    pub fn arity(self) -> usize {
        match self {
            Op::Add | Op::Multiply | Op::Divide | Op::Power | Op::Atan2 => 2,
            Op::Mix | Op::Smoothstep => 3,
            _ => 1,
        }
    }

    pub fn template(self) -> ShaderTemplate {
        match self {
            Op::Mix | Op::Smoothstep => ShaderTemplate::Mix,
            _ => ShaderTemplate::Math,
        }
    }

    /// Function selected through the template's `%CALC%` token.
    pub fn kernel_key(self) -> &'static str {
        match self {
            Op::Add => "_add",
            Op::Multiply => "_mul",
            Op::Divide => "_div",
            Op::Power => "_pow",
            Op::Atan2 => "_atan2",
            Op::Clamp => "_clamp",
            Op::OneMinus => "_oneminus",
            Op::Sin => "_sin",
            Op::Cos => "_cos",
            Op::Tan => "_tan",
            Op::Asin => "_asin",
            Op::Acos => "_acos",
            Op::SinH => "_sinh",
            Op::CosH => "_cosh",
            Op::TanH => "_tanh",
            Op::Log => "_log",
            Op::Log2 => "_log2",
            Op::Mix => "_mix",
            Op::Smoothstep => "_smoothstep",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Op::Add => "add",
            Op::Multiply => "multiply",
            Op::Divide => "divide",
            Op::Power => "power",
            Op::Atan2 => "atan2",
            Op::Clamp => "clamp",
            Op::OneMinus => "one_minus",
            Op::Sin => "sin",
            Op::Cos => "cos",
            Op::Tan => "tan",
            Op::Asin => "asin",
            Op::Acos => "acos",
            Op::SinH => "sin_h",
            Op::CosH => "cos_h",
            Op::TanH => "tan_h",
            Op::Log => "log",
            Op::Log2 => "log2",
            Op::Mix => "mix",
            Op::Smoothstep => "smoothstep",
        }
    }

    pub fn from_name(name: &str) -> Option<Op> {
        Op::ALL.into_iter().find(|op| op.name() == name)
    }
}

#[derive(Debug)]
struct OpState {
    canvas: Canvas,
    program: DeviceProgram,
    inputs: Vec<DeviceBuffer>,
    output: DeviceBuffer,
}

/// One-shot shader operation: one dispatch per `execute()`.
#[derive(Debug)]
pub struct OpNode {
    op: Op,
    bounds: (f32, f32),
    state: Option<OpState>,
}

impl OpNode {
    pub fn new(op: Op) -> Self {
        Self {
            op,
            bounds: (0.0, 1.0),
            state: None,
        }
    }

    /// Clamp with explicit bounds. [`OpNode::new`]`(Op::Clamp)` clamps to `[0, 1]`.
    pub fn clamp(min: f32, max: f32) -> Self {
        Self {
            bounds: (min, max),
            ..Self::new(Op::Clamp)
        }
    }

    pub fn op(&self) -> Op {
        self.op
    }

    /// Compile the op's program, coerce `inputs` to full-resolution buffers and upload them.
    ///
    /// Buffer inputs must match the size of `extent`.
    pub fn configure(
        &mut self,
        extent: &impl Extent,
        inputs: &[Value<'_>],
    ) -> TextureResult<&mut Self> {
        let canvas = extent.canvas()?.clone();
        let name = self.op.name();
        if inputs.len() != self.op.arity() {
            return Err(TextureError::validation(format!(
                "{name} takes {} inputs, got {}",
                self.op.arity(),
                inputs.len()
            )));
        }

        let mut buffers = Vec::with_capacity(inputs.len());
        for (i, value) in inputs.iter().enumerate() {
            let buf = coerce(*value, canvas.width(), canvas.height());
            if buf.size() != canvas.size() {
                return Err(TextureError::validation(format!(
                    "{name} input {i} is {}x{}, canvas is {}x{}",
                    buf.width(),
                    buf.height(),
                    canvas.width(),
                    canvas.height()
                )));
            }
            buffers.push(upload(&canvas, &buf)?);
        }

        let source =
            ProgramSource::new(self.op.template()).inject(TOKEN_CALC, self.op.kernel_key());
        let program = canvas.context().compile(&source)?;
        let output = allocate_output(&canvas)?;

        let (min, max) = self.bounds;
        let is_clamp = self.op == Op::Clamp;
        canvas.context().with(|device| {
            let h = program.handle();
            set_size_uniforms(device, h, &canvas)?;
            if is_clamp {
                set_declared(device, h, "u_clamp_min_value", UniformValue::F32(min))?;
                set_declared(device, h, "u_clamp_max_value", UniformValue::F32(max))?;
            }
            Ok(())
        })?;

        self.state = Some(OpState {
            canvas,
            program,
            inputs: buffers,
            output,
        });
        Ok(self)
    }
}

impl Extent for OpNode {
    fn canvas(&self) -> TextureResult<&Canvas> {
        configured(self.state.as_ref().map(|s| &s.canvas), self.op.name())
    }
}

impl Node for OpNode {
    type Output = PixelBuffer;

    fn name(&self) -> &'static str {
        self.op.name()
    }

    fn execute(&mut self) -> TextureResult<PixelBuffer> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| TextureError::not_configured(self.op.name()))?;

        let mut buffers = vec![(&state.output, 0)];
        buffers.extend(state.inputs.iter().zip(1u32..));

        Launch {
            node: self.op.name(),
            canvas: &state.canvas,
            program: &state.program,
            buffers,
            textures: Vec::new(),
        }
        .run_and_read(&state.output)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/node/op.rs"]
mod tests;
