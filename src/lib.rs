//! Node-style procedural texture generation on compute shaders.
//!
//! Create one [`DeviceContext`] per program, wrap it in a [`Canvas`] of the output size and chain
//! nodes from it: each node is configured from its predecessor and produces an `(width, height, 4)`
//! `f32` [`PixelBuffer`] per `execute()`.
//!
//! ```
//! use textureshop::{Canvas, DeviceContext, Node, Op, OpNode, Value};
//!
//! let ctx = DeviceContext::host();
//! let canvas = Canvas::new(&ctx, 1, 1)?;
//! let out = OpNode::new(Op::Add)
//!     .configure(&canvas, &[Value::Scalar(0.1), Value::Scalar(0.2)])?
//!     .execute()?;
//! assert!((out.texel(0, 0)[0] - 0.3).abs() < 1e-6);
//! # Ok::<(), textureshop::TextureError>(())
//! ```
#![forbid(unsafe_code)]

pub mod device;
pub mod encode;
pub mod foundation;
pub mod node;
pub mod pipeline;
pub mod scene;
pub mod script;

pub use device::{DeviceContext, ProgramSource, ShaderTemplate};
pub use foundation::config::{BackendKind, DeviceSettings, PowerPreference};
pub use foundation::core::{Canvas, Extent, PixelBuffer, TextureData};
pub use foundation::error::{TextureError, TextureResult};
pub use node::{
    CameraInfo, Constant, CpuRandom, DeferredLightNode, FbmNoise, GBuffer, Gradient, GradientKind,
    LightInfo, Node, NoiseTexture, Op, OpNode, RaymarchNode, Value,
};
pub use pipeline::RaymarchPipeline;
pub use scene::{Bxdf, DistanceField};
pub use script::GraphScript;
