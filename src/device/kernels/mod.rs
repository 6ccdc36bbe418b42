//! Host evaluations of the shader templates, texel by texel. The host device dispatches these.

pub(crate) mod field;
pub(crate) mod math;
pub(crate) mod raymarch;
