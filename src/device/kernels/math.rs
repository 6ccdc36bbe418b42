use crate::device::uniforms::UniformBlock;

/// Unary/binary op of the math template. Unary ops ignore `b`.
pub(crate) type MathFn = fn(f32, f32, &UniformBlock) -> f32;
/// Ternary op of the mix template.
pub(crate) type MixFn = fn(f32, f32, f32) -> f32;

/// Kernel for a `%CALC%` key of the math template.
pub(crate) fn math_kernel(key: &str) -> Option<MathFn> {
    let f: MathFn = match key {
        "_add" => |a, b, _| a + b,
        "_mul" => |a, b, _| a * b,
        "_div" => |a, b, _| a / b,
        "_pow" => |a, b, _| a.powf(b),
        "_atan2" => |a, b, _| a.atan2(b),
        "_clamp" => |a, _, u| a.min(u.u_clamp_max_value).max(u.u_clamp_min_value),
        "_oneminus" => |a, _, _| 1.0 - a,
        "_sin" => |a, _, _| a.sin(),
        "_cos" => |a, _, _| a.cos(),
        "_tan" => |a, _, _| a.tan(),
        "_asin" => |a, _, _| a.asin(),
        "_acos" => |a, _, _| a.acos(),
        "_sinh" => |a, _, _| a.sinh(),
        "_cosh" => |a, _, _| a.cosh(),
        "_tanh" => |a, _, _| a.tanh(),
        "_log" => |a, _, _| a.ln(),
        "_log2" => |a, _, _| a.log2(),
        _ => return None,
    };
    Some(f)
}

/// Kernel for a `%CALC%` key of the mix template.
pub(crate) fn mix_kernel(key: &str) -> Option<MixFn> {
    let f: MixFn = match key {
        "_mix" => |a, b, t| a * (1.0 - t) + b * t,
        "_smoothstep" => |e0, e1, x| {
            let t = ((x - e0) / (e1 - e0)).clamp(0.0, 1.0);
            t * t * (3.0 - 2.0 * t)
        },
        _ => return None,
    };
    Some(f)
}
