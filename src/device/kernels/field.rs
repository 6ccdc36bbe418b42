use crate::foundation::core::TextureData;

pub(crate) type GradientFn = fn(f32, f32) -> f32;

pub(crate) fn gradient_kernel(key: &str) -> Option<GradientFn> {
    let f: GradientFn = match key {
        "_horizontal_left_grid" => |u, _| 1.0 - u,
        "_horizontal_right_grid" => |u, _| u,
        "_vertical_up_grid" => |_, v| 1.0 - v,
        "_vertical_down_grid" => |_, v| v,
        "_radial_out_grid" => radial_out,
        "_radial_in_grid" => |u, v| 1.0 - radial_out(u, v),
        _ => return None,
    };
    Some(f)
}

fn radial_out(u: f32, v: f32) -> f32 {
    (2.0 * (u - 0.5).hypot(v - 0.5)).clamp(0.0, 1.0)
}

/// Normalized texel-centre coordinates of `(x, y)` on a `width × height` image.
pub(crate) fn texel_uv(x: u32, y: u32, width: u32, height: u32) -> (f32, f32) {
    (
        (x as f32 + 0.5) / width as f32,
        (y as f32 + 0.5) / height as f32,
    )
}

/// Wrapped bilinear sample at `(px, py)` in texel units of `tex`.
///
/// The integer corner is wrapped while still a float, so any finite position stays in range.
fn sample_bilinear(tex: &TextureData, px: f32, py: f32) -> [f32; 4] {
    let qx = px - 0.5;
    let qy = py - 0.5;
    let fx = qx.floor();
    let fy = qy.floor();
    let tx = qx - fx;
    let ty = qy - fy;
    let x0 = fx.rem_euclid(tex.width() as f32) as i64;
    let y0 = fy.rem_euclid(tex.height() as f32) as i64;

    let mut out = [0.0; 4];
    for (c, slot) in out.iter_mut().enumerate() {
        let top = lerp(
            tex.fetch_wrapped(x0, y0, c),
            tex.fetch_wrapped(x0 + 1, y0, c),
            tx,
        );
        let bottom = lerp(
            tex.fetch_wrapped(x0, y0 + 1, c),
            tex.fetch_wrapped(x0 + 1, y0 + 1, c),
            tx,
        );
        *slot = lerp(top, bottom, ty);
    }
    out
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// FBM value at texel `(x, y)` of a `width × height` output, seeded by a four-channel `tex`.
pub(crate) fn fbm(
    tex: &TextureData,
    octaves: u32,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) -> [f32; 4] {
    let (u, v) = texel_uv(x, y, width, height);
    let (tw, th) = (tex.width() as f32, tex.height() as f32);

    let mut value = [0.0f32; 4];
    let mut total = 0.0f32;
    let mut amp = 0.5f32;
    let mut freq = 1.0f32;
    for _ in 0..octaves {
        let (px, py) = (u * tw * freq, v * th * freq);
        // Octaves this far out weigh less than 2^-100 of the sum; same cut-off as the WGSL.
        if px.max(py) > 1.0e37 {
            break;
        }
        let s = sample_bilinear(tex, px, py);
        for (acc, s) in value.iter_mut().zip(s) {
            *acc += amp * s;
        }
        total += amp;
        amp *= 0.5;
        freq *= 2.0;
    }
    value.map(|v| {
        let v = if total > 0.0 { v / total } else { v };
        v.clamp(0.0, 1.0)
    })
}
