use super::*;
use crate::device::DeviceContext;

#[test]
fn canvas_rejects_zero_sizes() {
    let ctx = DeviceContext::host();
    assert!(Canvas::new(&ctx, 0, 4).is_err());
    assert!(Canvas::new(&ctx, 4, 0).is_err());
    let canvas = Canvas::new(&ctx, 3, 2).unwrap();
    assert_eq!(canvas.size(), (3, 2));
    assert_eq!(canvas.buffer_byte_len(), 3 * 2 * 4 * 4);
}

#[test]
fn pixel_buffer_shape_and_texel_layout() {
    let data: Vec<f32> = (0..2 * 3 * 4).map(|v| v as f32).collect();
    let buf = PixelBuffer::new(2, 3, data).unwrap();
    assert_eq!(buf.shape(), (2, 3, 4));
    assert_eq!(buf.texel(0, 0), [0.0, 1.0, 2.0, 3.0]);
    assert_eq!(buf.texel(1, 0), [4.0, 5.0, 6.0, 7.0]);
    assert_eq!(buf.texel(0, 1), [8.0, 9.0, 10.0, 11.0]);
    assert_eq!(buf.min_value(), 0.0);
    assert_eq!(buf.max_value(), 23.0);
}

#[test]
fn pixel_buffer_rejects_wrong_length() {
    assert!(PixelBuffer::new(2, 2, vec![0.0; 15]).is_err());
}

#[test]
fn pixel_buffer_bytes_reinterpret_back() {
    let buf = PixelBuffer::filled(2, 2, 0.25);
    let again = PixelBuffer::from_bytes(2, 2, buf.as_bytes()).unwrap();
    assert_eq!(buf, again);
    assert!(PixelBuffer::from_bytes(2, 2, &[0u8; 7]).is_err());
}

#[test]
fn texture_data_validates_channels() {
    assert!(TextureData::new(2, 2, 0, vec![]).is_err());
    assert!(TextureData::new(2, 2, 5, vec![0.0; 20]).is_err());
    assert!(TextureData::new(2, 2, 3, vec![0.0; 11]).is_err());
    assert!(TextureData::new(2, 2, 3, vec![0.0; 12]).is_ok());
}

#[test]
fn texture_widening_fills_alpha() {
    let tex = TextureData::new(1, 1, 3, vec![0.1, 0.2, 0.3]).unwrap();
    assert_eq!(tex.to_rgba(), vec![0.1, 0.2, 0.3, 1.0]);

    let gray = TextureData::new(1, 1, 1, vec![0.5]).unwrap();
    assert_eq!(gray.to_rgba(), vec![0.5, 0.5, 0.5, 1.0]);
}

#[test]
fn texture_fetch_wraps_coordinates() {
    let tex = TextureData::new(2, 1, 1, vec![1.0, 2.0]).unwrap();
    assert_eq!(tex.fetch_wrapped(-1, 0, 0), 2.0);
    assert_eq!(tex.fetch_wrapped(2, 5, 0), 1.0);
    assert_eq!(tex.fetch_wrapped(1, 0, 3), 2.0);
}
