/// Device selection and tunables.
pub mod config;
/// Canvas, pixel buffers and host textures.
pub mod core;
/// Error type shared by the whole crate.
pub mod error;
