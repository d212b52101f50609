pub mod chunker;
pub mod encoding;
pub mod fonts;
pub mod rasterizer;
pub mod sanitize;
pub mod settings;
