pub mod gemini;
pub mod generation;
pub mod image;

pub use generation::*;
pub use image::*;
