pub mod image_client;
pub mod traits;

pub use image_client::ImageClient;
pub use traits::ImageGenerator;
