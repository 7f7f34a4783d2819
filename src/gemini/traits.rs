use crate::{
    error::Result,
    models::{GenerationResult, ImageInput},
};
use async_trait::async_trait;

/// Anything that can turn reference images plus a prompt into one image.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, images: &[ImageInput], prompt: &str) -> Result<GenerationResult>;

    fn model(&self) -> &str;
}
