use crate::{
    config::Config,
    error::{Result, ShootError},
    gemini::traits::ImageGenerator,
    logger,
    models::{
        gemini::{
            Content, GenerateContentRequest, GenerateContentResponse, Modality, Part,
            RequestGenerationConfig,
        },
        GenerationResult, ImageInput,
    },
};
use async_trait::async_trait;
use reqwest::Client;

const DEFAULT_RESPONSE_MIME: &str = "image/png";

#[derive(Clone)]
pub struct ImageClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl ImageClient {
    /// Fails with `MissingCredentials` before any network activity.
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        Ok(Self {
            client: Client::new(),
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Image parts in reference order, then the prompt as the last part.
    pub fn build_request(images: &[ImageInput], prompt: &str) -> GenerateContentRequest {
        let mut parts: Vec<Part> = images
            .iter()
            .map(|image| Part::inline(image.mime_type.as_str(), image.base64()))
            .collect();
        parts.push(Part::text(prompt));

        GenerateContentRequest {
            contents: vec![Content { role: None, parts }],
            generation_config: RequestGenerationConfig {
                response_modalities: vec![Modality::Image],
            },
        }
    }

    /// Reads the first part of the first candidate; it must carry image data.
    pub fn extract_image(response: &GenerateContentResponse) -> Result<GenerationResult> {
        let inline = response
            .candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .and_then(|content| content.parts.first())
            .and_then(|part| part.inline_data.as_ref())
            .ok_or(ShootError::NoImageProduced)?;

        let data = inline
            .data
            .as_deref()
            .filter(|data| !data.is_empty())
            .ok_or(ShootError::NoImageProduced)?;
        let mime_type = inline
            .mime_type
            .as_deref()
            .filter(|mime| !mime.is_empty())
            .unwrap_or(DEFAULT_RESPONSE_MIME);

        Ok(GenerationResult::new(mime_type, data))
    }

    /// Why a reply carried no image: a prompt block wins over the finish reason.
    fn refusal_reason(response: &GenerateContentResponse) -> String {
        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
        {
            return format!("prompt blocked: {}", reason);
        }
        let finish = response
            .candidates
            .first()
            .and_then(|candidate| candidate.finish_reason.as_deref())
            .unwrap_or("unknown");
        format!("finish reason: {}", finish)
    }
}

#[async_trait]
impl ImageGenerator for ImageClient {
    async fn generate(&self, images: &[ImageInput], prompt: &str) -> Result<GenerationResult> {
        if images.is_empty() {
            return Err(ShootError::NoImages);
        }

        let request = Self::build_request(images, prompt);
        log::info!(
            "Generating image with model: {} ({} reference images)",
            self.model,
            images.len()
        );
        log::debug!("Prompt length: {} characters", prompt.len());

        let _timer = logger::timer("generateContent");
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ShootError::Service(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("Image model returned HTTP {}", status.as_u16());
            return Err(ShootError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ShootError::Serialization(e.to_string()))?;

        let result = Self::extract_image(&payload);
        if result.is_err() {
            log::warn!("Model produced no image ({})", Self::refusal_reason(&payload));
        }
        result
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageMime;
    use serde_json::json;

    #[test]
    fn test_missing_credentials_fail_fast() {
        let err = ImageClient::new(&Config::new()).err().unwrap();
        assert_eq!(err, ShootError::MissingCredentials("API_KEY".into()));
    }

    #[test]
    fn test_endpoint() {
        let client = ImageClient::new(
            &Config::new()
                .with_credentials("k")
                .with_base_url("http://localhost:1234/v1beta/"),
        )
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:1234/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
    }

    #[test]
    fn test_request_part_order() {
        let images = vec![
            ImageInput::new("a.png", ImageMime::Png, b"a".to_vec()),
            ImageInput::new("b.jpg", ImageMime::Jpeg, b"b".to_vec()),
        ];
        let request = ImageClient::build_request(&images, "prompt text");
        let parts = &request.contents[0].parts;

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], Part::inline("image/png", images[0].base64()));
        assert_eq!(parts[1], Part::inline("image/jpeg", images[1].base64()));
        assert_eq!(parts[2], Part::text("prompt text"));
        assert_eq!(request.generation_config.response_modalities, vec![Modality::Image]);
    }

    fn response(value: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_extract_image() {
        let result = ImageClient::extract_image(&response(json!({
            "candidates": [{"content": {"parts": [
                {"inlineData": {"mimeType": "image/jpeg", "data": "aGVsbG8="}}
            ]}}]
        })))
        .unwrap();
        assert_eq!(result.data_url, "data:image/jpeg;base64,aGVsbG8=");
        assert_eq!(result.mime_type, "image/jpeg");
    }

    #[test]
    fn test_extract_defaults_mime() {
        let result = ImageClient::extract_image(&response(json!({
            "candidates": [{"content": {"parts": [{"inlineData": {"data": "aGVsbG8="}}]}}]
        })))
        .unwrap();
        assert_eq!(result.data_url, "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn test_extract_without_image() {
        let text_only = response(json!({
            "candidates": [{"content": {"parts": [{"text": "I can't help with that."}]}}]
        }));
        assert_eq!(
            ImageClient::extract_image(&text_only).unwrap_err(),
            ShootError::NoImageProduced
        );

        let empty = response(json!({"candidates": []}));
        assert_eq!(
            ImageClient::extract_image(&empty).unwrap_err(),
            ShootError::NoImageProduced
        );

        // only the first part is inspected
        let image_second = response(json!({
            "candidates": [{"content": {"parts": [
                {"text": "here you go"},
                {"inlineData": {"mimeType": "image/png", "data": "aGVsbG8="}}
            ]}}]
        }));
        assert!(ImageClient::extract_image(&image_second).is_err());
    }

    #[test]
    fn test_refusal_reason() {
        let blocked = response(json!({
            "candidates": [],
            "promptFeedback": {"blockReason": "SAFETY"}
        }));
        assert_eq!(ImageClient::refusal_reason(&blocked), "prompt blocked: SAFETY");

        let stopped = response(json!({
            "candidates": [{"content": {"parts": [{"text": "no"}]}, "finishReason": "STOP"}]
        }));
        assert_eq!(ImageClient::refusal_reason(&stopped), "finish reason: STOP");
        assert_eq!(
            ImageClient::refusal_reason(&response(json!({}))),
            "finish reason: unknown"
        );
    }
}
