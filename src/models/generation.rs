use crate::error::{Result, ShootError};
use crate::models::image::{data_url, split_data_url};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A fixed set of preset labels offered for one configuration dimension.
pub trait Vocabulary: Copy + Sized + 'static {
    const ALL: &'static [Self];

    fn label(&self) -> &'static str;

    /// Exact label match only.
    fn from_label(text: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|value| value.label() == text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutfitStyle {
    Casual,
    FormalSuit,
    ZipperHoodie,
    LeatherJacket,
    CyberpunkTechwear,
}

impl Vocabulary for OutfitStyle {
    const ALL: &'static [Self] = &[
        OutfitStyle::Casual,
        OutfitStyle::FormalSuit,
        OutfitStyle::ZipperHoodie,
        OutfitStyle::LeatherJacket,
        OutfitStyle::CyberpunkTechwear,
    ];

    fn label(&self) -> &'static str {
        match self {
            OutfitStyle::Casual => "Casual",
            OutfitStyle::FormalSuit => "Formal Suit",
            OutfitStyle::ZipperHoodie => "Zipper Hoodie",
            OutfitStyle::LeatherJacket => "Leather Jacket",
            OutfitStyle::CyberpunkTechwear => "Cyberpunk Techwear",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackgroundType {
    Studio,
    Office,
    Home,
    Balcony,
    Outdoor,
    Neon,
}

impl Vocabulary for BackgroundType {
    const ALL: &'static [Self] = &[
        BackgroundType::Studio,
        BackgroundType::Office,
        BackgroundType::Home,
        BackgroundType::Balcony,
        BackgroundType::Outdoor,
        BackgroundType::Neon,
    ];

    fn label(&self) -> &'static str {
        match self {
            BackgroundType::Studio => "Pro Studio",
            BackgroundType::Office => "Modern Office",
            BackgroundType::Home => "Cozy Home",
            BackgroundType::Balcony => "Luxury Balcony",
            BackgroundType::Outdoor => "Urban Bokeh",
            BackgroundType::Neon => "Neon City",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expression {
    Smiling,
    Laughing,
    Serious,
    Neutral,
}

impl Vocabulary for Expression {
    const ALL: &'static [Self] = &[
        Expression::Smiling,
        Expression::Laughing,
        Expression::Serious,
        Expression::Neutral,
    ];

    fn label(&self) -> &'static str {
        match self {
            Expression::Smiling => "Smiling",
            Expression::Laughing => "Laughing",
            Expression::Serious => "Serious",
            Expression::Neutral => "Neutral",
        }
    }
}

/// Either one of the preset values or free text typed by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Choice<T> {
    Preset(T),
    Custom(String),
}

impl<T: Vocabulary> Choice<T> {
    /// Blank input yields `None`, an exact preset label yields `Preset`.
    /// Anything else is kept as typed.
    pub fn parse(text: &str) -> Option<Self> {
        if text.trim().is_empty() {
            return None;
        }
        Some(match T::from_label(text) {
            Some(preset) => Choice::Preset(preset),
            None => Choice::Custom(text.to_string()),
        })
    }

    pub fn as_str(&self) -> &str {
        match self {
            Choice::Preset(preset) => preset.label(),
            Choice::Custom(text) => text,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Choice::Custom(_))
    }
}

impl<T: Vocabulary> fmt::Display for Choice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<T> From<T> for Choice<T>
where
    T: Vocabulary,
{
    fn from(preset: T) -> Self {
        Choice::Preset(preset)
    }
}

/// The structured intent for one generation call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub style: Option<Choice<OutfitStyle>>,
    pub background: Option<Choice<BackgroundType>>,
    pub expression: Option<Choice<Expression>>,
    pub custom_prompt: String,
    pub region: String,
    pub platform: Option<String>,
}

impl GenerationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_style(mut self, style: impl Into<Choice<OutfitStyle>>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_background(mut self, background: impl Into<Choice<BackgroundType>>) -> Self {
        self.background = Some(background.into());
        self
    }

    pub fn with_expression(mut self, expression: impl Into<Choice<Expression>>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    pub fn with_custom_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.custom_prompt = prompt.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn custom_instruction(&self) -> Option<&str> {
        non_blank(&self.custom_prompt)
    }

    pub fn region_hint(&self) -> Option<&str> {
        non_blank(&self.region)
    }

    pub fn platform_hint(&self) -> Option<&str> {
        self.platform.as_deref().and_then(non_blank)
    }

    /// At least one of style, background, expression, custom instruction
    /// or region must be set before a request may be issued.
    pub fn has_any_dimension(&self) -> bool {
        self.style.is_some()
            || self.background.is_some()
            || self.expression.is_some()
            || self.custom_instruction().is_some()
            || self.region_hint().is_some()
    }
}

fn non_blank(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// One produced image, kept as a display-ready data URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub data_url: String,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
}

impl GenerationResult {
    pub fn new(mime_type: impl Into<String>, base64: &str) -> Self {
        let mime_type = mime_type.into();
        Self {
            data_url: data_url(&mime_type, base64),
            mime_type,
            created_at: Utc::now(),
        }
    }

    pub fn base64(&self) -> Result<&str> {
        split_data_url(&self.data_url).map(|(_, payload)| payload)
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        let payload = self.base64()?;
        STANDARD
            .decode(payload)
            .map_err(|e| ShootError::InvalidImage(e.to_string()))
    }
}
