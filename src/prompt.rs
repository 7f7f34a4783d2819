//! Deterministic instruction synthesis.
//!
//! [`build_prompt`] turns the reference set and a [`GenerationConfig`] into the
//! single text part sent to the image model. The output depends only on its
//! inputs; identical inputs always produce byte-identical prompts.

use crate::models::{GenerationConfig, ImageInput};

const IDENTITY_DIRECTIVE: &str = "CRITICAL PRIORITY: FACIAL IDENTITY PRESERVATION.\n\
The subject in the output image MUST be an EXACT visual match to the person in the reference photos. \
Do not generate a generic person who looks similar. You must preserve the specific facial features, \
bone structure, eye shape, nose shape, and skin details of the reference subject exactly.\n\
If the face looks different from the reference, the result is failed. \
Do not beautify, smooth, or alter the person's identity.";

const ROLE_STATEMENT: &str = "ROLE: You are a world-class portrait photographer shooting on high-end 35mm film \
(e.g., Kodak Portra 400).";

const OBJECTIVE: &str = "OBJECTIVE: Create a new photograph of THE EXACT SAME PERSON from the references, \
but in a new setting/outfit.";

const STYLE_GUIDELINES: &str = "CRITICAL STYLE GUIDELINES (ANTI-AI):\n\
- Texture: Skin must have visible pores, micro-texture, and natural irregularities. Do NOT airbrush.\n\
- Lighting: Use natural, physically accurate lighting. Allow for organic shadows and film grain.\n\
- Environment: Backgrounds must feel lived-in and real, never sterile or computer-generated.\n\
- Realism: The result must be indistinguishable from a real photograph taken with a camera.";

pub const TASK_SPECIFICS_HEADER: &str = "TASK SPECIFICS:";

const KEEP_OUTFIT: &str =
    "OUTFIT: Keep the outfit suitable for the context/platform, or similar to reference if not specified.";

const LINKEDIN_OUTFIT_DEFAULT: &str =
    "OUTFIT DEFAULT: If not specified, assume business professional or smart casual.";

const PRESERVE_EXPRESSION: &str = "EXPRESSION: Maintain the subject's natural expression from the reference images, \
but adapt slightly to fit the vibe of the selected platform (e.g., confident for LinkedIn, warm for Dating). \
Do not force a smile if the reference is serious, but ensure it fits the context.";

const APPLY_EXPRESSION: &str = "EXPRESSION CONSISTENCY: Apply the requested expression change naturally and keep it \
in tune with the vibe of the selected platform. Apart from that change, the face must stay exactly the reference person.";

const FINAL_VERIFICATION: &str = "FINAL VERIFICATION: Check the face in your generated image against the reference. \
Is it the same person? If not, correct it. The face must be pixel-perfect to the identity.";

const OUTPUT_QUALITY: &str = "OUTPUT QUALITY: Deliver a raw, uncompressed-looking photograph. \
No plastic skin, no waxy highlights, no over-sharpened edges, no synthetic AI artifacts.";

/// Tone directive selected from the target social platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vibe {
    Professional,
    Approachable,
    Aesthetic,
    Minimalist,
    Warm,
    Generic,
}

/// Precedence-ordered keyword table; the first entry with a matching
/// keyword wins.
const VIBE_TABLE: &[(&[&str], Vibe)] = &[
    (&["linkedin"], Vibe::Professional),
    (&["whatsapp"], Vibe::Approachable),
    (&["instagram"], Vibe::Aesthetic),
    (&["twitter", "x"], Vibe::Minimalist),
    (&["dating", "tinder"], Vibe::Warm),
];

impl Vibe {
    /// Case-insensitive substring match against [`VIBE_TABLE`].
    pub fn for_platform(platform: &str) -> Self {
        let platform = platform.to_lowercase();
        VIBE_TABLE
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|keyword| platform.contains(keyword)))
            .map(|(_, vibe)| *vibe)
            .unwrap_or(Vibe::Generic)
    }

    pub fn directive(&self) -> &'static str {
        match self {
            Vibe::Professional => "VIBE: Professional, corporate, confident, trustworthy, and authoritative. \
Clear, well-lit face. Clean composition. Suitable for a career profile.",
            Vibe::Approachable => "VIBE: Approachable, friendly, stylish but casual. \
A good-looking profile picture that feels personal and authentic. Clear face visibility.",
            Vibe::Aesthetic => "VIBE: Aesthetic, trendy, high-quality lifestyle photography. \
Vibrant lighting, engaging composition, 'influencer' quality. Visually striking.",
            Vibe::Minimalist => "VIBE: Smart, modern, clean, tech-savvy. Minimalist and sharp.",
            Vibe::Warm => "VIBE: Attractive, warm, confident, and inviting. \
Flattering lighting (golden hour or soft studio). Best angle.",
            Vibe::Generic => "VIBE: High quality, engaging, and suitable for this platform.",
        }
    }
}

/// Builds the instruction string for one generation call.
pub fn build_prompt(images: &[ImageInput], config: &GenerationConfig) -> String {
    build_prompt_for(images.len(), config)
}

/// Same as [`build_prompt`] when only the number of references is known.
pub fn build_prompt_for(reference_count: usize, config: &GenerationConfig) -> String {
    let mut sections: Vec<String> = Vec::with_capacity(10);

    let mut opening = String::from(IDENTITY_DIRECTIVE);
    if reference_count > 1 {
        opening.push_str(&format!(
            "\nAll {} reference photos show this same person; use every one of them to lock in the identity.",
            reference_count
        ));
    }
    sections.push(opening);
    sections.push(ROLE_STATEMENT.to_string());
    sections.push(format!("{}\n{}", OBJECTIVE, STYLE_GUIDELINES));

    if let Some(platform) = config.platform_hint() {
        let vibe = Vibe::for_platform(platform);
        let mut clause = format!(
            "INTENDED USE: The photo is for a {} profile. {}",
            platform,
            vibe.directive()
        );
        if vibe == Vibe::Professional && config.style.is_none() {
            clause.push(' ');
            clause.push_str(LINKEDIN_OUTFIT_DEFAULT);
        }
        sections.push(clause);
    }

    let region = config.region_hint();
    if let Some(region) = region {
        sections.push(format!(
            "LOCATION CONTEXT: The photo is taken in {}. Ensure the background architecture, street signs, \
foliage, and lighting vibe reflect this specific region authentically.",
            region
        ));
    }

    let mut expression_changed = false;
    match config.custom_instruction() {
        Some(instruction) => {
            let mut clause = format!("USER INSTRUCTION: {}", instruction);
            if let Some(style) = &config.style {
                clause.push_str(&format!("\nOUTFIT REQUIREMENT: Subject is wearing {}.", style));
            }
            if let Some(background) = &config.background {
                clause.push_str(&format!("\nSETTING REQUIREMENT: Location is {}.", background));
            }
            sections.push(clause);
        }
        None => {
            let mut clause = String::from(TASK_SPECIFICS_HEADER);
            match &config.style {
                Some(style) => clause.push_str(&format!(
                    "\nOUTFIT: Change clothing to {}. Ensure fabrics look realistic \
(heavy cotton, genuine leather sheen, wool texture).",
                    style
                )),
                None => {
                    clause.push('\n');
                    clause.push_str(KEEP_OUTFIT);
                }
            }
            if let Some(expression) = &config.expression {
                clause.push_str(&format!(
                    "\nEXPRESSION: Change the facial expression to {}. The change must come from authentic \
facial muscle movement around the eyes, cheeks, and mouth while the identity stays exactly the same.",
                    expression
                ));
                expression_changed = true;
            }
            if let Some(background) = &config.background {
                clause.push_str(&format!("\nBACKGROUND: Location is {}.", background));
                if let Some(region) = region {
                    clause.push_str(&format!(
                        " Adapt this setting to match the aesthetic of {}.",
                        region
                    ));
                }
            }
            sections.push(clause);
        }
    }

    sections.push(if expression_changed {
        APPLY_EXPRESSION.to_string()
    } else {
        PRESERVE_EXPRESSION.to_string()
    });
    sections.push(FINAL_VERIFICATION.to_string());
    sections.push(OUTPUT_QUALITY.to_string());

    sections.join("\n\n")
}
