use clap::Parser;
use proshoot::{
    export,
    logger::{self, LogLevel, LoggerConfig},
    BackgroundType, Choice, Config, Expression, GenerationConfig, ImageClient, Orchestrator,
    OutfitStyle, RawFile, Vocabulary,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "proshoot", version, about = "Re-shoot a portrait with the Gemini image model")]
struct Cli {
    /// Reference photos of the subject (1-4, png/jpeg/webp, 6MB each)
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Outfit: Casual, Formal Suit, Zipper Hoodie, Leather Jacket,
    /// Cyberpunk Techwear, or any description
    #[arg(long)]
    style: Option<String>,

    /// Background: Pro Studio, Modern Office, Cozy Home, Luxury Balcony,
    /// Urban Bokeh, Neon City, or any description
    #[arg(long)]
    background: Option<String>,

    /// Facial expression: Smiling, Laughing, Serious, Neutral, or any description
    #[arg(long)]
    expression: Option<String>,

    /// Free-form instruction; replaces the structured task section
    #[arg(long, default_value = "")]
    prompt: String,

    /// City or region the scene should reflect
    #[arg(long, default_value = "")]
    region: String,

    /// Target platform, e.g. "LinkedIn" or "Instagram"
    #[arg(long)]
    platform: Option<String>,

    /// Refinement instruction applied to the latest result; repeatable
    #[arg(long = "refine")]
    refinements: Vec<String>,

    /// Directory for the generated images
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Debug logging; otherwise PROSHOOT_LOG (trace, debug, info, warn, error) or info
    #[arg(short, long)]
    verbose: bool,
}

fn preset_help() -> String {
    fn labels<T: Vocabulary>() -> String {
        T::ALL.iter().map(|v| v.label()).collect::<Vec<_>>().join(", ")
    }
    format!(
        "styles: {}\nbackgrounds: {}\nexpressions: {}",
        labels::<OutfitStyle>(),
        labels::<BackgroundType>(),
        labels::<Expression>()
    )
}

impl Cli {
    fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            style: self.style.as_deref().and_then(Choice::parse),
            background: self.background.as_deref().and_then(Choice::parse),
            expression: self.expression.as_deref().and_then(Choice::parse),
            custom_prompt: self.prompt.clone(),
            region: self.region.clone(),
            platform: self.platform.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv_loaded = dotenv::dotenv().is_ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        std::env::var("PROSHOOT_LOG")
            .ok()
            .and_then(|name| LogLevel::parse(&name))
            .unwrap_or(LogLevel::Info)
    };
    if let Err(e) = logger::init_with_config(LoggerConfig::new().with_level(level)) {
        eprintln!("{}", e);
    }
    logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    if dotenv_loaded {
        log::info!("✅ .env file loaded");
    } else {
        log::debug!("No .env file found, using system environment variables");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> proshoot::Result<()> {
    let config = Config::from_env();
    logger::log_config_info(&config);
    let client = ImageClient::new(&config)?;

    let orchestrator = Orchestrator::new(client);

    let files = cli
        .images
        .iter()
        .map(RawFile::from_path)
        .collect::<proshoot::Result<Vec<_>>>()?;
    let outcome = orchestrator.add_images(files)?;
    for rejection in &outcome.rejected {
        log::warn!("{}", rejection);
    }
    for name in &outcome.skipped {
        log::warn!("Skipped {}: not a png, jpeg or webp image", name);
    }

    let generation = cli.generation_config();
    for (dimension, choice) in [
        ("style", generation.style.as_ref().map(|c| (c.as_str(), c.is_custom()))),
        ("background", generation.background.as_ref().map(|c| (c.as_str(), c.is_custom()))),
        ("expression", generation.expression.as_ref().map(|c| (c.as_str(), c.is_custom()))),
    ] {
        if let Some((value, custom)) = choice {
            log::debug!("{}: {}{}", dimension, value, if custom { " (custom)" } else { "" });
        }
    }
    orchestrator.set_config(generation)?;

    if let Err(e) = orchestrator.generate().await {
        if matches!(e, proshoot::ShootError::NoConfiguration) {
            log::info!("Presets:\n{}", preset_help());
        }
        return Err(e);
    }
    save_latest(&orchestrator, &cli.out)?;

    for instruction in &cli.refinements {
        orchestrator.refine(instruction).await?;
        save_latest(&orchestrator, &cli.out)?;
    }

    Ok(())
}

fn save_latest(orchestrator: &Orchestrator<ImageClient>, dir: &Path) -> proshoot::Result<()> {
    let session = orchestrator.snapshot();
    if let Some(result) = session.current_result() {
        let path = export::save_result(result, dir)?;
        println!("{}", path.display());
    }
    Ok(())
}
