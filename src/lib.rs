pub mod config;
pub mod error;
pub mod export;
pub mod gemini;
pub mod intake;
pub mod logger;
pub mod models;
pub mod prompt;
pub mod session;

pub use config::Config;
pub use error::{Result, ShootError};
pub use gemini::{ImageClient, ImageGenerator};
pub use intake::{validate_batch, IntakeOutcome};
pub use models::*;
pub use prompt::build_prompt;
pub use session::{Orchestrator, Session, SessionState};
