//! Session state and the Generate / Refine / Start Over operations.
//!
//! [`Session`] is plain owned data with an explicit [`SessionState`] tag.
//! [`Orchestrator`] owns one session behind a mutex together with an
//! [`ImageGenerator`], and enforces at most one request in flight: the lock
//! is released while the remote call is awaited, and every mutating
//! operation attempted meanwhile fails with [`ShootError::Busy`]. Start Over
//! is the exception; it always succeeds and orphans the request in flight.

use crate::{
    error::{Result, ShootError},
    gemini::ImageGenerator,
    intake::{self, IntakeOutcome},
    models::{GenerationConfig, GenerationResult, ImageInput, RawFile},
    prompt,
};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    ImagesLoaded,
    Generating,
    Result,
}

#[derive(Debug, Clone)]
pub struct Session {
    images: Vec<ImageInput>,
    config: GenerationConfig,
    history: Vec<GenerationResult>,
    state: SessionState,
    last_error: Option<String>,
    /// Identifies the request that owns the in-flight slot.
    ticket: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            images: Vec::new(),
            config: GenerationConfig::default(),
            history: Vec::new(),
            state: SessionState::Idle,
            last_error: None,
            ticket: 0,
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_generating(&self) -> bool {
        self.state == SessionState::Generating
    }

    pub fn images(&self) -> &[ImageInput] {
        &self.images
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn history(&self) -> &[GenerationResult] {
        &self.history
    }

    pub fn current_result(&self) -> Option<&GenerationResult> {
        self.history.last()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// State implied by the data when nothing is in flight.
    fn settled_state(&self) -> SessionState {
        if !self.history.is_empty() {
            SessionState::Result
        } else if !self.images.is_empty() {
            SessionState::ImagesLoaded
        } else {
            SessionState::Idle
        }
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.is_generating() {
            return Err(ShootError::Busy);
        }
        Ok(())
    }

    pub fn add_images(&mut self, files: Vec<RawFile>) -> Result<IntakeOutcome> {
        self.ensure_idle()?;
        let outcome = match intake::validate_batch(files, self.images.len()) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.last_error = Some(e.to_string());
                return Err(e);
            }
        };
        self.last_error = outcome.failure().map(ToString::to_string);
        self.images.extend(outcome.accepted.iter().cloned());
        self.state = self.settled_state();
        Ok(outcome)
    }

    pub fn remove_image(&mut self, id: &str) -> Result<Option<ImageInput>> {
        self.ensure_idle()?;
        let removed = intake::remove_image(&mut self.images, id);
        self.state = self.settled_state();
        Ok(removed)
    }

    pub fn clear_images(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.images.clear();
        self.state = self.settled_state();
        Ok(())
    }

    pub fn set_config(&mut self, config: GenerationConfig) -> Result<()> {
        self.ensure_idle()?;
        self.config = config;
        Ok(())
    }

    /// Start Over: drops images, configuration, history and error state.
    /// A request still in flight loses its slot and its outcome is discarded.
    pub fn reset(&mut self) -> Result<()> {
        if self.is_generating() {
            log::warn!("Start Over while a generation is in flight; its outcome will be discarded");
        }
        let ticket = self.ticket + 1;
        *self = Session::default();
        self.ticket = ticket;
        Ok(())
    }

    /// Validates a Generate request and moves to `Generating`.
    fn begin_generate(&mut self) -> Result<PendingRequest> {
        self.ensure_idle()?;
        if self.images.is_empty() {
            return Err(self.reject(ShootError::NoImages));
        }
        if !self.config.has_any_dimension() {
            return Err(self.reject(ShootError::NoConfiguration));
        }

        let prompt = prompt::build_prompt(&self.images, &self.config);
        let images = self.images.clone();
        Ok(self.dispatch(images, prompt))
    }

    /// Validates a Refine request and moves to `Generating`. The latest
    /// result becomes the only reference; style, background and expression
    /// are not carried over.
    fn begin_refine(&mut self, instruction: &str) -> Result<PendingRequest> {
        self.ensure_idle()?;
        if instruction.trim().is_empty() {
            return Err(self.reject(ShootError::EmptyRefinement));
        }
        let latest = match self.history.last() {
            Some(result) => result.data_url.clone(),
            None => return Err(self.reject(ShootError::NoResult)),
        };
        let name = format!("result-{}", self.history.len());
        let reference = ImageInput::from_data_url(name, &latest).map_err(|e| {
            log::error!("Latest result cannot be used as a reference: {}", e);
            self.reject(e)
        })?;

        let config = GenerationConfig {
            custom_prompt: instruction.to_string(),
            region: self.config.region.clone(),
            platform: self.config.platform.clone(),
            ..GenerationConfig::default()
        };
        let references = vec![reference];
        let prompt = prompt::build_prompt(&references, &config);
        Ok(self.dispatch(references, prompt))
    }

    fn dispatch(&mut self, images: Vec<ImageInput>, prompt: String) -> PendingRequest {
        let previous = self.state;
        self.state = SessionState::Generating;
        self.last_error = None;
        self.ticket += 1;
        PendingRequest {
            images,
            prompt,
            ticket: self.ticket,
            previous,
        }
    }

    fn owns_slot(&self, ticket: u64) -> bool {
        self.is_generating() && self.ticket == ticket
    }

    fn reject(&mut self, err: ShootError) -> ShootError {
        self.last_error = Some(err.to_string());
        err
    }

    fn finish(
        &mut self,
        ticket: u64,
        previous: SessionState,
        outcome: Result<GenerationResult>,
    ) -> Result<usize> {
        if !self.owns_slot(ticket) {
            log::warn!("Discarding the outcome of a generation dropped by Start Over");
            return Err(ShootError::Cancelled);
        }
        match outcome {
            Ok(result) => {
                self.history.push(result);
                self.state = SessionState::Result;
                self.last_error = None;
                Ok(self.history.len() - 1)
            }
            Err(e) => {
                self.state = previous;
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Hands back a slot whose request never reported an outcome.
    fn abandon(&mut self, ticket: u64, previous: SessionState) {
        if self.owns_slot(ticket) {
            log::warn!("Generation abandoned before it finished");
            self.state = previous;
            self.last_error = Some(ShootError::Cancelled.to_string());
        }
    }
}

struct PendingRequest {
    images: Vec<ImageInput>,
    prompt: String,
    ticket: u64,
    previous: SessionState,
}

fn lock_session(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds the in-flight slot for one dispatched request. Dropped without
/// [`InFlight::settle`] (cancelled future, panicking generator), it returns
/// the session to the state held before dispatch.
struct InFlight<'a> {
    session: &'a Mutex<Session>,
    ticket: u64,
    previous: SessionState,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(mut self, outcome: Result<GenerationResult>) -> Result<usize> {
        self.settled = true;
        lock_session(self.session).finish(self.ticket, self.previous, outcome)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            lock_session(self.session).abandon(self.ticket, self.previous);
        }
    }
}

pub struct Orchestrator<G: ImageGenerator> {
    session: Mutex<Session>,
    generator: G,
}

impl<G: ImageGenerator> Orchestrator<G> {
    pub fn new(generator: G) -> Self {
        Self {
            session: Mutex::new(Session::new()),
            generator,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        lock_session(&self.session)
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// A copy of the current session.
    pub fn snapshot(&self) -> Session {
        self.lock().clone()
    }

    pub fn state(&self) -> SessionState {
        self.lock().state()
    }

    pub fn add_images(&self, files: Vec<RawFile>) -> Result<IntakeOutcome> {
        let outcome = self.lock().add_images(files)?;
        log::info!(
            "Accepted {} reference images ({} skipped, {} rejected)",
            outcome.accepted.len(),
            outcome.skipped.len(),
            outcome.rejected.len()
        );
        Ok(outcome)
    }

    pub fn remove_image(&self, id: &str) -> Result<Option<ImageInput>> {
        self.lock().remove_image(id)
    }

    pub fn clear_images(&self) -> Result<()> {
        self.lock().clear_images()
    }

    pub fn set_config(&self, config: GenerationConfig) -> Result<()> {
        self.lock().set_config(config)
    }

    pub fn reset(&self) -> Result<()> {
        self.lock().reset()?;
        log::info!("Session reset");
        Ok(())
    }

    /// Runs one generation from the reference images and configuration.
    /// Returns the new result's position in the history.
    pub async fn generate(&self) -> Result<usize> {
        let pending = self.lock().begin_generate()?;
        log::info!(
            "Generate: {} reference images via {}",
            pending.images.len(),
            self.generator.model()
        );
        self.run(pending).await
    }

    /// Runs one refinement round against the latest result.
    pub async fn refine(&self, instruction: &str) -> Result<usize> {
        let pending = self.lock().begin_refine(instruction)?;
        log::info!("Refine: {}", instruction.trim());
        self.run(pending).await
    }

    async fn run(&self, pending: PendingRequest) -> Result<usize> {
        let slot = InFlight {
            session: &self.session,
            ticket: pending.ticket,
            previous: pending.previous,
            settled: false,
        };
        let outcome = self
            .generator
            .generate(&pending.images, &pending.prompt)
            .await;
        if let Err(e) = &outcome {
            log::error!("Generation failed: {}", e);
        }
        let index = slot.settle(outcome)?;
        log::info!("Result #{} added to history", index + 1);
        Ok(index)
    }
}
