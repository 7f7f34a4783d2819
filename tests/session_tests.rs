use async_trait::async_trait;
use proshoot::{
    Choice, GenerationConfig, GenerationResult, ImageGenerator, ImageInput, Orchestrator, OutfitStyle,
    RawFile, SessionState, ShootError,
};
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, Notify};

/// Blocks every call until released, then answers with a fixed image.
struct GatedGenerator {
    started: Notify,
    release: Mutex<Option<oneshot::Receiver<()>>>,
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageGenerator for GatedGenerator {
    async fn generate(&self, _images: &[ImageInput], prompt: &str) -> proshoot::Result<GenerationResult> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let gate = self.release.lock().unwrap().take();
        self.started.notify_one();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(GenerationResult::new("image/png", "aGVsbG8="))
    }

    fn model(&self) -> &str {
        "gated"
    }
}

fn gated(release: Option<oneshot::Receiver<()>>) -> GatedGenerator {
    GatedGenerator {
        started: Notify::new(),
        release: Mutex::new(release),
        prompts: Mutex::new(Vec::new()),
    }
}

fn photo(name: &str) -> RawFile {
    RawFile::new(name, "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0])
}

#[tokio::test]
async fn test_single_request_in_flight() {
    let (tx, rx) = oneshot::channel();
    let orchestrator = Arc::new(Orchestrator::new(gated(Some(rx))));
    orchestrator.add_images(vec![photo("me.jpg")]).unwrap();
    orchestrator
        .set_config(GenerationConfig::new().with_region("Nairobi"))
        .unwrap();

    let running = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.generate().await })
    };
    orchestrator.generator().started.notified().await;

    assert_eq!(orchestrator.state(), SessionState::Generating);
    assert_eq!(orchestrator.generate().await.unwrap_err(), ShootError::Busy);
    assert_eq!(orchestrator.refine("brighter").await.unwrap_err(), ShootError::Busy);
    assert_eq!(
        orchestrator.add_images(vec![photo("other.jpg")]).unwrap_err(),
        ShootError::Busy
    );

    tx.send(()).unwrap();
    assert_eq!(running.await.unwrap().unwrap(), 0);

    let session = orchestrator.snapshot();
    assert_eq!(session.state(), SessionState::Result);
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.images().len(), 1);
    assert_eq!(orchestrator.generator().prompts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_generate_refine_start_over() {
    let orchestrator = Orchestrator::new(gated(None));

    assert_eq!(orchestrator.state(), SessionState::Idle);
    let outcome = orchestrator
        .add_images(vec![photo("a.jpg"), photo("b.jpg")])
        .unwrap();
    assert_eq!(outcome.accepted.len(), 2);
    assert_eq!(orchestrator.state(), SessionState::ImagesLoaded);

    orchestrator
        .set_config(GenerationConfig::new().with_style(Choice::<OutfitStyle>::Custom("Casual Everyday".into())))
        .unwrap();
    orchestrator.generate().await.unwrap();
    orchestrator.refine("Add a soft window light").await.unwrap();
    orchestrator.refine("Slightly wider crop").await.unwrap();

    let session = orchestrator.snapshot();
    assert_eq!(session.history().len(), 3);
    assert_eq!(session.state(), SessionState::Result);

    {
        let prompts = orchestrator.generator().prompts.lock().unwrap();
        assert!(prompts[0].contains("OUTFIT: Change clothing to Casual Everyday."));
        assert!(prompts[0].contains("All 2 reference photos"));
        assert!(!prompts[0].contains("LOCATION CONTEXT"));
        assert!(prompts[2].contains("USER INSTRUCTION: Slightly wider crop"));
        assert!(!prompts[2].contains("TASK SPECIFICS"));
        assert!(!prompts[2].contains("Casual Everyday"));
    }

    orchestrator.reset().unwrap();
    let session = orchestrator.snapshot();
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.history().is_empty());
    assert!(session.images().is_empty());
    assert_eq!(orchestrator.generate().await.unwrap_err(), ShootError::NoImages);
}

#[tokio::test]
async fn test_start_over_during_generation() {
    let (tx, rx) = oneshot::channel();
    let orchestrator = Arc::new(Orchestrator::new(gated(Some(rx))));
    orchestrator.add_images(vec![photo("me.jpg")]).unwrap();
    orchestrator
        .set_config(GenerationConfig::new().with_style(OutfitStyle::FormalSuit))
        .unwrap();

    let running = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.generate().await })
    };
    orchestrator.generator().started.notified().await;

    orchestrator.reset().unwrap();
    assert_eq!(orchestrator.state(), SessionState::Idle);

    tx.send(()).unwrap();
    assert_eq!(running.await.unwrap().unwrap_err(), ShootError::Cancelled);

    let session = orchestrator.snapshot();
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.history().is_empty());
    assert!(session.images().is_empty());
}

#[tokio::test]
async fn test_aborted_generation_can_start_over() {
    let (_hold, rx) = oneshot::channel::<()>();
    let orchestrator = Arc::new(Orchestrator::new(gated(Some(rx))));
    orchestrator.add_images(vec![photo("me.jpg")]).unwrap();
    orchestrator
        .set_config(GenerationConfig::new().with_region("Oslo"))
        .unwrap();

    let running = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.generate().await })
    };
    orchestrator.generator().started.notified().await;
    running.abort();
    assert!(running.await.unwrap_err().is_cancelled());

    assert_eq!(orchestrator.state(), SessionState::ImagesLoaded);
    orchestrator.reset().unwrap();
    assert_eq!(orchestrator.state(), SessionState::Idle);
}
