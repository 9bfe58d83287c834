use std::path::PathBuf;
use std::sync::Arc;

use likeness_core::service::{create_profile, verify_photo};
use likeness_core::{
    AnalysisError, ComparisonResult, EmbeddingExtractor, LandmarkDetector,
    ModelError, OnnxEmbedder, OnnxLandmarker, ProfileGenerator, ProfileStore, ServiceError,
    StoreError,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::config::Config;
use crate::image_input::load_image;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid image format: {0} (expected .jpg, .jpeg or .png)")]
    InvalidImageFormat(String),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to spawn engine thread: {0}")]
    Spawn(std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

impl From<ServiceError> for EngineError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Store(e) => Self::Store(e),
            ServiceError::Analysis(e) => Self::Analysis(e),
        }
    }
}

/// Messages sent from D-Bus handlers to the engine thread.
enum EngineRequest {
    Create {
        image_path: PathBuf,
        reply: oneshot::Sender<Result<String, EngineError>>,
    },
    Verify {
        id: String,
        image_path: PathBuf,
        reply: oneshot::Sender<Result<ComparisonResult, EngineError>>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Request profile creation: decode the image, extract features, store.
    pub async fn create(&self, image_path: PathBuf) -> Result<String, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Create {
                image_path,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    /// Request verification of an image against a stored profile.
    pub async fn verify(&self, id: String, image_path: PathBuf) -> Result<ComparisonResult, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Verify {
                id,
                image_path,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }
}

/// Load both ONNX models. Fails fast if either file is missing.
pub fn load_generator(
    config: &Config,
) -> Result<ProfileGenerator<OnnxLandmarker, OnnxEmbedder>, EngineError> {
    let landmark_path = config.landmark_model_path();
    let landmarks = OnnxLandmarker::load(&landmark_path)?;
    tracing::info!(path = %landmark_path, "landmark model loaded");

    let embedding_path = config.embedding_model_path();
    let embedder = OnnxEmbedder::load(&embedding_path)?;
    tracing::info!(path = %embedding_path, "embedding model loaded");

    Ok(ProfileGenerator::new(landmarks, embedder, config.params.clone()))
}

/// Spawn the engine on a dedicated OS thread.
///
/// The thread owns the generator (and with it the model sessions and the
/// analysis parameters); the store is shared with the D-Bus handlers, which
/// serve get/delete directly.
pub fn spawn_engine<L, E>(
    mut generator: ProfileGenerator<L, E>,
    store: Arc<ProfileStore>,
) -> Result<EngineHandle, EngineError>
where
    L: LandmarkDetector + Send + 'static,
    E: EmbeddingExtractor + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(4);

    std::thread::Builder::new()
        .name("likeness-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Create { image_path, reply } => {
                        let result = run_create(&store, &mut generator, image_path);
                        let _ = reply.send(result);
                    }
                    EngineRequest::Verify {
                        id,
                        image_path,
                        reply,
                    } => {
                        let result = run_verify(&store, &mut generator, &id, image_path);
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })
        .map_err(EngineError::Spawn)?;

    Ok(EngineHandle { tx })
}

fn run_create<L, E>(
    store: &ProfileStore,
    generator: &mut ProfileGenerator<L, E>,
    image_path: PathBuf,
) -> Result<String, EngineError>
where
    L: LandmarkDetector,
    E: EmbeddingExtractor,
{
    let image = load_image(&image_path)?;
    let id = create_profile(store, generator, &image)?;
    Ok(id)
}

/// Unknown ids fail before the image is even decoded.
fn run_verify<L, E>(
    store: &ProfileStore,
    generator: &mut ProfileGenerator<L, E>,
    id: &str,
    image_path: PathBuf,
) -> Result<ComparisonResult, EngineError>
where
    L: LandmarkDetector,
    E: EmbeddingExtractor,
{
    if !store.contains(id) {
        return Err(StoreError::NotFound(id.to_string()).into());
    }
    let image = load_image(&image_path)?;
    let params = generator.params().clone();
    let result = verify_photo(store, id, generator, &image, &params)?;
    Ok(result)
}
