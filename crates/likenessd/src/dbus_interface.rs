use std::path::PathBuf;
use std::sync::Arc;

use likeness_core::{ComparisonResult, ProfileStore, StoreError};
use zbus::interface;

use crate::engine::{EngineError, EngineHandle};
use crate::image_input::check_format;

pub const BUS_NAME: &str = "org.freedesktop.Likeness1";
pub const OBJECT_PATH: &str = "/org/freedesktop/Likeness1";

/// D-Bus interface for the Likeness profile daemon.
///
/// Bus name: org.freedesktop.Likeness1
/// Object path: /org/freedesktop/Likeness1
pub struct LikenessService {
    engine: EngineHandle,
    store: Arc<ProfileStore>,
}

impl LikenessService {
    pub fn new(engine: EngineHandle, store: Arc<ProfileStore>) -> Self {
        Self { engine, store }
    }
}

fn to_fdo(err: EngineError) -> zbus::fdo::Error {
    match err {
        EngineError::Store(StoreError::NotFound(_)) => {
            zbus::fdo::Error::FileNotFound("Profile not found".into())
        }
        EngineError::InvalidImageFormat(_) | EngineError::Image(_) | EngineError::Analysis(_) => {
            zbus::fdo::Error::InvalidArgs(err.to_string())
        }
        other => zbus::fdo::Error::Failed(other.to_string()),
    }
}

/// JSON body returned by `VerifyPhoto`.
pub fn verification_json(result: &ComparisonResult) -> serde_json::Value {
    serde_json::json!({
        "message": result.message(),
        "is_deepfaked": result.is_deepfaked,
        "confidence": result.confidence,
        "scores": result.scores,
    })
}

#[interface(name = "org.freedesktop.Likeness1")]
impl LikenessService {
    /// Build a profile from the image at `image_path` and return its id.
    async fn create_profile(&self, image_path: &str) -> zbus::fdo::Result<String> {
        tracing::info!(image_path, "create_profile requested");
        let path = PathBuf::from(image_path);
        check_format(&path).map_err(to_fdo)?;
        self.engine.create(path).await.map_err(to_fdo)
    }

    /// Return the stored profile as JSON.
    async fn get_profile(&self, id: &str) -> zbus::fdo::Result<String> {
        tracing::info!(id, "get_profile requested");
        let profile = self
            .store
            .get(id)
            .map_err(|e| to_fdo(EngineError::Store(e)))?;
        serde_json::to_string(&profile).map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
    }

    /// Remove a stored profile.
    async fn delete_profile(&self, id: &str) -> zbus::fdo::Result<String> {
        tracing::info!(id, "delete_profile requested");
        self.store
            .delete(id)
            .map_err(|e| to_fdo(EngineError::Store(e)))?;
        Ok(format!("Removed profile with id {id}"))
    }

    /// Verify the image at `image_path` against profile `id`.
    async fn verify_photo(&self, id: &str, image_path: &str) -> zbus::fdo::Result<String> {
        tracing::info!(id, image_path, "verify_photo requested");
        if !self.store.contains(id) {
            return Err(to_fdo(EngineError::Store(StoreError::NotFound(id.to_string()))));
        }
        let path = PathBuf::from(image_path);
        check_format(&path).map_err(to_fdo)?;

        let result = self
            .engine
            .verify(id.to_string(), path)
            .await
            .map_err(to_fdo)?;
        Ok(verification_json(&result).to_string())
    }

    /// Return daemon status information.
    async fn status(&self) -> zbus::fdo::Result<String> {
        Ok(serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "models_loaded": true,
            "profiles": self.store.len(),
        })
        .to_string())
    }
}
