use std::path::{Path, PathBuf};

use likeness_core::config::ParamsError;
use likeness_core::{AnalysisParams, IdAllocator, SequentialAllocator, UuidAllocator};

/// Which identifier allocator backs the profile store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocatorKind {
    Uuid,
    Sequential,
}

impl AllocatorKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "uuid" => Some(Self::Uuid),
            "sequential" | "counter" => Some(Self::Sequential),
            _ => None,
        }
    }

    pub fn build(self) -> Box<dyn IdAllocator> {
        match self {
            Self::Uuid => Box::new(UuidAllocator),
            Self::Sequential => Box::new(SequentialAllocator::default()),
        }
    }
}

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Comparison and fusion calibration.
    pub params: AnalysisParams,
    pub id_allocator: AllocatorKind,
}

impl Config {
    /// Load configuration from `LIKENESS_*` environment variables with defaults.
    ///
    /// `LIKENESS_PARAMS_PATH` points at an optional TOML file of analysis
    /// parameters; `LIKENESS_CONFIDENCE_THRESHOLD` overrides its threshold.
    pub fn from_env() -> Result<Self, ParamsError> {
        let model_dir = std::env::var("LIKENESS_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir().join("models"));

        let mut params = match std::env::var("LIKENESS_PARAMS_PATH") {
            Ok(path) => AnalysisParams::load(Path::new(&path))?,
            Err(_) => AnalysisParams::default(),
        };
        if let Some(threshold) = env_f64("LIKENESS_CONFIDENCE_THRESHOLD") {
            params.confidence_threshold = threshold;
            params.validate()?;
        }

        let id_allocator = match std::env::var("LIKENESS_ID_ALLOCATOR") {
            Ok(raw) => AllocatorKind::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "unknown LIKENESS_ID_ALLOCATOR; using uuid");
                AllocatorKind::Uuid
            }),
            Err(_) => AllocatorKind::Uuid,
        };

        Ok(Self {
            model_dir,
            params,
            id_allocator,
        })
    }

    /// Path to the FaceNet embedding model.
    pub fn embedding_model_path(&self) -> String {
        self.model_dir
            .join("facenet_vggface2.onnx")
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the 68-point landmark model.
    pub fn landmark_model_path(&self) -> String {
        self.model_dir
            .join("landmarks_68.onnx")
            .to_string_lossy()
            .into_owned()
    }
}

fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("likeness")
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
