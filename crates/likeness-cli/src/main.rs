use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use likeness_core::{compare_profiles, AnalysisParams, ComparisonResult, Profile};

#[derive(Parser)]
#[command(name = "likeness", about = "Likeness face profile verification CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a profile from a photo and store it in the daemon
    Create {
        /// Photo (.jpg, .jpeg or .png)
        image: PathBuf,
    },
    /// Print a stored profile as JSON
    Get {
        id: String,
    },
    /// Remove a stored profile
    Delete {
        id: String,
    },
    /// Verify a photo against a stored profile
    Verify {
        id: String,
        image: PathBuf,
    },
    /// Show daemon status
    Status,
    /// Compare two exported profile JSON files locally
    Compare {
        stored: PathBuf,
        probe: PathBuf,
        /// TOML file with analysis parameters
        #[arg(long)]
        params: Option<PathBuf>,
    },
}

#[zbus::proxy(
    interface = "org.freedesktop.Likeness1",
    default_service = "org.freedesktop.Likeness1",
    default_path = "/org/freedesktop/Likeness1"
)]
trait Likeness {
    async fn create_profile(&self, image_path: &str) -> zbus::Result<String>;
    async fn get_profile(&self, id: &str) -> zbus::Result<String>;
    async fn delete_profile(&self, id: &str) -> zbus::Result<String>;
    async fn verify_photo(&self, id: &str, image_path: &str) -> zbus::Result<String>;
    async fn status(&self) -> zbus::Result<String>;
}

/// The daemon resolves paths in its own working directory, so send absolute ones.
fn absolute(path: &Path) -> Result<String> {
    let abs = std::fs::canonicalize(path)
        .with_context(|| format!("resolving {}", path.display()))?;
    Ok(abs.to_string_lossy().into_owned())
}

fn load_profile(path: &Path) -> Result<Profile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing profile {}", path.display()))
}

fn compare_files(stored: &Path, probe: &Path, params: Option<&Path>) -> Result<ComparisonResult> {
    let params = match params {
        Some(path) => AnalysisParams::load(path)?,
        None => AnalysisParams::default(),
    };
    let stored = load_profile(stored)?;
    let probe = load_profile(probe)?;
    Ok(compare_profiles(&stored, &probe, &params)?)
}

async fn proxy() -> Result<LikenessProxy<'static>> {
    let conn = zbus::Connection::session()
        .await
        .context("connecting to the session bus")?;
    LikenessProxy::new(&conn)
        .await
        .context("likenessd is not reachable")
}

fn print_json(raw: &str) -> Result<()> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Create { image } => {
            let id = proxy().await?.create_profile(&absolute(&image)?).await?;
            println!("{id}");
        }
        Commands::Get { id } => {
            let profile = proxy().await?.get_profile(&id).await?;
            print_json(&profile)?;
        }
        Commands::Delete { id } => {
            let message = proxy().await?.delete_profile(&id).await?;
            println!("{message}");
        }
        Commands::Verify { id, image } => {
            let result = proxy().await?.verify_photo(&id, &absolute(&image)?).await?;
            print_json(&result)?;
        }
        Commands::Status => {
            let status = proxy().await?.status().await?;
            print_json(&status)?;
        }
        Commands::Compare {
            stored,
            probe,
            params,
        } => {
            let result = compare_files(&stored, &probe, params.as_deref())?;
            tracing::debug!(scores = ?result.scores, "local comparison");
            println!("{}", result.message());
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use likeness_core::{Embedding, LandmarkDistances, TextureHistogram};

    fn write_profile(tag: &str, bump: f64) -> PathBuf {
        let distances: LandmarkDistances = [
            ("inter_eye".to_string(), 60.0 + bump),
            ("nose_width".to_string(), 20.0),
        ]
        .into_iter()
        .collect();
        let profile = Profile::new(
            distances,
            Embedding::new(vec![1.0, 0.0]),
            TextureHistogram::from_bins(vec![0.5, 0.5]),
        );
        let path = std::env::temp_dir().join(format!(
            "likeness-cli-{tag}-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, serde_json::to_string(&profile).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_compare_files() {
        let a = write_profile("a", 0.0);
        let b = write_profile("b", 10.0);

        let same = compare_files(&a, &a, None).unwrap();
        assert!(same.is_match());
        assert!((same.confidence - 100.0).abs() < 1e-9);

        let diff = compare_files(&a, &b, None).unwrap();
        assert!((diff.scores.landmark - 95.0).abs() < 1e-9);

        let _ = std::fs::remove_file(a);
        let _ = std::fs::remove_file(b);
    }

    #[test]
    fn test_compare_missing_file() {
        assert!(compare_files(Path::new("/nonexistent/a.json"), Path::new("/nonexistent/b.json"), None).is_err());
    }
}
