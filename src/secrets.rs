//! Secrets file handling
//!
//! The secrets file is read once and then destroyed: overwritten in place
//! with random bytes, synced, and unlinked. Destruction problems are logged
//! and never stop the run.

use anyhow::{Context, Result, bail};
use declarative::Secret;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Deserialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Secrets needed by a provisioning run
#[derive(Debug, Clone)]
pub struct Secrets {
    pub luks_password: Secret,
}

#[derive(Deserialize)]
struct SecretsFile {
    #[serde(default)]
    luks_password: String,
}

impl Secrets {
    /// Read and parse a secrets file
    pub fn load(path: &Path) -> Result<Self> {
        log::info!("Loading secrets from local file: {}", path.display());

        if !path.exists() {
            bail!("secret file not found at: {}", path.display());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let file: SecretsFile =
            serde_yaml::from_str(content).context("Failed to parse YAML structure")?;
        if file.luks_password.is_empty() {
            bail!("invalid secrets file: 'luks_password' is missing or empty");
        }
        Ok(Self {
            luks_password: Secret::new(file.luks_password),
        })
    }
}

/// Overwrite and delete the secrets file
pub fn destroy(path: &Path) {
    log::info!("Destroying secrets file: {}", path.display());

    match overwrite(path) {
        Ok(()) => log::info!("Secrets file overwritten with random data"),
        // Deletion is still attempted
        Err(e) => log::warn!("Failed to overwrite secrets file: {e:#}"),
    }

    match fs::remove_file(path) {
        Ok(()) => log::info!("Secrets file destroyed"),
        Err(e) => log::warn!("Failed to delete secrets file {}: {e}", path.display()),
    }
}

/// Replace the file contents in place with random bytes of the same length
fn overwrite(path: &Path) -> Result<()> {
    let len = fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();
    if len == 0 {
        return Ok(());
    }

    let mut noise = vec![0u8; usize::try_from(len)?];
    OsRng.fill_bytes(&mut noise);

    let mut file = OpenOptions::new()
        .write(true)
        .open(path)
        .with_context(|| format!("Failed to open {} for overwrite", path.display()))?;
    file.write_all(&noise).context("Failed to write random data")?;
    file.sync_all().context("Failed to sync file")?;
    Ok(())
}
