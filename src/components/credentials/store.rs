use super::models::Credential;
use crate::error::PrereadResult;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Process memory first, credential file second
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    cached: RwLock<Option<Credential>>,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the credential, `None` meaning unauthenticated
    pub async fn load(&self) -> Option<Credential> {
        if let Some(credential) = self.cached.read().await.clone() {
            return Some(credential);
        }

        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No credential file at {}", self.path.display());
                return None;
            }
            Err(e) => {
                warn!("Failed to read credential file {}: {}", self.path.display(), e);
                return None;
            }
        };

        match Credential::parse(&raw) {
            Some(credential) => {
                *self.cached.write().await = Some(credential.clone());
                Some(credential)
            }
            None => {
                warn!(
                    "Credential file {} is malformed, a new login is required",
                    self.path.display()
                );
                None
            }
        }
    }

    /// Persist a new or refreshed credential to the file and to memory
    pub async fn store(&self, credential: &Credential) -> PrereadResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(credential)?;
        fs::write(&self.path, json).await?;
        restrict_permissions(&self.path).await?;

        *self.cached.write().await = Some(credential.clone());
        debug!("Stored credential at {}", self.path.display());
        Ok(())
    }

    /// Forget the credential everywhere
    pub async fn clear(&self) -> PrereadResult<()> {
        *self.cached.write().await = None;
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> PrereadResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> PrereadResult<()> {
    Ok(())
}
