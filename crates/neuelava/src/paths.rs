use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories_next::ProjectDirs;

pub const ENV_CONFIG_DIR: &str = "NEUELAVA_CONFIG_DIR";
pub const ENV_DATA_DIR: &str = "NEUELAVA_DATA_DIR";
pub const ENV_SHARE_DIR: &str = "NEUELAVA_SHARE_DIR";

const QUALIFIER: &str = "com";
const ORGANISATION: &str = "Studioe";
const APPLICATION: &str = "NeueLava";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
    share_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;

        let config_dir = resolve_dir(ENV_CONFIG_DIR, project_dirs.config_dir())
            .context("failed to resolve neuelava config directory")?;
        let data_dir = resolve_dir(ENV_DATA_DIR, project_dirs.data_dir())
            .context("failed to resolve neuelava data directory")?;
        let share_dir = resolve_share_dir(&project_dirs);

        Ok(Self {
            config_dir,
            data_dir,
            share_dir,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn share_dir(&self) -> &Path {
        &self.share_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn state_file(&self) -> PathBuf {
        self.config_dir.join("state.toml")
    }

    pub fn mask_roots(&self) -> Vec<PathBuf> {
        vec![self.data_dir.join("masks"), self.share_dir.join("masks")]
    }

    /// First mask root that exists, falling back to the user data root.
    pub fn mask_dir(&self) -> PathBuf {
        let roots = self.mask_roots();
        roots
            .iter()
            .find(|root| root.is_dir())
            .cloned()
            .unwrap_or_else(|| roots[0].clone())
    }

    pub fn export_dir(&self) -> PathBuf {
        self.data_dir.join("exports")
    }
}

#[cfg(test)]
impl AppPaths {
    pub fn from_raw(config_dir: PathBuf, data_dir: PathBuf, share_dir: PathBuf) -> Self {
        Self {
            config_dir,
            data_dir,
            share_dir,
        }
    }
}

fn resolve_dir(env_var: &str, default: &Path) -> Result<PathBuf> {
    if let Some(value) = env_override(env_var) {
        return Ok(value);
    }
    Ok(default.to_path_buf())
}

fn resolve_share_dir(project_dirs: &ProjectDirs) -> PathBuf {
    env_override(ENV_SHARE_DIR).unwrap_or_else(|| default_share_dir(project_dirs))
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.as_os_str().is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

#[cfg(target_family = "unix")]
fn default_share_dir(_: &ProjectDirs) -> PathBuf {
    PathBuf::from("/usr/share/neuelava")
}

#[cfg(not(target_family = "unix"))]
fn default_share_dir(project_dirs: &ProjectDirs) -> PathBuf {
    project_dirs.data_dir().to_path_buf()
}
