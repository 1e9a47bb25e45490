//! Startup configuration: mount discovery and target resolution.
//!
//! The mount directory comes from an explicit override or, failing that,
//! from the first NFS volume mount bound in `VCAP_SERVICES`. Any error here
//! is fatal and stops the process before the pipeline starts.

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("VCAP_SERVICES not defined")]
    VcapNotDefined,

    #[error("Unable to parse VCAP_SERVICES: {0}")]
    VcapParse(#[from] serde_json::Error),

    #[error("No volume mounts found in VCAP_SERVICES")]
    NoVolumeMounts,

    #[error("Volume mount directory is empty")]
    EmptyMount,

    #[error("Target file name is empty")]
    EmptyFilename,
}

#[derive(Debug, Deserialize)]
struct VcapServices {
    #[serde(default)]
    nfs: Vec<NfsBinding>,
}

#[derive(Debug, Deserialize)]
struct NfsBinding {
    #[serde(default)]
    volume_mounts: Vec<VolumeMount>,
}

#[derive(Debug, Deserialize)]
struct VolumeMount {
    #[serde(default)]
    container_dir: String,
}

/// Container directory of the first mount of the first NFS binding.
pub fn mount_dir_from_vcap(raw: Option<&str>) -> Result<PathBuf, ConfigError> {
    let raw = raw
        .filter(|s| !s.trim().is_empty())
        .ok_or(ConfigError::VcapNotDefined)?;

    let services: VcapServices = serde_json::from_str(raw)?;
    let mount = services
        .nfs
        .first()
        .and_then(|binding| binding.volume_mounts.first())
        .ok_or(ConfigError::NoVolumeMounts)?;

    if mount.container_dir.is_empty() {
        return Err(ConfigError::EmptyMount);
    }

    Ok(PathBuf::from(&mount.container_dir))
}

/// Resolved service configuration.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Root of the NFS mount.
    pub mount_dir: PathBuf,
    /// Target file, relative to `mount_dir`.
    pub filename: String,
    pub port: u16,
}

impl ProbeConfig {
    pub fn resolve(
        mount_override: Option<PathBuf>,
        vcap_services: Option<&str>,
        filename: String,
        port: u16,
    ) -> Result<Self, ConfigError> {
        if filename.trim().is_empty() {
            return Err(ConfigError::EmptyFilename);
        }

        let mount_dir = match mount_override {
            Some(dir) => dir,
            None => mount_dir_from_vcap(vcap_services)?,
        };
        info!(mount_dir = %mount_dir.display(), "NFS share resolved");

        Ok(Self {
            mount_dir,
            filename,
            port,
        })
    }

    /// File read by the workload.
    pub fn target_path(&self) -> PathBuf {
        self.mount_dir.join(&self.filename)
    }

    /// Directory backing `/img/` requests.
    pub fn image_dir(&self) -> PathBuf {
        self.mount_dir.join("img")
    }
}
