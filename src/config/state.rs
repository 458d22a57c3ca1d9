// Application state module
// Holds the immutable configuration and the resolved serving root

use std::io;
use std::path::{Path, PathBuf};

use super::types::Config;
use crate::error::ServerError;
use crate::logger::LogFormat;

/// Application state shared by every connection
#[derive(Debug)]
pub struct AppState {
    pub config: Config,
    /// Canonical serving root; fixed before the first request is accepted
    pub root: PathBuf,
    pub access_log_format: LogFormat,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, ServerError> {
        let root = resolve_root(config.server.root.as_deref())?;
        let access_log_format = LogFormat::parse(&config.logging.access_log_format);
        Ok(Self {
            config,
            root,
            access_log_format,
        })
    }
}

/// Resolve the serving root to an absolute, canonical directory.
///
/// Uses `configured` when given, otherwise the directory that contains the
/// running executable.
pub fn resolve_root(configured: Option<&str>) -> Result<PathBuf, ServerError> {
    let candidate = match configured {
        Some(root) => PathBuf::from(root),
        None => executable_dir()?,
    };

    let root = candidate
        .canonicalize()
        .map_err(|source| ServerError::Root {
            path: candidate.clone(),
            source,
        })?;

    if !root.is_dir() {
        return Err(ServerError::Root {
            path: root,
            source: io::Error::other("not a directory"),
        });
    }

    Ok(root)
}

fn executable_dir() -> Result<PathBuf, ServerError> {
    let exe = std::env::current_exe()?;
    if let Some(dir) = exe.parent() {
        return Ok(dir.to_path_buf());
    }
    Err(ServerError::Root {
        path: exe,
        source: io::Error::new(io::ErrorKind::NotFound, "executable has no parent directory"),
    })
}

/// Whether `path` lies inside `root`. Both must already be canonical.
pub fn is_within_root(root: &Path, path: &Path) -> bool {
    path.starts_with(root)
}
