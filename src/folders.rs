use crate::logging::AgentLog;
use crate::task::CommandParams;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Perspective {
    Client,
    #[default]
    Server,
}

impl Perspective {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("client") {
            Self::Client
        } else {
            Self::Server
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Server => "server",
        }
    }

    pub fn root_for(self, params: &CommandParams) -> &str {
        match self {
            Self::Client => params.shared_root(),
            Self::Server => params.local_root(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderOutcome {
    Created {
        path: PathBuf,
    },
    RootMissing {
        root: PathBuf,
    },
    /// `reached` is the deepest path known to exist when creation stopped.
    Failed {
        path: PathBuf,
        reached: PathBuf,
        error: String,
    },
}

impl FolderOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Created { .. })
    }

    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Created { .. } => None,
            Self::RootMissing { root } => {
                Some(format!("Root directory {} not found", root.display()))
            }
            Self::Failed { path, error, .. } => Some(format!(
                "Exception creating directory {}: {error}",
                path.display()
            )),
        }
    }
}

pub fn create_directory(
    perspective: Perspective,
    params: &CommandParams,
    source: &str,
    log: &AgentLog,
) -> FolderOutcome {
    log.info(
        "folders.command",
        &format!(
            "Processing command for package {} (Source = {source})",
            params.package()
        ),
    );

    let root = PathBuf::from(perspective.root_for(params));
    if root.as_os_str().is_empty() || !root.is_dir() {
        let outcome = FolderOutcome::RootMissing { root };
        if let Some(message) = outcome.error_message() {
            log.error("folders.root_missing", &message);
        }
        return outcome;
    }

    let segments = params.segments();
    let last = segments.len().saturating_sub(1);
    let mut current = root;
    for (index, segment) in segments.iter().enumerate() {
        let next = current.join(segment);
        if let Err(error) = create_if_missing(&next, index == last, log) {
            let outcome = FolderOutcome::Failed {
                path: next,
                reached: current,
                error: error.to_string(),
            };
            if let Some(message) = outcome.error_message() {
                log.error("folders.create_failed", &message);
            }
            return outcome;
        }
        current = next;
    }

    FolderOutcome::Created { path: current }
}

fn create_if_missing(path: &Path, is_final: bool, log: &AgentLog) -> std::io::Result<()> {
    if path.is_dir() {
        let message = format!("Directory {} already exists", path.display());
        if is_final {
            log.info("folders.exists", &message);
        } else {
            log.debug("folders.exists", &message);
        }
        return Ok(());
    }

    fs::create_dir(path)?;
    log.info(
        "folders.created",
        &format!("Directory {} created", path.display()),
    );
    Ok(())
}
