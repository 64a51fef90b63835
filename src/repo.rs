use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::cmd;
use crate::error::{DeployError, DeployResult};
use crate::params::{Branch, DEFAULT_BRANCH, RepoUrl, Token};

/// Compose manifests recognised at the repository root, in order of
/// preference.
pub const COMPOSE_FILES: [&str; 2] = ["docker-compose.yml", "docker-compose.yaml"];

/// How the application is built and started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Manifest {
    /// `docker compose up` with the repository's compose file.
    Compose,
    /// `docker build` + `docker run` from the repository's
    /// `Dockerfile`.
    Dockerfile,
}

/// A local working copy ready to be shipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    pub dir: PathBuf,
    /// Branch actually checked out, which differs from the requested
    /// one after a fallback.
    pub branch: Branch,
}

/// Pick the deployment mode from the files at the repository root.
/// A compose file wins over a lone `Dockerfile`.
pub fn detect_manifest(dir: &Path) -> DeployResult<Manifest> {
    if COMPOSE_FILES.iter().any(|f| dir.join(f).is_file()) {
        Ok(Manifest::Compose)
    } else if dir.join("Dockerfile").is_file() {
        Ok(Manifest::Dockerfile)
    } else {
        Err(DeployError::ManifestMissing(dir.display().to_string()))
    }
}

/// Clone `repo` into `workdir/<name>`, or update the existing clone
/// there, and check out `branch`.
pub fn sync(
    repo: &RepoUrl,
    token: Option<&Token>,
    branch: &Branch,
    workdir: &Path,
) -> DeployResult<Checkout> {
    let dir = workdir.join(repo.name());
    let url = repo.clone_url(token);
    sync_from(&url, &dir, branch, token.map(Token::expose))
}

/// Clone or update from an explicit URL. `secret` is scrubbed from
/// any error message.
pub fn sync_from(
    url: &str,
    dir: &Path,
    branch: &Branch,
    secret: Option<&str>,
) -> DeployResult<Checkout> {
    let result = if dir.join(".git").exists() {
        update(dir, branch)
    } else {
        clone(url, dir, branch).map(|()| branch.clone())
    };

    result
        .map(|branch| Checkout {
            dir: dir.to_path_buf(),
            branch,
        })
        .map_err(|e| redact(e, secret))
}

fn update(dir: &Path, branch: &Branch) -> DeployResult<Branch> {
    info!("Updating existing clone in {}", dir.display());
    let path = dir.display().to_string();

    cmd::run_interactive("git", &["-C", &path, "fetch", "--all", "--prune"])?;

    let checkout = |branch: &Branch| {
        let args = checkout_args(dir, branch);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run("git", &refs)
    };

    let checked_out = match checkout(branch) {
        Ok(_) => branch.clone(),
        Err(e) if branch.is_default() => return Err(e),
        Err(_) => {
            warn!("branch '{branch}' not available locally, falling back to '{DEFAULT_BRANCH}'");
            let fallback = Branch::default();
            checkout(&fallback)?;
            fallback
        }
    };

    let args = pull_args(dir, &checked_out);
    let refs: Vec<&str> = args.iter().map(String::as_str).collect();
    cmd::run_interactive("git", &refs)?;
    info!("Checked out '{checked_out}'");
    Ok(checked_out)
}

fn clone(url: &str, dir: &Path, branch: &Branch) -> DeployResult<()> {
    info!("Cloning branch '{branch}' into {}", dir.display());
    let args = clone_args(url, dir, branch);
    let refs: Vec<&str> = args.iter().map(String::as_str).collect();
    cmd::run_interactive("git", &refs)
}

/// Arguments for switching an existing clone to `branch`. The
/// trailing `--` keeps the name from being read as a path or option.
#[must_use]
pub fn checkout_args(dir: &Path, branch: &Branch) -> Vec<String> {
    vec![
        "-C".to_string(),
        dir.display().to_string(),
        "checkout".to_string(),
        branch.to_string(),
        "--".to_string(),
    ]
}

/// Arguments for a fast-forward pull of `branch` from `origin`.
#[must_use]
pub fn pull_args(dir: &Path, branch: &Branch) -> Vec<String> {
    vec![
        "-C".to_string(),
        dir.display().to_string(),
        "pull".to_string(),
        "--ff-only".to_string(),
        "--end-of-options".to_string(),
        "origin".to_string(),
        branch.to_string(),
    ]
}

/// Arguments for `git clone` of a single branch.
#[must_use]
pub fn clone_args(url: &str, dir: &Path, branch: &Branch) -> Vec<String> {
    vec![
        "clone".to_string(),
        "--branch".to_string(),
        branch.to_string(),
        url.to_string(),
        dir.display().to_string(),
    ]
}

fn redact(err: DeployError, secret: Option<&str>) -> DeployError {
    match (err, secret) {
        (DeployError::CommandFailed { command, status }, Some(secret)) if !secret.is_empty() => {
            DeployError::CommandFailed {
                command: command.replace(secret, "****"),
                status,
            }
        }
        (err, _) => err,
    }
}
