pub mod compose;
pub mod container;

use std::path::Path;

use tracing::{info, warn};

use crate::error::DeployResult;
use crate::health::{self, RetryPolicy};
use crate::params::{self, AppPort, DeployParams, RepoUrl, SshTarget};
use crate::repo::Manifest;
use crate::ssh::Remote;

pub use compose::ComposeDeploy;
pub use container::ContainerDeploy;

/// The deployed application as seen on the remote host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct App {
    /// Container and image name.
    pub name: String,
    /// Directory holding the mirrored repository.
    pub remote_dir: String,
    /// Port published on the host, if known.
    pub port: Option<AppPort>,
}

impl App {
    #[must_use]
    pub fn new(name: &str, remote_dir: &str) -> Self {
        Self {
            name: name.to_string(),
            remote_dir: remote_dir.to_string(),
            port: None,
        }
    }

    #[must_use]
    pub const fn expose(mut self, port: AppPort) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn from_params(params: &DeployParams) -> Self {
        Self::new(&params.app_name(), &params.remote_dir()).expose(params.port)
    }

    /// App without a known port, for teardown.
    #[must_use]
    pub fn from_target(repo: &RepoUrl, target: &SshTarget) -> Self {
        Self::new(&params::app_name(repo.name()), &params::remote_dir(target, repo))
    }
}

/// A way of building and starting the application from the mirrored
/// repository. All commands are plain docker commands; the caller
/// adds privilege escalation.
pub trait Deployer {
    fn manifest(&self) -> Manifest;

    /// Remove whatever a previous run started. Failures are
    /// tolerated.
    fn teardown_commands(&self, app: &App) -> Vec<String>;

    /// Build and start the application, in order.
    fn start_commands(&self, app: &App) -> Vec<String>;

    /// Remove containers, images and volumes of the application.
    fn purge_commands(&self, app: &App) -> Vec<String>;

    /// Prints one line per running container of the application.
    fn running_command(&self, app: &App) -> String;
}

/// Deployer matching the manifest found in the repository.
#[must_use]
pub fn for_manifest(manifest: Manifest) -> Box<dyn Deployer> {
    match manifest {
        Manifest::Compose => Box::new(ComposeDeploy::new()),
        Manifest::Dockerfile => Box::new(ContainerDeploy::new()),
    }
}

/// Mirror the local checkout to the host, replace the running
/// deployment and wait for the application to answer.
///
/// A health timeout is reported but does not fail the deployment.
pub fn run(
    remote: &dyn Remote,
    deployer: &dyn Deployer,
    app: &App,
    local_dir: &Path,
    policy: &RetryPolicy,
) -> DeployResult<()> {
    info!(
        "Copying {} to {}:{}...",
        local_dir.display(),
        remote.host(),
        app.remote_dir
    );
    remote.exec(&format!("mkdir -p {}", app.remote_dir))?;
    remote.mirror_dir(local_dir, &app.remote_dir)?;

    info!("Removing previous deployment...");
    for command in deployer.teardown_commands(app) {
        if let Err(e) = remote.exec(&remote.privileged(&command)) {
            warn!("ignored: {e}");
        }
    }

    info!("Building and starting {} ({:?})...", app.name, deployer.manifest());
    for command in deployer.start_commands(app) {
        remote.exec_interactive(&remote.privileged(&command))?;
    }

    if let Some(port) = app.port {
        match health::wait_for_http(remote, &app.name, port.get(), policy) {
            Ok(attempt) => info!("{} is up after {attempt} attempt(s)", app.name),
            Err(e) => warn!("{e}"),
        }
    }

    Ok(())
}
