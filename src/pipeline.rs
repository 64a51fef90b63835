use std::fmt;
use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info, warn};

use crate::bootstrap;
use crate::cleanup;
use crate::cmd;
use crate::collect::{Collector, Preset};
use crate::config::DeployConfig;
use crate::deploy::{self, App};
use crate::error::{DeployError, DeployResult};
use crate::github::GitHost;
use crate::health::RetryPolicy;
use crate::nginx::{self, NginxSite};
use crate::params::{DeployParams, SshTarget};
use crate::prompt::Prompter;
use crate::repo::{self, Checkout, Manifest};
use crate::ssh::{Remote, SshSession};
use crate::validate::{self, ValidationReport};

/// Environment variable read for the access token.
pub const TOKEN_ENV: &str = "DOCKSHIP_TOKEN";

/// Local tools every run shells out to.
pub const REQUIRED_TOOLS: [&str; 5] = ["git", "ssh", "rsync", "curl", "ssh-keygen"];

#[derive(Parser, Debug, Default)]
#[command(name = "dockship")]
#[command(version, about = "Deploy a Dockerized git repository to a remote Linux host behind Nginx")]
pub struct Cli {
    /// Tear down a previous deployment instead of deploying
    #[arg(long)]
    pub cleanup: bool,

    /// YAML file with answers to the prompts
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Git repository URL
    #[arg(long)]
    pub repo: Option<String>,

    /// Branch to deploy
    #[arg(long)]
    pub branch: Option<String>,

    /// SSH username on the server
    #[arg(long)]
    pub user: Option<String>,

    /// Server IPv4 address
    #[arg(long)]
    pub host: Option<String>,

    /// SSH private key path
    #[arg(long)]
    pub key: Option<String>,

    /// Port the application listens on
    #[arg(long)]
    pub port: Option<String>,

    /// Directory the repository is cloned into
    #[arg(long, value_name = "DIR")]
    pub workdir: Option<PathBuf>,

    /// Directory for the run log
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Skip the confirmation before deploying
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Clone and print the generated Nginx site and remote commands
    /// without touching the server
    #[arg(long)]
    pub dry_run: bool,
}

/// Steps of a run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Collect,
    Sync,
    Preflight,
    Reach,
    Connect,
    Bootstrap,
    Deploy,
    Proxy,
    Validate,
    Cleanup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Collect => "Parameter collection",
            Self::Sync => "Repository sync",
            Self::Preflight => "Local preflight",
            Self::Reach => "Host reachability",
            Self::Connect => "SSH connectivity",
            Self::Bootstrap => "Remote bootstrap",
            Self::Deploy => "Application deployment",
            Self::Proxy => "Reverse proxy",
            Self::Validate => "Deployment validation",
            Self::Cleanup => "Cleanup",
        })
    }
}

/// Run one stage, logging its start and, on failure, the stage name
/// with the error.
pub fn stage<T>(stage: Stage, f: impl FnOnce() -> DeployResult<T>) -> DeployResult<T> {
    info!("==> {stage}");
    f().inspect_err(|e| match e {
        DeployError::Cancelled => info!("{stage}: cancelled by user"),
        e => error!("{stage} failed: {e}"),
    })
}

/// A configured run, built from CLI flags and an optional config
/// file.
pub struct Pipeline {
    cli: Cli,
    config: DeployConfig,
}

impl Pipeline {
    pub fn from_cli(cli: Cli) -> DeployResult<Self> {
        let config = match &cli.config {
            Some(path) => DeployConfig::load(path)?,
            None => DeployConfig::default(),
        };
        Ok(Self { cli, config })
    }

    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.cli
            .log_dir
            .clone()
            .or_else(|| self.config.log_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    #[must_use]
    pub fn workdir(&self) -> PathBuf {
        self.cli
            .workdir
            .clone()
            .or_else(|| self.config.workdir.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        self.config.health.retry_policy()
    }

    /// Known answers: CLI flags first, then the config file, token
    /// from the environment.
    #[must_use]
    pub fn preset(&self) -> Preset {
        let cli = &self.cli;
        let config = &self.config;
        Preset {
            repo: cli.repo.clone().or_else(|| config.repo.clone()),
            token: std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty()),
            branch: cli.branch.clone().or_else(|| config.branch.clone()),
            user: cli.user.clone().or_else(|| config.ssh_user.clone()),
            host: cli.host.clone().or_else(|| config.ssh_host.clone()),
            key: cli.key.clone().or_else(|| config.ssh_key.clone()),
            port: cli
                .port
                .clone()
                .or_else(|| config.app_port.map(|p| p.to_string())),
        }
    }

    /// Execute the run: deploy, or tear down with `--cleanup`.
    ///
    /// `connect` opens the session to the target host once local
    /// work is done; [`connect_ssh`] in production.
    pub fn run<'r>(
        &self,
        prompter: &mut dyn Prompter,
        api: &dyn GitHost,
        connect: &dyn Fn(&SshTarget) -> DeployResult<Box<dyn Remote + 'r>>,
    ) -> DeployResult<()> {
        let mut collector = Collector::new(prompter, api).preset(self.preset());

        if self.cli.cleanup {
            let (repo, target) = stage(Stage::Collect, || collector.collect_cleanup())?;
            let remote = stage(Stage::Preflight, || connect(&target))?;
            run_cleanup(remote.as_ref(), &App::from_target(&repo, &target));
            return Ok(());
        }

        let params = stage(Stage::Collect, || {
            let params = collector.collect()?;
            if !self.cli.yes && !self.cli.dry_run {
                collector.confirm(&params)?;
            }
            Ok(params)
        })?;

        let (checkout, manifest) = stage(Stage::Sync, || {
            let checkout = repo::sync(
                &params.repo,
                params.token.as_ref(),
                &params.branch,
                &self.workdir(),
            )?;
            let manifest = repo::detect_manifest(&checkout.dir)?;
            info!("Manifest: {manifest:?}");
            Ok((checkout, manifest))
        })?;

        if self.cli.dry_run {
            print_dry_run(&params, manifest);
            return Ok(());
        }

        let remote = stage(Stage::Preflight, || connect(&params.target))?;
        ship(
            remote.as_ref(),
            &params,
            &checkout,
            manifest,
            &self.retry_policy(),
            &validate::local_http_probe,
        )?;

        info!("Deployment complete: http://{}/", params.target.host);
        Ok(())
    }
}

/// Check local prerequisites and open an SSH session to `target`.
pub fn connect_ssh(target: &SshTarget) -> DeployResult<Box<dyn Remote>> {
    preflight_local(target)?;
    Ok(Box::new(SshSession::for_target(target)))
}

/// Check local tooling and the SSH key before contacting the host.
pub fn preflight_local(target: &SshTarget) -> DeployResult<()> {
    for tool in REQUIRED_TOOLS {
        if !cmd::command_exists(tool) {
            return Err(DeployError::PrerequisiteMissing(format!("{tool} is not installed")));
        }
    }

    let key = target.key.display().to_string();
    let fingerprint = cmd::run("ssh-keygen", &["-l", "-f", &key])
        .map_err(|_| DeployError::SshFailed(format!("{key} is not a usable SSH key")))?;
    info!("SSH key: {fingerprint}");
    Ok(())
}

/// Remote half of a deployment: reachability, connectivity,
/// bootstrap, deploy, reverse proxy and validation.
///
/// Nothing is run on the host past the connectivity check unless it
/// succeeds.
pub fn ship(
    remote: &dyn Remote,
    params: &DeployParams,
    checkout: &Checkout,
    manifest: Manifest,
    policy: &RetryPolicy,
    external_probe: &dyn Fn(&str) -> bool,
) -> DeployResult<ValidationReport> {
    stage(Stage::Reach, || {
        if remote.ping() {
            info!("{} answers ping", remote.host());
        } else {
            warn!("{} does not answer ping, trying SSH anyway", remote.host());
        }
        Ok(())
    })?;

    stage(Stage::Connect, || {
        remote.check_connection()?;
        info!("Connected to {}@{}", remote.user(), remote.host());
        Ok(())
    })?;

    stage(Stage::Bootstrap, || bootstrap::run(remote).map(|_| ()))?;

    let deployer = deploy::for_manifest(manifest);
    let app = App::from_params(params);
    stage(Stage::Deploy, || {
        deploy::run(remote, deployer.as_ref(), &app, &checkout.dir, policy)
    })?;

    let site = NginxSite::new(&params.target.host.to_string(), params.port.get());
    stage(Stage::Proxy, || nginx::configure(remote, &site))?;

    stage(Stage::Validate, || {
        Ok(validate::run(remote, deployer.as_ref(), &app, external_probe))
    })
}

/// Tear down `app`, attempting every step. The connectivity check
/// only warns.
pub fn run_cleanup(remote: &dyn Remote, app: &App) -> cleanup::CleanupReport {
    info!("==> {}", Stage::Cleanup);
    if let Err(e) = remote.check_connection() {
        warn!("{e}");
    }
    cleanup::run(remote, app)
}

fn print_dry_run(params: &DeployParams, manifest: Manifest) {
    let deployer = deploy::for_manifest(manifest);
    let app = App::from_params(params);
    let site = NginxSite::new(&params.target.host.to_string(), params.port.get());

    eprintln!("=== Dry run: no changes will be made ===");
    eprintln!();
    eprintln!("--- {} ---", nginx::SITE_PATH);
    println!("{}", site.render());

    eprintln!("--- Actions that would be performed ---");
    eprintln!(
        "1. Bootstrap {} (Docker, Compose plugin, Nginx)",
        params.target.destination()
    );
    eprintln!("2. Mirror repository to {}", app.remote_dir);
    for command in deployer.teardown_commands(&app) {
        eprintln!("   (best effort) {command}");
    }
    for command in deployer.start_commands(&app) {
        eprintln!("   {command}");
    }
    eprintln!("3. Install Nginx site and reload");
    eprintln!("4. Validate services and HTTP on port {}", params.port);
}
