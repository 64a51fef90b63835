use tracing::{info, warn};

use crate::error::{DeployError, DeployResult};
use crate::github::GitHost;
use crate::params::{
    self, AppPort, Branch, DEFAULT_BRANCH, DeployParams, RepoUrl, SshTarget, Token, Transport,
};
use crate::prompt::Prompter;

/// Attempts allowed for each remote check (token, branch) before
/// giving up.
pub const MAX_VERIFY_ATTEMPTS: u32 = 3;

/// Values known before prompting, from CLI flags, the config file or
/// the environment. Each is validated like typed input; an invalid
/// preset is reported and then prompted for.
#[derive(Debug, Clone, Default)]
pub struct Preset {
    pub repo: Option<String>,
    pub token: Option<String>,
    pub branch: Option<String>,
    pub user: Option<String>,
    pub host: Option<String>,
    pub key: Option<String>,
    pub port: Option<String>,
}

/// Gathers and validates deployment parameters.
pub struct Collector<'a> {
    prompter: &'a mut dyn Prompter,
    api: &'a dyn GitHost,
    preset: Preset,
}

impl<'a> Collector<'a> {
    #[must_use]
    pub fn new(prompter: &'a mut dyn Prompter, api: &'a dyn GitHost) -> Self {
        Self {
            prompter,
            api,
            preset: Preset::default(),
        }
    }

    #[must_use]
    pub fn preset(mut self, preset: Preset) -> Self {
        self.preset = preset;
        self
    }

    /// Collect every parameter of a deployment run.
    pub fn collect(&mut self) -> DeployResult<DeployParams> {
        let repo = self.repo_url()?;
        let token = self.token(&repo)?;
        let branch = self.branch(&repo, token.as_ref())?;
        let target = self.target()?;
        let port = self.port()?;

        Ok(DeployParams {
            repo,
            token,
            branch,
            target,
            port,
        })
    }

    /// Collect the subset needed to tear a deployment down.
    pub fn collect_cleanup(&mut self) -> DeployResult<(RepoUrl, SshTarget)> {
        let repo = self.repo_url()?;
        let target = self.target()?;
        Ok((repo, target))
    }

    /// Show the collected values and ask for confirmation.
    pub fn confirm(&mut self, params: &DeployParams) -> DeployResult<()> {
        info!("Deployment summary:");
        for (label, value) in params.summary() {
            info!("  {label}: {value}");
        }
        if self.prompter.confirm("Proceed with deployment?", true)? {
            Ok(())
        } else {
            Err(DeployError::Cancelled)
        }
    }

    pub fn repo_url(&mut self) -> DeployResult<RepoUrl> {
        let preset = self.preset.repo.take();
        let repo = self.ask(preset, "Git repository URL", None, RepoUrl::parse)?;
        info!("Repository: {repo}");
        Ok(repo)
    }

    fn token(&mut self, repo: &RepoUrl) -> DeployResult<Option<Token>> {
        if repo.transport() == Transport::Ssh {
            info!("SSH remote, no access token needed");
            return Ok(None);
        }

        let mut preset = self.preset.token.take();
        let mut attempts = 0;

        loop {
            let raw = match preset.take() {
                Some(value) => value,
                None => self
                    .prompter
                    .secret("Personal access token (empty for a public repository)")?,
            };
            if raw.trim().is_empty() {
                info!("Access token: (none)");
                return Ok(None);
            }

            let token = match Token::parse(&raw) {
                Ok(token) => token,
                Err(e) => {
                    warn!("{e}, please try again");
                    continue;
                }
            };

            if !repo.is_github_https() {
                info!("Access token: {}", token.masked());
                return Ok(Some(token));
            }

            attempts += 1;
            match self.api.verify_token(&token) {
                Ok(Some(login)) => {
                    info!("Access token {} verified for '{login}'", token.masked());
                    return Ok(Some(token));
                }
                Ok(None) => warn!("GitHub rejected access token {}", token.masked()),
                Err(e) => warn!("could not verify access token {}: {e}", token.masked()),
            }

            if attempts >= MAX_VERIFY_ATTEMPTS {
                return Err(DeployError::TokenRejected(format!("{attempts} attempts failed")));
            }
            if !self
                .prompter
                .confirm("Token verification failed. Enter a different token?", true)?
            {
                return Err(DeployError::TokenRejected("retry declined".to_string()));
            }
        }
    }

    fn branch(&mut self, repo: &RepoUrl, token: Option<&Token>) -> DeployResult<Branch> {
        let mut preset = self.preset.branch.take();

        for attempt in 1..=MAX_VERIFY_ATTEMPTS {
            let raw = match preset.take() {
                Some(value) => value,
                None => self.prompter.input("Branch name", Some(DEFAULT_BRANCH))?,
            };
            let branch = Branch::parse(&raw)?;

            if !repo.is_github_https() {
                info!("Branch: {branch}");
                return Ok(branch);
            }

            match self.api.branch_exists(repo, &branch, token) {
                Ok(true) => {
                    info!("Branch: {branch}");
                    return Ok(branch);
                }
                Ok(false) => warn!(
                    "branch '{branch}' not found in {}/{}",
                    repo.owner(),
                    repo.name()
                ),
                Err(e) => {
                    warn!("could not check branch '{branch}': {e}");
                    info!("Branch: {branch}");
                    return Ok(branch);
                }
            }

            if attempt == MAX_VERIFY_ATTEMPTS
                || !self
                    .prompter
                    .confirm("Enter a different branch name?", true)?
            {
                break;
            }
        }

        warn!("falling back to default branch '{DEFAULT_BRANCH}'");
        Ok(Branch::default())
    }

    fn target(&mut self) -> DeployResult<SshTarget> {
        let preset = self.preset.user.take();
        let user = self.ask(preset, "SSH username", None, params::ssh_user)?;
        info!("SSH user: {user}");

        let preset = self.preset.host.take();
        let host = self.ask(preset, "Server IP address", None, params::ipv4)?;
        info!("Server IP: {host}");

        let preset = self.preset.key.take();
        let key = self.ask(
            preset,
            "SSH private key path",
            Some("~/.ssh/id_rsa"),
            params::key_path,
        )?;
        info!("SSH key: {}", key.display());

        Ok(SshTarget { user, host, key })
    }

    fn port(&mut self) -> DeployResult<AppPort> {
        let preset = self.preset.port.take();
        let port = self.ask(preset, "Application port", None, AppPort::parse)?;
        info!("Application port: {port}");
        Ok(port)
    }

    /// Use `preset` if it parses, otherwise prompt until an answer
    /// parses.
    fn ask<T>(
        &mut self,
        preset: Option<String>,
        prompt: &str,
        default: Option<&str>,
        parse: impl Fn(&str) -> DeployResult<T>,
    ) -> DeployResult<T> {
        if let Some(value) = preset {
            match parse(&value) {
                Ok(parsed) => return Ok(parsed),
                Err(e) => warn!("{e}"),
            }
        }

        loop {
            let answer = self.prompter.input(prompt, default)?;
            match parse(&answer) {
                Ok(parsed) => return Ok(parsed),
                Err(e) => warn!("{e}, please try again"),
            }
        }
    }
}
