//! Typed deployment parameters.
//!
//! Every value entered by the user is parsed into one of these types
//! before it is used; a value that fails its format check never leaves
//! this module.

use std::fmt;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{DeployError, DeployResult};

/// Branch used when none is given, and the fallback when the
/// requested branch does not exist.
pub const DEFAULT_BRANCH: &str = "main";

const HOST_PATTERN: &str = r"[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+";
const PATH_PATTERN: &str = r"(?P<owner>[A-Za-z0-9_.-]+)/(?P<name>[A-Za-z0-9_.-]+?)(?:\.git)?/?";

static HTTPS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^https://(?P<host>{HOST_PATTERN}(?::[0-9]{{1,5}})?)/{PATH_PATTERN}$"
    ))
    .expect("valid https url regex")
});

static SSH_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?:ssh://)?git@(?P<host>{HOST_PATTERN})[:/]{PATH_PATTERN}$"
    ))
    .expect("valid ssh url regex")
});

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:ghp_|github_pat_)[A-Za-z0-9_]+$").expect("valid token regex"));

static BRANCH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._/-]+$").expect("valid branch regex"));

static SSH_USER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_-]{0,31}$").expect("valid user regex"));

/// How the repository is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Https,
    Ssh,
}

/// A git repository URL, either `https://host/owner/name[.git]` or
/// `git@host:owner/name[.git]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoUrl {
    raw: String,
    transport: Transport,
    host: String,
    owner: String,
    name: String,
}

impl RepoUrl {
    pub fn parse(input: &str) -> DeployResult<Self> {
        let raw = input.trim();
        let (transport, caps) = if let Some(caps) = HTTPS_URL.captures(raw) {
            (Transport::Https, caps)
        } else if let Some(caps) = SSH_URL.captures(raw) {
            (Transport::Ssh, caps)
        } else {
            return Err(DeployError::invalid(
                "repository URL",
                format!("'{raw}' is not https://host/owner/repo or git@host:owner/repo"),
            ));
        };

        let owner = &caps["owner"];
        let name = &caps["name"];
        if [owner, name].iter().any(|part| part.chars().all(|c| c == '.')) {
            return Err(DeployError::invalid(
                "repository URL",
                format!("'{raw}' has an owner or repository name made only of dots"),
            ));
        }

        Ok(Self {
            raw: raw.to_string(),
            transport,
            host: caps["host"].to_string(),
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub const fn transport(&self) -> Transport {
        self.transport
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name without the `.git` suffix.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the GitHub REST API can be asked about this
    /// repository.
    #[must_use]
    pub fn is_github_https(&self) -> bool {
        self.transport == Transport::Https && self.host.eq_ignore_ascii_case("github.com")
    }

    /// Clone URL, with the token embedded for HTTPS remotes.
    #[must_use]
    pub fn clone_url(&self, token: Option<&Token>) -> String {
        match (self.transport, token) {
            (Transport::Https, Some(token)) => format!(
                "https://{}@{}/{}/{}.git",
                token.expose(),
                self.host,
                self.owner,
                self.name
            ),
            _ => self.raw.clone(),
        }
    }
}

impl FromStr for RepoUrl {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RepoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A personal access token. Never printed in clear.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn parse(input: &str) -> DeployResult<Self> {
        let trimmed = input.trim();
        if TOKEN.is_match(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(DeployError::invalid(
                "access token",
                "expected a token starting with 'ghp_' or 'github_pat_'",
            ))
        }
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn masked(&self) -> String {
        mask_token(&self.0)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&self.masked()).finish()
    }
}

/// Mask a secret for display: first and last four characters kept,
/// short secrets fully hidden.
#[must_use]
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len().max(4));
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}****{tail}")
}

/// A git branch name restricted to `[a-zA-Z0-9._/-]+`, not starting
/// with `-`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch(String);

impl Branch {
    /// Parse a branch name. Empty input selects [`DEFAULT_BRANCH`].
    pub fn parse(input: &str) -> DeployResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        if BRANCH.is_match(trimmed) && !trimmed.starts_with('-') {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(DeployError::InvalidBranch(trimmed.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_BRANCH
    }
}

impl Default for Branch {
    fn default() -> Self {
        Self(DEFAULT_BRANCH.to_string())
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Application port in `[1, 65535]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppPort(u16);

impl AppPort {
    pub fn parse(input: &str) -> DeployResult<Self> {
        let reason = "must be a number between 1 and 65535";
        let n: u32 = input
            .trim()
            .parse()
            .map_err(|_| DeployError::invalid("application port", reason))?;
        match u16::try_from(n) {
            Ok(port) if port >= 1 => Ok(Self(port)),
            _ => Err(DeployError::invalid("application port", reason)),
        }
    }

    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Display for AppPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate a remote login name.
pub fn ssh_user(input: &str) -> DeployResult<String> {
    let trimmed = input.trim();
    if SSH_USER.is_match(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(DeployError::invalid(
            "SSH username",
            format!("'{trimmed}' is not a valid Linux user name"),
        ))
    }
}

/// Validate a dotted-quad IPv4 address.
pub fn ipv4(input: &str) -> DeployResult<Ipv4Addr> {
    input.trim().parse().map_err(|_| {
        DeployError::invalid(
            "server IP",
            format!("'{}' is not an IPv4 address", input.trim()),
        )
    })
}

/// Validate an SSH private key path, expanding a leading `~/`.
pub fn key_path(input: &str) -> DeployResult<PathBuf> {
    let path = expand_home(input.trim())?;
    if path.is_file() {
        Ok(path)
    } else {
        Err(DeployError::invalid(
            "SSH key path",
            format!("{} does not exist or is not a file", path.display()),
        ))
    }
}

fn expand_home(input: &str) -> DeployResult<PathBuf> {
    match input.strip_prefix("~/") {
        Some(rest) => {
            let home =
                std::env::var("HOME").map_err(|_| DeployError::EnvMissing("HOME".into()))?;
            Ok(Path::new(&home).join(rest))
        }
        None => Ok(PathBuf::from(input)),
    }
}

/// Remote login details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    pub user: String,
    pub host: Ipv4Addr,
    pub key: PathBuf,
}

impl SshTarget {
    /// Home directory of the login user on the remote host.
    #[must_use]
    pub fn remote_home(&self) -> String {
        if self.user == "root" {
            "/root".to_string()
        } else {
            format!("/home/{}", self.user)
        }
    }

    #[must_use]
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

/// Everything a deployment run needs, validated.
#[derive(Debug, Clone)]
pub struct DeployParams {
    pub repo: RepoUrl,
    pub token: Option<Token>,
    pub branch: Branch,
    pub target: SshTarget,
    pub port: AppPort,
}

impl DeployParams {
    /// Directory the repository is mirrored to on the remote host.
    #[must_use]
    pub fn remote_dir(&self) -> String {
        remote_dir(&self.target, &self.repo)
    }

    /// Container and image name.
    #[must_use]
    pub fn app_name(&self) -> String {
        app_name(self.repo.name())
    }

    /// Human readable summary, token masked.
    #[must_use]
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Repository", self.repo.to_string()),
            (
                "Access token",
                self.token
                    .as_ref()
                    .map_or_else(|| "(none)".to_string(), Token::masked),
            ),
            ("Branch", self.branch.to_string()),
            ("SSH user", self.target.user.clone()),
            ("Server IP", self.target.host.to_string()),
            ("SSH key", self.target.key.display().to_string()),
            ("Application port", self.port.to_string()),
            ("Remote directory", self.remote_dir()),
        ]
    }
}

#[must_use]
pub fn remote_dir(target: &SshTarget, repo: &RepoUrl) -> String {
    format!("{}/{}", target.remote_home(), repo.name())
}

/// Docker-safe name derived from a repository name.
#[must_use]
pub fn app_name(repo_name: &str) -> String {
    repo_name
        .to_ascii_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}
