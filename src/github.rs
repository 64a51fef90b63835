use serde::Deserialize;

use crate::cmd;
use crate::error::{DeployError, DeployResult};
use crate::params::{Branch, RepoUrl, Token};

const GITHUB_API: &str = "https://api.github.com";

/// Remote git hosting API used to check credentials and branches
/// before cloning.
pub trait GitHost {
    /// Check a token against the API. Returns the account login when
    /// the token is accepted, `None` when it is rejected.
    fn verify_token(&self, token: &Token) -> DeployResult<Option<String>>;

    /// Check whether `branch` exists in `repo`.
    fn branch_exists(
        &self,
        repo: &RepoUrl,
        branch: &Branch,
        token: Option<&Token>,
    ) -> DeployResult<bool>;
}

/// GitHub REST API client using curl.
///
/// The token is passed to curl on stdin (`-H @-`) so it never shows
/// up in the process list or in error messages.
#[derive(Debug, Default)]
pub struct GitHub;

/// Status code and body of an API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Deserialize)]
struct User {
    login: String,
}

impl GitHub {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl GitHost for GitHub {
    fn verify_token(&self, token: &Token) -> DeployResult<Option<String>> {
        let response = api_get("/user", Some(token))?;
        if response.status != 200 {
            return Ok(None);
        }
        let user: User = serde_json::from_str(&response.body)?;
        Ok(Some(user.login))
    }

    fn branch_exists(
        &self,
        repo: &RepoUrl,
        branch: &Branch,
        token: Option<&Token>,
    ) -> DeployResult<bool> {
        let path = format!(
            "/repos/{}/{}/branches/{}",
            repo.owner(),
            repo.name(),
            branch
        );
        let response = api_get(&path, token)?;
        Ok(response.status == 200)
    }
}

/// GET `path` from the API, returning status and body.
fn api_get(path: &str, token: Option<&Token>) -> DeployResult<ApiResponse> {
    let url = format!("{GITHUB_API}{path}");
    let headers = token.map_or_else(String::new, |t| {
        format!("Authorization: Bearer {}\n", t.expose())
    });

    let output = cmd::run_with_stdin(
        "curl",
        &[
            "-s",
            "-H",
            "Accept: application/vnd.github+json",
            "-H",
            "User-Agent: dockship",
            "-H",
            "@-",
            "-w",
            "\n%{http_code}",
            &url,
        ],
        headers.as_bytes(),
    )?;

    parse_curl_output(&output)
}

/// Split curl output produced with `-w "\n%{http_code}"` into body
/// and status.
pub fn parse_curl_output(output: &str) -> DeployResult<ApiResponse> {
    let (body, code) = output.rsplit_once('\n').unwrap_or(("", output));
    let status = code
        .trim()
        .parse()
        .map_err(|_| DeployError::Other(format!("unexpected curl output: '{code}'")))?;
    Ok(ApiResponse {
        status,
        body: body.to_string(),
    })
}
