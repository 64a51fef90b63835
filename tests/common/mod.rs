#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use dockship::error::{DeployError, DeployResult};
use dockship::github::GitHost;
use dockship::params::{Branch, RepoUrl, SshTarget, Token};
use dockship::prompt::Prompter;
use dockship::ssh::Remote;

pub const UBUNTU_OS_RELEASE: &str = "\
PRETTY_NAME=\"Ubuntu 24.04 LTS\"
NAME=\"Ubuntu\"
VERSION_ID=\"24.04\"
ID=ubuntu
ID_LIKE=debian
";

/// Remote host that records every command instead of running it.
pub struct FakeRemote {
    user: String,
    host: String,
    reachable: bool,
    pingable: bool,
    fail_on: Vec<String>,
    responses: Vec<(String, String)>,
    pub commands: RefCell<Vec<String>>,
    pub files: RefCell<Vec<(String, String)>>,
    pub mirrored: RefCell<Vec<(PathBuf, String)>>,
}

impl FakeRemote {
    pub fn new(user: &str) -> Self {
        Self {
            user: user.to_string(),
            host: "203.0.113.10".to_string(),
            reachable: true,
            pingable: true,
            fail_on: Vec::new(),
            responses: Vec::new(),
            commands: RefCell::new(Vec::new()),
            files: RefCell::new(Vec::new()),
            mirrored: RefCell::new(Vec::new()),
        }
    }

    /// A host that accepts SSH and answers like a fresh Ubuntu box
    /// with running services.
    pub fn healthy(user: &str) -> Self {
        Self::new(user)
            .respond("cat /etc/os-release", UBUNTU_OS_RELEASE)
            .respond("systemctl is-active", "active")
            .respond("docker ps", "3f2a1c")
            .respond("docker compose ps", "3f2a1c")
            .respond("docker --version", "Docker version 27.0.3")
    }

    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self.pingable = false;
        self
    }

    pub fn no_ping(mut self) -> Self {
        self.pingable = false;
        self
    }

    /// Fail every command containing `pattern`.
    pub fn fail_on(mut self, pattern: &str) -> Self {
        self.fail_on.push(pattern.to_string());
        self
    }

    /// Answer commands containing `pattern` with `output`.
    pub fn respond(mut self, pattern: &str, output: &str) -> Self {
        self.responses.push((pattern.to_string(), output.to_string()));
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }

    pub fn ran(&self, pattern: &str) -> bool {
        self.commands.borrow().iter().any(|c| c.contains(pattern))
    }

    fn run(&self, command: &str) -> DeployResult<String> {
        self.commands.borrow_mut().push(command.to_string());
        if !self.reachable {
            return Err(DeployError::Other(format!(
                "ssh: connect to host {} port 22: Connection timed out",
                self.host
            )));
        }
        if self.fail_on.iter().any(|p| command.contains(p.as_str())) {
            return Err(DeployError::Other(format!("remote command failed: {command}")));
        }
        Ok(self
            .responses
            .iter()
            .find(|(p, _)| command.contains(p.as_str()))
            .map(|(_, out)| out.clone())
            .unwrap_or_default())
    }
}

impl Remote for FakeRemote {
    fn user(&self) -> &str {
        &self.user
    }

    fn host(&self) -> &str {
        &self.host
    }

    fn exec(&self, command: &str) -> DeployResult<String> {
        self.run(command)
    }

    fn exec_interactive(&self, command: &str) -> DeployResult<()> {
        self.run(command).map(|_| ())
    }

    fn write_remote_file(&self, content: &str, remote_path: &str) -> DeployResult<()> {
        self.run(&format!("cat > {remote_path}"))?;
        self.files
            .borrow_mut()
            .push((remote_path.to_string(), content.to_string()));
        Ok(())
    }

    fn mirror_dir(&self, local_dir: &Path, remote_dir: &str) -> DeployResult<()> {
        self.run(&format!("rsync {} {remote_dir}", local_dir.display()))?;
        self.mirrored
            .borrow_mut()
            .push((local_dir.to_path_buf(), remote_dir.to_string()));
        Ok(())
    }

    fn ping(&self) -> bool {
        self.pingable
    }
}

/// Prompter answering from fixed queues.
#[derive(Default)]
pub struct ScriptedPrompter {
    inputs: VecDeque<String>,
    secrets: VecDeque<String>,
    confirms: VecDeque<bool>,
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inputs(mut self, answers: &[&str]) -> Self {
        self.inputs.extend(answers.iter().map(|a| (*a).to_string()));
        self
    }

    pub fn secrets(mut self, answers: &[&str]) -> Self {
        self.secrets.extend(answers.iter().map(|a| (*a).to_string()));
        self
    }

    pub fn confirms(mut self, answers: &[bool]) -> Self {
        self.confirms.extend(answers.iter().copied());
        self
    }

    pub fn times_asked(&self, prompt: &str) -> usize {
        self.asked.iter().filter(|p| p.as_str() == prompt).count()
    }

    pub fn remaining_inputs(&self) -> usize {
        self.inputs.len()
    }

    fn exhausted(prompt: &str) -> DeployError {
        DeployError::Other(format!("no scripted answer for '{prompt}'"))
    }
}

impl Prompter for ScriptedPrompter {
    fn input(&mut self, prompt: &str, default: Option<&str>) -> DeployResult<String> {
        self.asked.push(prompt.to_string());
        let answer = self.inputs.pop_front().ok_or_else(|| Self::exhausted(prompt))?;
        match default {
            Some(default) if answer.is_empty() => Ok(default.to_string()),
            _ => Ok(answer),
        }
    }

    fn secret(&mut self, prompt: &str) -> DeployResult<String> {
        self.asked.push(prompt.to_string());
        self.secrets.pop_front().ok_or_else(|| Self::exhausted(prompt))
    }

    fn confirm(&mut self, prompt: &str, _default: bool) -> DeployResult<bool> {
        self.asked.push(prompt.to_string());
        self.confirms.pop_front().ok_or_else(|| Self::exhausted(prompt))
    }
}

/// GitHub stand-in with a fixed set of valid tokens and branches.
#[derive(Default)]
pub struct FakeGitHost {
    valid_tokens: Vec<String>,
    branches: Vec<String>,
    offline: bool,
    pub token_checks: Cell<u32>,
    pub branch_checks: Cell<u32>,
}

impl FakeGitHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(mut self, token: &str) -> Self {
        self.valid_tokens.push(token.to_string());
        self
    }

    pub fn branch(mut self, branch: &str) -> Self {
        self.branches.push(branch.to_string());
        self
    }

    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }
}

impl GitHost for FakeGitHost {
    fn verify_token(&self, token: &Token) -> DeployResult<Option<String>> {
        self.token_checks.set(self.token_checks.get() + 1);
        if self.offline {
            return Err(DeployError::Other("could not resolve host".into()));
        }
        Ok(self
            .valid_tokens
            .iter()
            .any(|t| t == token.expose())
            .then(|| "octocat".to_string()))
    }

    fn branch_exists(
        &self,
        _repo: &RepoUrl,
        branch: &Branch,
        _token: Option<&Token>,
    ) -> DeployResult<bool> {
        self.branch_checks.set(self.branch_checks.get() + 1);
        if self.offline {
            return Err(DeployError::Other("could not resolve host".into()));
        }
        Ok(self.branches.iter().any(|b| b == branch.as_str()))
    }
}

/// Write an empty file standing in for an SSH private key.
pub fn fake_key(dir: &Path) -> PathBuf {
    let path = dir.join("id_test");
    std::fs::write(&path, "not a real key").expect("write key");
    path
}

/// Session factory handing out `remote` for any target.
pub fn connect_to<'r>(
    remote: &'r FakeRemote,
) -> impl Fn(&SshTarget) -> DeployResult<Box<dyn Remote + 'r>> + 'r {
    move |_| {
        let session: Box<dyn Remote + 'r> = Box::new(remote);
        Ok(session)
    }
}

/// Session factory for runs that must stay local.
pub fn never_connect(target: &SshTarget) -> DeployResult<Box<dyn Remote>> {
    panic!("unexpected connection to {}", target.destination())
}
