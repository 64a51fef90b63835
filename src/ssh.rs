use std::path::{Path, PathBuf};

use crate::cmd;
use crate::error::{DeployError, DeployResult};
use crate::params::SshTarget;

/// A remote host commands can be run on.
///
/// [`SshSession`] is the real implementation; every remote stage is
/// written against this trait.
pub trait Remote {
    /// Login user on the remote host.
    fn user(&self) -> &str;

    /// Host address as given to ssh.
    fn host(&self) -> &str;

    /// Execute a command on the remote host and capture output.
    fn exec(&self, command: &str) -> DeployResult<String>;

    /// Execute a command on the remote host with output streamed to
    /// the terminal.
    fn exec_interactive(&self, command: &str) -> DeployResult<()>;

    /// Write content to a remote file via stdin pipe.
    fn write_remote_file(&self, content: &str, remote_path: &str) -> DeployResult<()>;

    /// Mirror a local directory into `remote_dir`, deleting remote
    /// files that do not exist locally.
    fn mirror_dir(&self, local_dir: &Path, remote_dir: &str) -> DeployResult<()>;

    /// Whether the host answers ICMP echo.
    fn ping(&self) -> bool;

    /// Open a non-interactive session and run a no-op.
    fn check_connection(&self) -> DeployResult<()> {
        self.exec("echo ok")
            .map(|_| ())
            .map_err(|e| DeployError::SshFailed(format!("{}@{}: {e}", self.user(), self.host())))
    }

    /// Prefix for commands that need root.
    fn sudo(&self) -> &'static str {
        if self.user() == "root" { "" } else { "sudo " }
    }

    /// Wrap a shell snippet so it runs as root.
    fn privileged(&self, script: &str) -> String {
        if self.sudo().is_empty() {
            script.to_string()
        } else {
            format!("sudo sh -c '{}'", script.replace('\'', r"'\''"))
        }
    }
}

impl<R: Remote + ?Sized> Remote for &R {
    fn user(&self) -> &str {
        (**self).user()
    }

    fn host(&self) -> &str {
        (**self).host()
    }

    fn exec(&self, command: &str) -> DeployResult<String> {
        (**self).exec(command)
    }

    fn exec_interactive(&self, command: &str) -> DeployResult<()> {
        (**self).exec_interactive(command)
    }

    fn write_remote_file(&self, content: &str, remote_path: &str) -> DeployResult<()> {
        (**self).write_remote_file(content, remote_path)
    }

    fn mirror_dir(&self, local_dir: &Path, remote_dir: &str) -> DeployResult<()> {
        (**self).mirror_dir(local_dir, remote_dir)
    }

    fn ping(&self) -> bool {
        (**self).ping()
    }
}

/// SSH session wrapper for executing commands and transferring
/// files to a remote host.
pub struct SshSession {
    host: String,
    user: String,
    key: Option<PathBuf>,
}

impl SshSession {
    #[must_use]
    pub fn new(host: &str, user: &str) -> Self {
        Self {
            host: host.to_string(),
            user: user.to_string(),
            key: None,
        }
    }

    #[must_use]
    pub fn with_key(mut self, key_path: &Path) -> Self {
        self.key = Some(key_path.to_path_buf());
        self
    }

    #[must_use]
    pub fn for_target(target: &SshTarget) -> Self {
        Self::new(&target.host.to_string(), &target.user).with_key(&target.key)
    }

    fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    fn build_ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = self.ssh_base_args();
        args.push(self.destination());
        args.push(command.to_string());
        args
    }

    fn ssh_base_args(&self) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            "ConnectTimeout=10".to_string(),
        ];
        if let Some(key) = &self.key {
            args.push("-i".to_string());
            args.push(key.display().to_string());
        }
        args
    }

    /// `ssh` invocation handed to rsync's `-e`.
    fn rsync_shell(&self) -> String {
        let mut shell = vec!["ssh".to_string()];
        shell.extend(self.ssh_base_args().into_iter().map(|a| {
            if a.contains(' ') {
                format!("'{a}'")
            } else {
                a
            }
        }));
        shell.join(" ")
    }
}

impl Remote for SshSession {
    fn user(&self) -> &str {
        &self.user
    }

    fn host(&self) -> &str {
        &self.host
    }

    fn exec(&self, command: &str) -> DeployResult<String> {
        let args = self.build_ssh_args(command);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run("ssh", &refs)
    }

    fn exec_interactive(&self, command: &str) -> DeployResult<()> {
        let args = self.build_ssh_args(command);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run_interactive("ssh", &refs)
    }

    fn write_remote_file(&self, content: &str, remote_path: &str) -> DeployResult<()> {
        let command = format!("cat > {remote_path}");
        let args = self.build_ssh_args(&command);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run_with_stdin("ssh", &refs, content.as_bytes())?;
        Ok(())
    }

    fn mirror_dir(&self, local_dir: &Path, remote_dir: &str) -> DeployResult<()> {
        let source = format!("{}/", local_dir.display());
        let dest = format!("{}:{remote_dir}/", self.destination());
        let shell = self.rsync_shell();
        cmd::run_interactive(
            "rsync",
            &[
                "-az",
                "--delete",
                "--exclude",
                ".git",
                "-e",
                &shell,
                &source,
                &dest,
            ],
        )
    }

    fn ping(&self) -> bool {
        cmd::succeeds("ping", &["-c", "2", "-W", "3", &self.host])
    }
}
