use tracing::info;

use crate::error::{DeployError, DeployResult};
use crate::ssh::Remote;

const COMPOSE_PLUGIN_DIR: &str = "/usr/local/lib/docker/cli-plugins";

/// Package manager of the remote distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Dnf,
    Yum,
}

/// One remote command of the bootstrap sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub label: &'static str,
    pub command: String,
}

impl PackageManager {
    /// Select a package manager from `/etc/os-release` content,
    /// looking at `ID` first and then `ID_LIKE`.
    pub fn from_os_release(content: &str) -> DeployResult<Self> {
        let id = os_release_value(content, "ID").unwrap_or_default();
        let version = os_release_value(content, "VERSION_ID").unwrap_or_default();
        let like = os_release_value(content, "ID_LIKE").unwrap_or_default();

        std::iter::once(id.as_str())
            .chain(like.split_whitespace())
            .find_map(|candidate| match candidate {
                "debian" | "ubuntu" | "linuxmint" | "pop" | "raspbian" => Some(Self::Apt),
                "amzn" if version == "2" => Some(Self::Yum),
                "fedora" | "rhel" | "centos" | "rocky" | "almalinux" | "ol" | "amzn" => {
                    Some(Self::Dnf)
                }
                _ => None,
            })
            .ok_or_else(|| {
                DeployError::UnsupportedDistro(if id.is_empty() {
                    "unknown".to_string()
                } else {
                    id.clone()
                })
            })
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Apt => "apt",
            Self::Dnf => "dnf",
            Self::Yum => "yum",
        }
    }

    fn update(self) -> String {
        match self {
            Self::Apt => "apt-get update -y && \
                          DEBIAN_FRONTEND=noninteractive apt-get upgrade -y"
                .to_string(),
            Self::Dnf => "dnf -y upgrade".to_string(),
            Self::Yum => "yum -y update".to_string(),
        }
    }

    fn install(self, packages: &str) -> String {
        match self {
            Self::Apt => {
                format!("DEBIAN_FRONTEND=noninteractive apt-get install -y {packages}")
            }
            Self::Dnf => format!("dnf install -y {packages}"),
            Self::Yum => format!("yum install -y {packages}"),
        }
    }

    fn install_docker(self) -> String {
        match self {
            Self::Apt | Self::Dnf => "curl -fsSL https://get.docker.com | sh".to_string(),
            Self::Yum => self.install("docker"),
        }
    }

    fn install_compose(self) -> String {
        let manual = format!(
            "mkdir -p {COMPOSE_PLUGIN_DIR} && \
             curl -fsSL https://github.com/docker/compose/releases/latest/download/\
             docker-compose-linux-$(uname -m) -o {COMPOSE_PLUGIN_DIR}/docker-compose && \
             chmod +x {COMPOSE_PLUGIN_DIR}/docker-compose"
        );
        match self {
            Self::Apt | Self::Dnf => {
                format!("{} || {{ {manual}; }}", self.install("docker-compose-plugin"))
            }
            Self::Yum => manual,
        }
    }
}

/// Commands that bring a fresh host to a deployable state. Installs
/// are skipped for tools already present.
#[must_use]
pub fn plan(pm: PackageManager, user: &str) -> Vec<Step> {
    vec![
        Step {
            label: "Updating system packages",
            command: pm.update(),
        },
        Step {
            label: "Installing Docker",
            command: format!(
                "command -v docker >/dev/null 2>&1 || {{ {}; }}",
                pm.install_docker()
            ),
        },
        Step {
            label: "Installing Docker Compose plugin",
            command: format!(
                "docker compose version >/dev/null 2>&1 || {{ {}; }}",
                pm.install_compose()
            ),
        },
        Step {
            label: "Installing Nginx",
            command: format!(
                "command -v nginx >/dev/null 2>&1 || {{ {}; }}",
                pm.install("nginx")
            ),
        },
        Step {
            label: "Adding user to docker group",
            command: format!("usermod -aG docker {user}"),
        },
        Step {
            label: "Enabling services",
            command: "systemctl enable --now docker && systemctl enable --now nginx".to_string(),
        },
    ]
}

/// Detect the distribution and run the bootstrap plan.
pub fn run(remote: &dyn Remote) -> DeployResult<PackageManager> {
    info!("Bootstrapping {}...", remote.host());

    let os_release = remote.exec("cat /etc/os-release")?;
    let mut pm = PackageManager::from_os_release(&os_release)?;
    if pm == PackageManager::Dnf && remote.exec("command -v dnf").is_err() {
        pm = PackageManager::Yum;
    }
    info!("Package manager: {}", pm.name());

    for step in plan(pm, remote.user()) {
        info!("{}...", step.label);
        remote.exec_interactive(&remote.privileged(&step.command))?;
    }

    let versions = remote.exec("docker --version; docker compose version; nginx -v 2>&1")?;
    for line in versions.lines() {
        info!("  {line}");
    }

    Ok(pm)
}

fn os_release_value(content: &str, key: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let (k, v) = line.trim().split_once('=')?;
        (k == key).then(|| v.trim_matches(|c| c == '"' || c == '\'').to_string())
    })
}
