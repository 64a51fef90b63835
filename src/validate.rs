use tracing::{info, warn};

use crate::cmd;
use crate::deploy::{App, Deployer};
use crate::health;
use crate::ssh::Remote;

/// Outcome of one post-deploy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub name: String,
    pub passed: bool,
}

/// Outcome of all post-deploy checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub checks: Vec<Check>,
}

impl ValidationReport {
    fn record(&mut self, name: String, passed: bool) {
        if passed {
            info!("  [ok] {name}");
        } else {
            warn!("  [!!] {name}");
        }
        self.checks.push(Check { name, passed });
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &Check> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

/// Probe a URL from the local machine.
#[must_use]
pub fn local_http_probe(url: &str) -> bool {
    cmd::succeeds("curl", &["-fsS", "-o", "/dev/null", "--max-time", "10", url])
}

/// Read-only status checks after a deployment. Anomalies are logged
/// as warnings and never fail the run.
pub fn run(
    remote: &dyn Remote,
    deployer: &dyn Deployer,
    app: &App,
    external_probe: &dyn Fn(&str) -> bool,
) -> ValidationReport {
    info!("Validating deployment...");
    let mut report = ValidationReport::default();

    for service in ["docker", "nginx"] {
        let active = remote
            .exec(&format!("systemctl is-active {service}"))
            .is_ok_and(|out| out.trim() == "active");
        report.record(format!("{service} service active"), active);
    }

    let running = remote
        .exec(&remote.privileged(&deployer.running_command(app)))
        .is_ok_and(|out| !out.trim().is_empty());
    report.record(format!("{} running", app.name), running);

    if let Some(port) = app.port {
        let local = remote.exec(&health::probe_command(port.get())).is_ok();
        report.record(format!("HTTP on localhost:{port}"), local);
    }

    let url = format!("http://{}/", remote.host());
    let external = external_probe(&url);
    report.record(format!("HTTP on {url}"), external);

    if report.all_passed() {
        info!("All checks passed");
    } else {
        warn!(
            "{} of {} checks failed",
            report.failures().count(),
            report.checks.len()
        );
    }
    report
}
