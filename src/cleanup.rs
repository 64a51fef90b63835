use tracing::{info, warn};

use crate::deploy::{App, ComposeDeploy, ContainerDeploy, Deployer};
use crate::ssh::Remote;

/// Result of a teardown: every step is attempted, failures are only
/// counted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub attempted: usize,
    pub failed: Vec<String>,
}

/// Commands that remove a deployment of `app`, in order.
///
/// The manifest on the host is not known any more, so both the
/// compose and single-container teardowns are included.
#[must_use]
pub fn plan(app: &App) -> Vec<String> {
    let compose = ComposeDeploy::new();
    let container = ContainerDeploy::new();

    let mut steps = compose.purge_commands(app);
    steps.extend(container.purge_commands(app));
    steps.push("docker volume prune -f".to_string());
    steps.push(format!("rm -rf {}", app.remote_dir));
    steps.push("systemctl reload nginx".to_string());
    steps
}

/// Tear down the application. Never fails; a step that errors is
/// logged and the next one runs.
pub fn run(remote: &dyn Remote, app: &App) -> CleanupReport {
    info!("Cleaning up {} on {}...", app.name, remote.host());
    let mut report = CleanupReport::default();

    for step in plan(app) {
        report.attempted += 1;
        match remote.exec(&remote.privileged(&step)) {
            Ok(_) => info!("  done: {step}"),
            Err(e) => {
                warn!("  ignored: {step}: {e}");
                report.failed.push(step);
            }
        }
    }

    info!(
        "Cleanup finished ({} of {} steps failed)",
        report.failed.len(),
        report.attempted
    );
    report
}
