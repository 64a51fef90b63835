use crate::deploy::{App, Deployer};
use crate::repo::Manifest;

/// Deploy with `docker compose` from the repository's compose file.
#[derive(Debug, Default)]
pub struct ComposeDeploy;

impl ComposeDeploy {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Deployer for ComposeDeploy {
    fn manifest(&self) -> Manifest {
        Manifest::Compose
    }

    fn teardown_commands(&self, app: &App) -> Vec<String> {
        vec![format!("cd {} && docker compose down", app.remote_dir)]
    }

    fn start_commands(&self, app: &App) -> Vec<String> {
        vec![format!("cd {} && docker compose up -d --build", app.remote_dir)]
    }

    fn purge_commands(&self, app: &App) -> Vec<String> {
        vec![format!(
            "cd {} && docker compose down --volumes --rmi all --remove-orphans",
            app.remote_dir
        )]
    }

    fn running_command(&self, app: &App) -> String {
        format!(
            "cd {} && docker compose ps --status running -q",
            app.remote_dir
        )
    }
}
