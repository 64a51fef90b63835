use crate::deploy::{App, Deployer};
use crate::repo::Manifest;

/// Deploy a single container built from the repository's
/// `Dockerfile`.
///
/// The container publishes the application port on the same host
/// port and restarts unless stopped.
#[derive(Debug, Default)]
pub struct ContainerDeploy;

impl ContainerDeploy {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Deployer for ContainerDeploy {
    fn manifest(&self) -> Manifest {
        Manifest::Dockerfile
    }

    fn teardown_commands(&self, app: &App) -> Vec<String> {
        vec![
            format!("docker stop {}", app.name),
            format!("docker rm {}", app.name),
        ]
    }

    fn start_commands(&self, app: &App) -> Vec<String> {
        let publish = app
            .port
            .map(|p| format!(" -p {p}:{p}"))
            .unwrap_or_default();
        vec![
            format!("cd {} && docker build -t {} .", app.remote_dir, app.name),
            format!(
                "docker run -d --name {name} --restart unless-stopped{publish} {name}",
                name = app.name
            ),
        ]
    }

    fn purge_commands(&self, app: &App) -> Vec<String> {
        let mut commands = self.teardown_commands(app);
        commands.push(format!("docker rmi {}", app.name));
        commands
    }

    fn running_command(&self, app: &App) -> String {
        format!(
            "docker ps -q --filter status=running --filter name=^{}$",
            app.name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::AppPort;

    #[test]
    fn run_publishes_port() {
        let app = App::new("api", "/home/u/api").expose(AppPort::parse("8080").unwrap());
        let commands = ContainerDeploy::new().start_commands(&app);

        assert_eq!(commands[0], "cd /home/u/api && docker build -t api .");
        assert_eq!(
            commands[1],
            "docker run -d --name api --restart unless-stopped -p 8080:8080 api"
        );
    }

    #[test]
    fn purge_removes_image_last() {
        let app = App::new("api", "/home/u/api");
        let commands = ContainerDeploy::new().purge_commands(&app);

        assert_eq!(
            commands,
            vec!["docker stop api", "docker rm api", "docker rmi api"]
        );
    }
}
