mod common;

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use common::{FakeGitHost, FakeRemote, ScriptedPrompter};
use dockship::deploy::App;
use dockship::error::DeployError;
use dockship::params::{AppPort, Branch, DeployParams, RepoUrl, SshTarget};
use dockship::pipeline::{self, Cli, Pipeline, Stage};
use dockship::repo::{Checkout, Manifest};
use dockship::RetryPolicy;

const FAST: RetryPolicy = RetryPolicy::new(2, Duration::ZERO);

fn params(user: &str) -> DeployParams {
    DeployParams {
        repo: RepoUrl::parse("https://github.com/acme/shop.git").unwrap(),
        token: None,
        branch: Branch::default(),
        target: SshTarget {
            user: user.to_string(),
            host: Ipv4Addr::new(203, 0, 113, 10),
            key: PathBuf::from("/keys/id_ed25519"),
        },
        port: AppPort::parse("3000").unwrap(),
    }
}

fn checkout() -> Checkout {
    Checkout {
        dir: PathBuf::from("./shop"),
        branch: Branch::default(),
    }
}

fn position(commands: &[String], pattern: &str) -> usize {
    commands
        .iter()
        .position(|c| c.contains(pattern))
        .unwrap_or_else(|| panic!("no command containing '{pattern}'"))
}

#[test]
fn unreachable_host_stops_before_bootstrap() {
    let remote = FakeRemote::new("deploy").unreachable();

    let err = pipeline::ship(
        &remote,
        &params("deploy"),
        &checkout(),
        Manifest::Compose,
        &FAST,
        &|_| true,
    )
    .unwrap_err();

    assert!(matches!(err, DeployError::SshFailed(_)));
    assert_eq!(err.exit_code(), 6);
    assert_eq!(remote.commands(), vec!["echo ok"]);
    assert!(remote.files.borrow().is_empty());
}

#[test]
fn missing_ping_only_warns() {
    let remote = FakeRemote::healthy("root").no_ping();

    let report = pipeline::ship(
        &remote,
        &params("root"),
        &checkout(),
        Manifest::Dockerfile,
        &FAST,
        &|_| true,
    )
    .unwrap();

    assert!(report.all_passed());
}

#[test]
fn stages_run_in_order() {
    let remote = FakeRemote::healthy("deploy");

    let report = pipeline::ship(
        &remote,
        &params("deploy"),
        &checkout(),
        Manifest::Compose,
        &FAST,
        &|_| true,
    )
    .unwrap();

    let commands = remote.commands();
    let connect = position(&commands, "echo ok");
    let bootstrap = position(&commands, "cat /etc/os-release");
    let mirror = position(&commands, "rsync ./shop /home/deploy/shop");
    let compose = position(&commands, "docker compose up -d --build");
    let proxy = position(&commands, "cat > /tmp/dockship-nginx-site");
    let validate = position(&commands, "systemctl is-active docker");

    assert_eq!(connect, 0);
    assert!(connect < bootstrap);
    assert!(bootstrap < mirror);
    assert!(mirror < compose);
    assert!(compose < proxy);
    assert!(proxy < validate);
    assert!(report.all_passed());

    let files = remote.files.borrow();
    assert!(files[0].1.contains("proxy_pass http://127.0.0.1:3000;"));
    assert!(files[0].1.contains("server_name 203.0.113.10;"));
}

#[test]
fn start_failure_skips_proxy() {
    let remote = FakeRemote::healthy("root").fail_on("docker compose up");

    let err = pipeline::ship(
        &remote,
        &params("root"),
        &checkout(),
        Manifest::Compose,
        &FAST,
        &|_| true,
    )
    .unwrap_err();

    assert_eq!(err.exit_code(), 1);
    assert!(remote.files.borrow().is_empty());
}

#[test]
fn cleanup_proceeds_when_ssh_check_fails() {
    let remote = FakeRemote::new("deploy").unreachable();
    let app = App::new("shop", "/home/deploy/shop");

    let report = pipeline::run_cleanup(&remote, &app);

    assert_eq!(report.attempted, 7);
    assert_eq!(remote.commands().len(), 8);
}

#[test]
fn stage_names() {
    assert_eq!(Stage::Collect.to_string(), "Parameter collection");
    assert_eq!(Stage::Connect.to_string(), "SSH connectivity");
    assert_eq!(Stage::Cleanup.to_string(), "Cleanup");
    assert_ne!(Stage::Preflight.to_string(), Stage::Reach.to_string());
}

#[test]
fn stage_passes_result_through() {
    assert_eq!(pipeline::stage(Stage::Sync, || Ok(7)).unwrap(), 7);

    let err = pipeline::stage::<()>(Stage::Sync, || {
        Err(DeployError::ManifestMissing("/tmp/x".into()))
    })
    .unwrap_err();
    assert_eq!(err.exit_code(), 5);
}

#[test]
fn flags_override_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deploy.yaml");
    std::fs::write(
        &path,
        "repo: https://github.com/acme/shop.git\n\
         ssh_user: deploy\n\
         ssh_host: 203.0.113.10\n\
         app_port: 3000\n\
         health:\n  attempts: 4\n  interval_secs: 1\n",
    )
    .unwrap();

    let cli = Cli {
        config: Some(path),
        user: Some("admin".into()),
        port: Some("8080".into()),
        ..Cli::default()
    };
    let pipeline = Pipeline::from_cli(cli).unwrap();
    let preset = pipeline.preset();

    assert_eq!(preset.user.as_deref(), Some("admin"));
    assert_eq!(preset.port.as_deref(), Some("8080"));
    assert_eq!(preset.host.as_deref(), Some("203.0.113.10"));
    assert_eq!(
        preset.repo.as_deref(),
        Some("https://github.com/acme/shop.git")
    );
    assert_eq!(preset.branch, None);
    assert_eq!(
        pipeline.retry_policy(),
        RetryPolicy::new(4, Duration::from_secs(1))
    );
}

#[test]
fn defaults_without_config() {
    let pipeline = Pipeline::from_cli(Cli::default()).unwrap();

    assert_eq!(pipeline.workdir(), PathBuf::from("."));
    assert_eq!(pipeline.log_dir(), PathBuf::from("."));
    assert_eq!(pipeline.retry_policy(), RetryPolicy::default());
}

#[test]
fn missing_config_file_is_reported() {
    let cli = Cli {
        config: Some(PathBuf::from("/nonexistent/deploy.yaml")),
        ..Cli::default()
    };

    let err = Pipeline::from_cli(cli).err().unwrap();
    assert!(matches!(err, DeployError::FileNotFound(_)));
}

fn answered_cli(key: &std::path::Path) -> Cli {
    Cli {
        repo: Some("git@example.com:acme/shop.git".into()),
        branch: Some("main".into()),
        user: Some("deploy".into()),
        host: Some("203.0.113.10".into()),
        key: Some(key.display().to_string()),
        port: Some("3000".into()),
        ..Cli::default()
    }
}

#[test]
fn declined_confirmation_ends_run_with_zero() {
    let dir = tempfile::tempdir().unwrap();
    let key = common::fake_key(dir.path());
    let pipeline = Pipeline::from_cli(answered_cli(&key)).unwrap();
    let mut prompter = ScriptedPrompter::new().confirms(&[false]);

    let err = pipeline
        .run(&mut prompter, &FakeGitHost::new(), &common::never_connect)
        .unwrap_err();

    assert!(matches!(err, DeployError::Cancelled));
    assert_eq!(err.exit_code(), 0);
    assert_eq!(prompter.asked, vec!["Proceed with deployment?"]);
}

#[test]
fn cleanup_flag_tears_down_connected_host() {
    let dir = tempfile::tempdir().unwrap();
    let key = common::fake_key(dir.path());
    let cli = Cli {
        cleanup: true,
        ..answered_cli(&key)
    };
    let pipeline = Pipeline::from_cli(cli).unwrap();
    let remote = FakeRemote::new("deploy");
    let mut prompter = ScriptedPrompter::new();

    pipeline
        .run(&mut prompter, &FakeGitHost::new(), &common::connect_to(&remote))
        .unwrap();

    assert!(prompter.asked.is_empty());
    assert_eq!(remote.commands()[0], "echo ok");
    assert!(remote.ran("rm -rf /home/deploy/shop"));
    assert!(remote.ran("docker rmi shop"));
    assert!(!remote.ran("docker compose up"));
    assert!(remote.mirrored.borrow().is_empty());
}

#[test]
fn cleanup_stops_when_connection_cannot_open() {
    let dir = tempfile::tempdir().unwrap();
    let key = common::fake_key(dir.path());
    let cli = Cli {
        cleanup: true,
        ..answered_cli(&key)
    };
    let pipeline = Pipeline::from_cli(cli).unwrap();

    let err = pipeline
        .run(&mut ScriptedPrompter::new(), &FakeGitHost::new(), &|_| {
            Err(DeployError::SshFailed("bad key".into()))
        })
        .unwrap_err();

    assert_eq!(err.exit_code(), 6);
}
