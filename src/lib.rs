//! Interactive deployment of a Dockerized git repository to a remote
//! Linux host.
//!
//! `dockship` asks for (or reads from flags and a config file) the
//! repository, branch, SSH login and application port, then walks a
//! fixed sequence of stages, each shelling out to standard tools:
//!
//! 1. **Collect** - validate every parameter into a typed value
//!    ([`DeployParams`]); verify the access token and branch against
//!    the GitHub API
//! 2. **Sync** - clone or update the repository locally and pick the
//!    deployment mode from its manifest ([`repo::Manifest`])
//! 3. **Preflight** - local tools, SSH key, ping
//! 4. **Connect** - non-interactive SSH login
//! 5. **Bootstrap** - install Docker, the Compose plugin and Nginx
//!    with the host's package manager
//! 6. **Deploy** - rsync the checkout, rebuild and start containers,
//!    poll the application port
//! 7. **Proxy** - install an Nginx server block in front of the app
//! 8. **Validate** - read-only service and HTTP checks
//!
//! `--cleanup` replaces stages 2 to 8 with a best-effort teardown.
//!
//! Each stage either completes or ends the run with an exit code
//! from [`DeployError::exit_code`]. Every event is written to stderr
//! and to a per-run log file.
//!
//! Remote work goes through the [`Remote`](ssh::Remote) trait,
//! prompts through [`Prompter`](prompt::Prompter) and API checks
//! through [`GitHost`](github::GitHost), so each stage can be driven
//! without a terminal, a server or the network.
//!
//! # Example
//!
//! ```rust,no_run
//! use dockship::pipeline::connect_ssh;
//! use dockship::{Cli, GitHub, Pipeline, Terminal};
//!
//! fn main() -> anyhow::Result<()> {
//!     let cli = Cli {
//!         repo: Some("https://github.com/acme/shop.git".into()),
//!         port: Some("3000".into()),
//!         ..Cli::default()
//!     };
//!     let pipeline = Pipeline::from_cli(cli)?;
//!     pipeline.run(&mut Terminal::new(), &GitHub::new(), &connect_ssh)?;
//!     Ok(())
//! }
//! ```

// Allow noisy pedantic lints that don't add value for a
// deployment tool crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod bootstrap;
pub mod cleanup;
pub mod cmd;
pub mod collect;
pub mod config;
pub mod deploy;
pub mod error;
pub mod github;
pub mod health;
pub mod logging;
pub mod nginx;
pub mod params;
pub mod pipeline;
pub mod prompt;
pub mod repo;
pub mod ssh;
pub mod validate;

pub use collect::Collector;
pub use config::DeployConfig;
pub use deploy::App;
pub use error::{DeployError, DeployResult};
pub use github::GitHub;
pub use health::RetryPolicy;
pub use nginx::NginxSite;
pub use params::DeployParams;
pub use pipeline::{Cli, Pipeline};
pub use prompt::Terminal;
pub use ssh::SshSession;
