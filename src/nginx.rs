use std::fmt::Write as _;

use tracing::info;

use crate::error::DeployResult;
use crate::ssh::Remote;

/// Site file replaced on the remote host.
pub const SITE_PATH: &str = "/etc/nginx/sites-available/default";
const ENABLED_PATH: &str = "/etc/nginx/sites-enabled/default";
const UPLOAD_PATH: &str = "/tmp/dockship-nginx-site";

/// Nginx server block forwarding all traffic to the application.
///
/// # Example
///
/// ```
/// use dockship::nginx::NginxSite;
///
/// let site = NginxSite::new("203.0.113.10", 3000);
/// let conf = site.render();
///
/// assert!(conf.contains("proxy_pass http://127.0.0.1:3000;"));
/// assert!(conf.contains("server_name 203.0.113.10;"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NginxSite {
    pub server_name: String,
    pub upstream_port: u16,
}

impl NginxSite {
    #[must_use]
    pub fn new(server_name: &str, upstream_port: u16) -> Self {
        Self {
            server_name: server_name.to_string(),
            upstream_port,
        }
    }

    /// Render the server block.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "server {{");
        out.push_str("    listen 80;\n    listen [::]:80;\n");
        let _ = writeln!(out, "    server_name {};", self.server_name);
        out.push('\n');
        let _ = writeln!(out, "    location / {{");
        let _ = writeln!(
            out,
            "        proxy_pass http://127.0.0.1:{};",
            self.upstream_port
        );
        for line in [
            "proxy_http_version 1.1;",
            "proxy_set_header Upgrade $http_upgrade;",
            "proxy_set_header Connection \"upgrade\";",
            "proxy_set_header Host $host;",
            "proxy_set_header X-Real-IP $remote_addr;",
            "proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;",
            "proxy_set_header X-Forwarded-Proto $scheme;",
            "proxy_cache_bypass $http_upgrade;",
        ] {
            let _ = writeln!(out, "        {line}");
        }
        let _ = writeln!(out, "    }}");
        let _ = writeln!(out, "}}");
        out
    }
}

/// Install `site` as the default Nginx site, check the configuration
/// and reload.
pub fn configure(remote: &dyn Remote, site: &NginxSite) -> DeployResult<()> {
    info!(
        "Configuring Nginx: {} -> 127.0.0.1:{}",
        site.server_name, site.upstream_port
    );

    remote.write_remote_file(&site.render(), UPLOAD_PATH)?;
    remote.exec(&remote.privileged(&format!(
        "mkdir -p /etc/nginx/sites-available /etc/nginx/sites-enabled && \
         mv {UPLOAD_PATH} {SITE_PATH} && \
         ln -sf {SITE_PATH} {ENABLED_PATH}"
    )))?;

    info!("Validating Nginx configuration...");
    remote.exec_interactive(&remote.privileged("nginx -t"))?;
    remote.exec(&remote.privileged("systemctl reload nginx"))?;

    info!("Nginx reloaded");
    Ok(())
}
