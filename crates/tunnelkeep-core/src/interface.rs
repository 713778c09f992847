// Copyright (C) 2025 Joseph Sacchini
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU Affero General Public License as published by the Free
// Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more
// details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use std::future::Future;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};
use tunnelkeep_types::Server;

use crate::render;

#[derive(Debug, Error)]
pub enum InterfaceError {
    #[error("`{program} {directive}` failed for {tag}: {stderr}")]
    Command {
        program: String,
        directive: &'static str,
        tag: String,
        stderr: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Brings tunnel interfaces up and down on the host.
pub trait InterfaceControl: Send + Sync {
    fn start_interface(
        &self,
        server: &Server,
    ) -> impl Future<Output = Result<(), InterfaceError>> + Send;
    fn stop_interface(&self, tag: &str) -> impl Future<Output = Result<(), InterfaceError>> + Send;
}

/// Drives interfaces through `wg-quick`, keeping one `<tag>.conf` per server
/// in `config_dir`.
#[derive(Debug, Clone)]
pub struct WgQuick {
    program: String,
    config_dir: PathBuf,
}

impl WgQuick {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self::with_program("wg-quick", config_dir)
    }

    pub fn with_program(program: impl Into<String>, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            config_dir: config_dir.into(),
        }
    }

    pub fn config_path(&self, tag: &str) -> PathBuf {
        self.config_dir.join(format!("{tag}.conf"))
    }

    async fn run(&self, directive: &'static str, tag: &str, conf: &Path) -> Result<(), InterfaceError> {
        debug!(program = %self.program, directive, tag, conf = %conf.display(), "invoking interface tool");

        let output = Command::new(&self.program)
            .arg(directive)
            .arg(conf)
            .output()
            .await?;

        if !output.status.success() {
            return Err(InterfaceError::Command {
                program: self.program.clone(),
                directive,
                tag: tag.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!(interface = tag, directive, "interface tool succeeded");
        Ok(())
    }
}

impl InterfaceControl for WgQuick {
    async fn start_interface(&self, server: &Server) -> Result<(), InterfaceError> {
        tokio::fs::create_dir_all(&self.config_dir).await?;
        let conf = self.config_path(&server.tag);
        tokio::fs::write(&conf, render::server_config(server)).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&conf, std::fs::Permissions::from_mode(0o600)).await?;
        }
        debug!(interface = %server.tag, conf = %conf.display(), "wrote interface config");

        self.run("up", &server.tag, &conf).await
    }

    async fn stop_interface(&self, tag: &str) -> Result<(), InterfaceError> {
        let conf = self.config_path(tag);
        self.run("down", tag, &conf).await
    }
}
