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

use std::env;
use std::path::PathBuf;

use thiserror::Error;

/// File name of the backing document inside the data directory.
pub const DOCUMENT_FILE: &str = "wireguard.json";

const DEFAULT_INTERFACE_DIR: &str = "/etc/wireguard";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub interface_dir: PathBuf,
    pub dev_mode: bool,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("missing required environment variable: {var}")]
    MissingEnvVar { var: &'static str },

    #[error("{var} must be a boolean (1/0, true/false, yes/no), got {value:?}")]
    InvalidBool { var: &'static str, value: String },
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, SettingsError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(SettingsError::InvalidBool {
            var,
            value: value.to_string(),
        }),
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let require = |var: &'static str| lookup(var).ok_or(SettingsError::MissingEnvVar { var });

        let dev_mode = match lookup("TUNNELKEEP_DEV_MODE") {
            Some(value) => parse_bool("TUNNELKEEP_DEV_MODE", &value)?,
            None => false,
        };

        Ok(Self {
            data_dir: require("TUNNELKEEP_DATA_DIR")?.into(),
            interface_dir: lookup("TUNNELKEEP_INTERFACE_DIR")
                .unwrap_or_else(|| DEFAULT_INTERFACE_DIR.to_string())
                .into(),
            dev_mode,
        })
    }

    pub fn document_path(&self) -> PathBuf {
        self.data_dir.join(DOCUMENT_FILE)
    }
}
