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

//! Host environment checks callers consult before managing tunnels.

use std::ffi::OsStr;
use std::path::Path;

use tracing::debug;

const WG_BINARY: &str = "wg";

/// Tunnels can only be driven on Linux. Dev mode lifts the restriction so
/// the rest of the stack can be exercised elsewhere.
pub fn is_supported_host(dev_mode: bool) -> bool {
    dev_mode || cfg!(target_os = "linux")
}

/// Whether the `wg` tool is on this process's `PATH`.
pub fn tool_installed() -> bool {
    std::env::var_os("PATH").is_some_and(|path| binary_on_path(WG_BINARY, &path))
}

/// Whether `binary` exists as a file in any directory of `path_var`.
pub fn binary_on_path(binary: &str, path_var: &OsStr) -> bool {
    let found = std::env::split_paths(path_var).any(|dir| is_executable(&dir.join(binary)));
    debug!(binary, found, "looked up binary on PATH");
    found
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
