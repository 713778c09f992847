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

//! tunnelkeep-core: the configuration engine behind tunnelkeep.
//!
//! [`ConfigService`] owns a single JSON document of WireGuard servers and
//! their clients, allocates keys and client addresses, and persists every
//! change before reporting success.

pub mod alloc;
pub mod host;
pub mod interface;
pub mod keys;
pub mod render;
pub mod service;
pub mod settings;
pub mod store;

pub use interface::{InterfaceControl, InterfaceError, WgQuick};
pub use keys::{KeyError, KeyGenerator, KeyPair, X25519KeyGenerator};
pub use service::{ConfigService, ServiceError};
pub use settings::{Settings, SettingsError};
pub use store::StoreError;
pub use tunnelkeep_types as types;
