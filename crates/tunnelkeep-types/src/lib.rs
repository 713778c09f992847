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

//! tunnelkeep-types: the persisted data model for tunnelkeep.
//!
//! This crate contains the configuration document, the server and client
//! entities it owns, and the draft types callers hand to the configuration
//! service when creating entities.

#![warn(missing_docs)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// MTU applied to a new server when the draft leaves it unset.
pub const DEFAULT_MTU: u32 = 1420;

/// DNS list applied to a new server when the draft leaves it unset.
pub const DEFAULT_DNS: &str = "1.1.1.1,8.8.8.8";

/// The root persisted aggregate: every server, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDocument {
    /// All servers, in insertion order.
    #[serde(default)]
    pub servers: Vec<Server>,
}

impl ConfigDocument {
    /// Look up a server by id.
    pub fn server(&self, id: Uuid) -> Option<&Server> {
        self.servers.iter().find(|s| s.id == id)
    }
}

/// A WireGuard tunnel endpoint definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    /// Unique identifier.
    pub id: Uuid,
    /// Interface name / network tag (e.g. `wg0`).
    pub tag: String,
    /// Tunnel address in CIDR form (e.g. `10.0.0.1/24`).
    pub address: String,
    /// UDP listen port.
    pub listen_port: u16,
    /// Interface MTU.
    pub mtu: u32,
    /// Comma separated DNS servers handed to clients.
    pub dns: String,
    /// Base64 WireGuard private key. Immutable after creation.
    pub private_key: String,
    /// Base64 WireGuard public key. Immutable after creation.
    pub public_key: String,
    /// Whether the tunnel is meant to be up.
    pub enabled: bool,
    /// When this server was created. Immutable after creation.
    pub created_at: DateTime<Utc>,
    /// Last time this server definition changed.
    pub updated_at: DateTime<Utc>,
    /// Peers attached to this server, in insertion order.
    #[serde(default)]
    pub clients: Vec<Client>,
}

impl Server {
    /// Look up a client by id.
    pub fn client(&self, id: Uuid) -> Option<&Client> {
        self.clients.iter().find(|c| c.id == id)
    }
}

/// A WireGuard peer attached to exactly one server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Unique identifier.
    pub id: Uuid,
    /// Human-readable name (e.g. "laptop").
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Base64 WireGuard private key.
    pub private_key: String,
    /// Base64 WireGuard public key.
    pub public_key: String,
    /// Base64 preshared key shared with the server.
    pub preshared_key: String,
    /// Assigned address inside the server subnet (e.g. `10.0.0.2/32`).
    pub allowed_ips: String,
    /// DNS servers for this client.
    pub dns: String,
    /// Whether this peer is allowed to connect.
    pub enabled: bool,
    /// When this client was created.
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied fields for a new server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDraft {
    /// Interface name / network tag.
    pub tag: String,
    /// Tunnel address in CIDR form.
    pub address: String,
    /// UDP listen port.
    pub listen_port: u16,
    /// Interface MTU, [`DEFAULT_MTU`] when unset.
    #[serde(default)]
    pub mtu: Option<u32>,
    /// DNS servers, [`DEFAULT_DNS`] when unset.
    #[serde(default)]
    pub dns: Option<String>,
    /// Whether the tunnel is meant to be up.
    #[serde(default)]
    pub enabled: bool,
}

/// Caller-supplied fields for a new client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDraft {
    /// Human-readable name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Explicit address; allocated from the server subnet when unset.
    #[serde(default)]
    pub allowed_ips: Option<String>,
    /// DNS override; inherited from the server when unset.
    #[serde(default)]
    pub dns: Option<String>,
}
