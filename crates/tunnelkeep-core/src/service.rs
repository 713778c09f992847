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

use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use tunnelkeep_types::{
    Client, ClientDraft, ConfigDocument, DEFAULT_DNS, DEFAULT_MTU, Server, ServerDraft,
};
use uuid::Uuid;

use crate::alloc;
use crate::interface::{InterfaceControl, InterfaceError, WgQuick};
use crate::keys::{KeyError, KeyGenerator, X25519KeyGenerator};
use crate::render;
use crate::settings::Settings;
use crate::store::{self, StoreError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("server {0} not found")]
    ServerNotFound(Uuid),

    #[error("client {client} not found on server {server}")]
    ClientNotFound { server: Uuid, client: Uuid },

    #[error("key generation failed: {0}")]
    Generation(#[from] KeyError),

    #[error("failed to persist configuration: {0}")]
    Persistence(#[source] StoreError),

    #[error("failed to load configuration: {0}")]
    Load(#[source] StoreError),

    #[error(transparent)]
    Interface(#[from] InterfaceError),
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ServerNotFound(_) | Self::ClientNotFound { .. })
    }
}

type Result<T> = std::result::Result<T, ServiceError>;

fn server_index(doc: &ConfigDocument, id: Uuid) -> Result<usize> {
    doc.servers
        .iter()
        .position(|s| s.id == id)
        .ok_or(ServiceError::ServerNotFound(id))
}

fn client_index(server: &Server, id: Uuid) -> Result<usize> {
    server
        .clients
        .iter()
        .position(|c| c.id == id)
        .ok_or(ServiceError::ClientNotFound {
            server: server.id,
            client: id,
        })
}

fn unused_id(taken: impl Fn(Uuid) -> bool) -> Uuid {
    loop {
        let id = Uuid::new_v4();
        if !taken(id) {
            return id;
        }
    }
}

// ---------------------------------------------------------------------------
// ConfigService
// ---------------------------------------------------------------------------

/// Owns the configuration document and every mutation of it.
///
/// One `RwLock` guards the whole document. Reads share it; every mutation
/// holds the write guard until the new document is on disk. Mutations are
/// staged on a copy which only replaces the live document once the save
/// succeeded, so a failed save leaves memory matching disk.
#[derive(Debug)]
pub struct ConfigService<K = X25519KeyGenerator, I = WgQuick> {
    path: PathBuf,
    document: RwLock<ConfigDocument>,
    keys: K,
    interfaces: I,
}

impl ConfigService {
    /// Open the document named by `settings` with the stock key generator and
    /// `wg-quick` interface control.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        Self::open(
            settings.document_path(),
            X25519KeyGenerator,
            WgQuick::new(&settings.interface_dir),
        )
        .await
    }
}

impl<K: KeyGenerator, I: InterfaceControl> ConfigService<K, I> {
    #[tracing::instrument(skip_all)]
    pub async fn open(path: impl Into<PathBuf>, keys: K, interfaces: I) -> Result<Self> {
        let path = path.into();
        let document = store::load(&path).await.map_err(ServiceError::Load)?;
        info!(
            path = %path.display(),
            server_count = document.servers.len(),
            "configuration service ready"
        );

        Ok(Self {
            path,
            document: RwLock::new(document),
            keys,
            interfaces,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn commit(&self, live: &mut ConfigDocument, next: ConfigDocument) -> Result<()> {
        store::save(&self.path, &next)
            .await
            .map_err(ServiceError::Persistence)?;
        *live = next;
        Ok(())
    }

    // -- Reads ---------------------------------------------------------------

    pub async fn list_servers(&self) -> Vec<Server> {
        self.document.read().await.servers.clone()
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_server(&self, id: Uuid) -> Result<Server> {
        let doc = self.document.read().await;
        let idx = server_index(&doc, id)?;
        Ok(doc.servers[idx].clone())
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_clients(&self, server_id: Uuid) -> Result<Vec<Client>> {
        let doc = self.document.read().await;
        let idx = server_index(&doc, server_id)?;
        Ok(doc.servers[idx].clients.clone())
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_client(&self, server_id: Uuid, client_id: Uuid) -> Result<Client> {
        let doc = self.document.read().await;
        let server = &doc.servers[server_index(&doc, server_id)?];
        let idx = client_index(server, client_id)?;
        Ok(server.clients[idx].clone())
    }

    /// wg-quick config a client imports to reach its server at
    /// `endpoint_host`.
    #[tracing::instrument(skip(self))]
    pub async fn client_config(
        &self,
        server_id: Uuid,
        client_id: Uuid,
        endpoint_host: &str,
    ) -> Result<String> {
        let doc = self.document.read().await;
        let server = &doc.servers[server_index(&doc, server_id)?];
        let client = &server.clients[client_index(server, client_id)?];
        Ok(render::client_config(server, client, endpoint_host))
    }

    // -- Servers -------------------------------------------------------------

    #[tracing::instrument(skip(self, draft), fields(tag = %draft.tag, address = %draft.address))]
    pub async fn create_server(&self, draft: ServerDraft) -> Result<Server> {
        let mut doc = self.document.write().await;

        let pair = self.keys.generate_key_pair()?;
        let now = Utc::now();
        let server = Server {
            id: unused_id(|id| doc.server(id).is_some()),
            tag: draft.tag,
            address: draft.address,
            listen_port: draft.listen_port,
            mtu: draft.mtu.filter(|&mtu| mtu != 0).unwrap_or(DEFAULT_MTU),
            dns: draft
                .dns
                .filter(|dns| !dns.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DNS.to_string()),
            private_key: pair.private_key,
            public_key: pair.public_key,
            enabled: draft.enabled,
            created_at: now,
            updated_at: now,
            clients: vec![],
        };

        let mut next = doc.clone();
        next.servers.push(server.clone());
        self.commit(&mut doc, next).await?;

        info!(server_id = %server.id, tag = %server.tag, "created server");
        Ok(server)
    }

    /// Overwrite a server's mutable fields. Keys, `created_at` and the client
    /// list always come from the stored server, whatever `server` carries.
    #[tracing::instrument(skip(self, server), fields(server_id = %server.id))]
    pub async fn update_server(&self, server: Server) -> Result<Server> {
        let mut doc = self.document.write().await;
        let idx = server_index(&doc, server.id)?;

        let mut next = doc.clone();
        let existing = &mut next.servers[idx];
        let updated = Server {
            private_key: existing.private_key.clone(),
            public_key: existing.public_key.clone(),
            created_at: existing.created_at,
            clients: std::mem::take(&mut existing.clients),
            updated_at: Utc::now(),
            ..server
        };
        *existing = updated.clone();
        self.commit(&mut doc, next).await?;

        info!(tag = %updated.tag, "updated server");
        Ok(updated)
    }

    /// Remove a server and all of its clients. An enabled server's interface
    /// is stopped first; a failed stop is logged and does not block removal.
    #[tracing::instrument(skip(self))]
    pub async fn delete_server(&self, id: Uuid) -> Result<()> {
        let mut doc = self.document.write().await;
        let idx = server_index(&doc, id)?;

        let server = &doc.servers[idx];
        if server.enabled {
            debug!(interface = %server.tag, "stopping interface of enabled server");
            if let Err(e) = self.interfaces.stop_interface(&server.tag).await {
                warn!(interface = %server.tag, error = %e, "failed to stop interface, deleting anyway");
            }
        }

        let mut next = doc.clone();
        let removed = next.servers.remove(idx);
        self.commit(&mut doc, next).await?;

        info!(
            tag = %removed.tag,
            client_count = removed.clients.len(),
            "deleted server"
        );
        Ok(())
    }

    /// Bring a server's interface up or down and record the new state. A
    /// failed start/stop leaves the document untouched.
    #[tracing::instrument(skip(self))]
    pub async fn set_server_enabled(&self, id: Uuid, enabled: bool) -> Result<Server> {
        let mut doc = self.document.write().await;
        let idx = server_index(&doc, id)?;

        let current = &doc.servers[idx];
        if current.enabled == enabled {
            debug!(interface = %current.tag, enabled, "server already in requested state");
            return Ok(current.clone());
        }

        if enabled {
            self.interfaces.start_interface(current).await?;
        } else {
            self.interfaces.stop_interface(&current.tag).await?;
        }

        let mut next = doc.clone();
        let server = &mut next.servers[idx];
        server.enabled = enabled;
        server.updated_at = Utc::now();
        let updated = server.clone();
        self.commit(&mut doc, next).await?;

        info!(interface = %updated.tag, enabled, "changed server state");
        Ok(updated)
    }

    // -- Clients -------------------------------------------------------------

    /// Attach a new client to a server. Without an explicit address the next
    /// free host in the server's /24 is allocated; without DNS the server's
    /// DNS is inherited.
    #[tracing::instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn add_client(&self, server_id: Uuid, draft: ClientDraft) -> Result<Client> {
        let mut doc = self.document.write().await;
        let idx = server_index(&doc, server_id)?;

        let pair = self.keys.generate_key_pair()?;
        let preshared_key = self.keys.generate_preshared_key()?;

        let server = &doc.servers[idx];
        let allowed_ips = match draft.allowed_ips.filter(|ip| !ip.trim().is_empty()) {
            Some(ip) => ip,
            None => alloc::allocate_client_address(&server.address, &server.clients),
        };
        let dns = draft
            .dns
            .filter(|dns| !dns.trim().is_empty())
            .unwrap_or_else(|| server.dns.clone());

        let client = Client {
            id: unused_id(|id| server.client(id).is_some()),
            name: draft.name,
            description: draft.description,
            private_key: pair.private_key,
            public_key: pair.public_key,
            preshared_key,
            allowed_ips,
            dns,
            enabled: true,
            created_at: Utc::now(),
        };

        let mut next = doc.clone();
        next.servers[idx].clients.push(client.clone());
        self.commit(&mut doc, next).await?;

        info!(client_id = %client.id, allowed_ips = %client.allowed_ips, "added client");
        Ok(client)
    }

    /// An empty `name` keeps the current name; `description` and `enabled`
    /// are always applied.
    #[tracing::instrument(skip(self))]
    pub async fn update_client(
        &self,
        server_id: Uuid,
        client_id: Uuid,
        name: &str,
        description: &str,
        enabled: bool,
    ) -> Result<Client> {
        let mut doc = self.document.write().await;
        let idx = server_index(&doc, server_id)?;
        let client_idx = client_index(&doc.servers[idx], client_id)?;

        let mut next = doc.clone();
        let client = &mut next.servers[idx].clients[client_idx];
        if !name.is_empty() {
            client.name = name.to_string();
        }
        client.description = description.to_string();
        client.enabled = enabled;
        let updated = client.clone();
        self.commit(&mut doc, next).await?;

        info!(name = %updated.name, enabled, "updated client");
        Ok(updated)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_client(&self, server_id: Uuid, client_id: Uuid) -> Result<()> {
        let mut doc = self.document.write().await;
        let idx = server_index(&doc, server_id)?;
        let client_idx = client_index(&doc.servers[idx], client_id)?;

        let mut next = doc.clone();
        let removed = next.servers[idx].clients.remove(client_idx);
        self.commit(&mut doc, next).await?;

        info!(name = %removed.name, allowed_ips = %removed.allowed_ips, "deleted client");
        Ok(())
    }
}
