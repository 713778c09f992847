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

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use tunnelkeep_types::ConfigDocument;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read config: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to write config: {0}")]
    Write(#[source] std::io::Error),
}

/// Read the document at `path`. A missing file is a first run and yields an
/// empty document.
pub async fn load(path: &Path) -> Result<ConfigDocument, StoreError> {
    debug!(path = %path.display(), "loading config");

    match tokio::fs::read_to_string(path).await {
        Ok(contents) => {
            let document: ConfigDocument =
                serde_json::from_str(&contents).map_err(StoreError::Parse)?;
            info!(
                path = %path.display(),
                server_count = document.servers.len(),
                "loaded config"
            );
            Ok(document)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "config file not found, starting with empty config");
            Ok(ConfigDocument::default())
        }
        Err(e) => Err(StoreError::Read(e)),
    }
}

/// Replace the document at `path`. The new contents land in a sibling
/// temp file, are synced to disk, and only then renamed over the old file.
pub async fn save(path: &Path, document: &ConfigDocument) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(StoreError::Write)?;
    }

    let contents = serde_json::to_string_pretty(document).map_err(StoreError::Serialize)?;
    let staging = staging_path(path);
    write_synced(&staging, contents.as_bytes())
        .await
        .map_err(StoreError::Write)?;
    tokio::fs::rename(&staging, path)
        .await
        .map_err(StoreError::Write)?;

    info!(
        path = %path.display(),
        server_count = document.servers.len(),
        "saved config"
    );
    Ok(())
}

async fn write_synced(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    debug!(path = %path.display(), bytes = contents.len(), "synced staging file");
    Ok(())
}

pub(crate) fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tunnelkeep_types::{DEFAULT_DNS, DEFAULT_MTU, Server};
    use uuid::Uuid;

    use super::*;

    fn sample_document() -> ConfigDocument {
        ConfigDocument {
            servers: vec![Server {
                id: Uuid::new_v4(),
                tag: "wg0".into(),
                address: "10.0.0.1/24".into(),
                listen_port: 51820,
                mtu: DEFAULT_MTU,
                dns: DEFAULT_DNS.into(),
                private_key: "priv".into(),
                public_key: "pub".into(),
                enabled: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
                clients: vec![],
            }],
        }
    }

    #[tokio::test]
    async fn missing_file_is_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let doc = load(&dir.path().join("wireguard.json")).await.unwrap();
        assert!(doc.servers.is_empty());
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("wireguard.json");
        let doc = sample_document();

        save(&path, &doc).await.unwrap();
        assert!(!staging_path(&path).exists(), "staging file should be renamed away");

        let reloaded = load(&path).await.unwrap();
        assert_eq!(doc, reloaded);
    }

    #[tokio::test]
    async fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wireguard.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let err = load(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Parse(_)));
    }

    #[tokio::test]
    async fn unwritable_staging_is_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wireguard.json");
        tokio::fs::create_dir(staging_path(&path)).await.unwrap();

        let err = save(&path, &sample_document()).await.unwrap_err();
        assert!(matches!(err, StoreError::Write(_)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn save_replaces_existing_document_in_full() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wireguard.json");
        let long = sample_document();
        save(&path, &long).await.unwrap();

        let short = ConfigDocument::default();
        save(&path, &short).await.unwrap();

        let on_disk = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(on_disk, serde_json::to_string_pretty(&short).unwrap());
        assert_eq!(load(&path).await.unwrap(), short);
    }

    #[tokio::test]
    async fn write_synced_writes_all_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staged");
        let contents = vec![b'x'; 64 * 1024];

        write_synced(&path, &contents).await.unwrap();

        assert_eq!(tokio::fs::read(&path).await.unwrap(), contents);
    }

    #[test]
    fn staging_path_appends_suffix() {
        assert_eq!(
            staging_path(Path::new("/var/lib/tunnelkeep/wireguard.json")),
            PathBuf::from("/var/lib/tunnelkeep/wireguard.json.tmp")
        );
    }
}
