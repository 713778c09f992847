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

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;
use x25519_dalek::{PublicKey, StaticSecret};

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("entropy source unavailable: {0}")]
    Entropy(String),
}

/// Base64 encoded WireGuard key pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub private_key: String,
    pub public_key: String,
}

pub trait KeyGenerator: Send + Sync {
    fn generate_key_pair(&self) -> Result<KeyPair, KeyError>;
    fn generate_preshared_key(&self) -> Result<String, KeyError>;
}

/// Curve25519 keys drawn from the OS entropy source.
#[derive(Debug, Clone, Copy, Default)]
pub struct X25519KeyGenerator;

impl KeyGenerator for X25519KeyGenerator {
    fn generate_key_pair(&self) -> Result<KeyPair, KeyError> {
        let secret = StaticSecret::from(random_bytes()?);
        let public = PublicKey::from(&secret);

        Ok(KeyPair {
            private_key: BASE64.encode(secret.to_bytes()),
            public_key: BASE64.encode(public.as_bytes()),
        })
    }

    fn generate_preshared_key(&self) -> Result<String, KeyError> {
        Ok(BASE64.encode(random_bytes()?))
    }
}

fn random_bytes() -> Result<[u8; 32], KeyError> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| KeyError::Entropy(e.to_string()))?;
    Ok(bytes)
}
