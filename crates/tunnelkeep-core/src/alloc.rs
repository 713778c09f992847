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

use std::collections::HashSet;
use std::net::Ipv4Addr;

use tracing::{debug, warn};
use tunnelkeep_types::Client;

/// Handed out when the server address has no usable IPv4 host part.
pub const FALLBACK_ADDRESS: &str = "10.0.0.2/32";

const FIRST_HOST: u8 = 2;
const LAST_HOST: u8 = 254;

fn host_part(cidr: &str) -> Option<Ipv4Addr> {
    cidr.split('/').next()?.trim().parse().ok()
}

/// Pick the next free `/32` for a new client of the server at
/// `server_address`.
///
/// Host octets are taken from the `/24` the server address sits in. The
/// server's own octet and every client octet count as used, and the first
/// free octet in `2..=254` wins. Once the range is exhausted the result is
/// `<prefix>.<client count + 2>/32`, which can collide with an existing peer.
pub fn allocate_client_address(server_address: &str, clients: &[Client]) -> String {
    let Some(server_ip) = host_part(server_address) else {
        warn!(server_address, "server address is not IPv4, using fallback");
        return FALLBACK_ADDRESS.to_string();
    };
    let [a, b, c, server_host] = server_ip.octets();

    let mut used: HashSet<u8> = clients
        .iter()
        .filter_map(|client| host_part(&client.allowed_ips))
        .map(|ip| ip.octets()[3])
        .collect();
    used.insert(server_host);

    if let Some(host) = (FIRST_HOST..=LAST_HOST).find(|h| !used.contains(h)) {
        debug!(host, used = used.len(), "allocated client host octet");
        return format!("{a}.{b}.{c}.{host}/32");
    }

    let host = clients.len() + 2;
    warn!(host, "no free host octets left, falling back to client count");
    format!("{a}.{b}.{c}.{host}/32")
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use test_case::test_case;
    use uuid::Uuid;

    use super::*;

    fn client(ip: &str) -> Client {
        Client {
            id: Uuid::new_v4(),
            name: format!("peer-{ip}"),
            description: String::new(),
            private_key: "priv".into(),
            public_key: "pub".into(),
            preshared_key: "psk".into(),
            allowed_ips: ip.into(),
            dns: String::new(),
            enabled: true,
            created_at: Utc::now(),
        }
    }

    fn clients(ips: &[&str]) -> Vec<Client> {
        ips.iter().map(|ip| client(ip)).collect()
    }

    #[test_case("10.0.0.1/24", &[], "10.0.0.2/32" ; "first client")]
    #[test_case("10.0.0.1/24", &["10.0.0.2/32"], "10.0.0.3/32" ; "second client")]
    #[test_case("10.0.0.1/24", &["10.0.0.2/32", "10.0.0.4/32"], "10.0.0.3/32" ; "fills gap")]
    #[test_case("10.8.3.2/24", &[], "10.8.3.3/32" ; "server holds octet two")]
    #[test_case("192.168.7.1", &[], "192.168.7.2/32" ; "no prefix length")]
    #[test_case("10.0.0.1/24", &["garbage", "10.0.0.2/32"], "10.0.0.3/32" ; "ignores unparsable client")]
    #[test_case("fd00::1/64", &[], FALLBACK_ADDRESS ; "ipv6 server")]
    #[test_case("not-an-address", &[], FALLBACK_ADDRESS ; "unparsable server")]
    #[test_case("10.0.0/24", &[], FALLBACK_ADDRESS ; "three octets")]
    fn allocates(server: &str, existing: &[&str], expected: &str) {
        assert_eq!(allocate_client_address(server, &clients(existing)), expected);
    }

    #[test]
    fn never_returns_used_octet() {
        let mut existing = Vec::new();
        for _ in 0..50 {
            let ip = allocate_client_address("10.0.0.1/24", &existing);
            assert!(
                existing.iter().all(|c: &Client| c.allowed_ips != ip),
                "{ip} handed out twice"
            );
            assert_ne!(ip, "10.0.0.1/32");
            existing.push(client(&ip));
        }
        assert_eq!(existing.last().unwrap().allowed_ips, "10.0.0.51/32");
    }

    #[test]
    fn exhausted_range_uses_count_fallback() {
        let existing: Vec<Client> = (2..=254)
            .map(|host| client(&format!("10.0.0.{host}/32")))
            .collect();
        assert_eq!(existing.len(), 253);

        assert_eq!(
            allocate_client_address("10.0.0.1/24", &existing),
            "10.0.0.255/32"
        );
    }
}
