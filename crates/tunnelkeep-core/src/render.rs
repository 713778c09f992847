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

//! wg-quick style configuration files for servers and their clients.

use std::fmt::Write as _;

use ipnetwork::Ipv4Network;
use tunnelkeep_types::{Client, Server};

const CLIENT_KEEPALIVE: u16 = 25;

/// The network a server address belongs to, e.g. `10.0.0.1/24` becomes
/// `10.0.0.0/24`. Addresses that don't parse are passed through untouched.
pub fn server_subnet(address: &str) -> String {
    match address.trim().parse::<Ipv4Network>() {
        Ok(net) => format!("{}/{}", net.network(), net.prefix()),
        Err(_) => address.to_string(),
    }
}

/// Interface config for the server side. Disabled clients are left out.
pub fn server_config(server: &Server) -> String {
    let mut config = String::new();
    writeln!(config, "# {}", server.tag).unwrap();
    writeln!(config, "[Interface]").unwrap();
    writeln!(config, "PrivateKey = {}", server.private_key).unwrap();
    writeln!(config, "Address = {}", server.address).unwrap();
    writeln!(config, "ListenPort = {}", server.listen_port).unwrap();
    writeln!(config, "MTU = {}", server.mtu).unwrap();

    for client in server.clients.iter().filter(|c| c.enabled) {
        writeln!(config).unwrap();
        writeln!(config, "[Peer]").unwrap();
        writeln!(config, "# {}", client.name).unwrap();
        writeln!(config, "PublicKey = {}", client.public_key).unwrap();
        writeln!(config, "PresharedKey = {}", client.preshared_key).unwrap();
        writeln!(config, "AllowedIPs = {}", client.allowed_ips).unwrap();
    }

    config
}

/// Config a client imports to reach `server` at `endpoint_host`.
pub fn client_config(server: &Server, client: &Client, endpoint_host: &str) -> String {
    let mut config = String::new();
    writeln!(config, "# {}", client.name).unwrap();
    writeln!(config, "[Interface]").unwrap();
    writeln!(config, "PrivateKey = {}", client.private_key).unwrap();
    writeln!(config, "Address = {}", client.allowed_ips).unwrap();
    if !client.dns.is_empty() {
        writeln!(config, "DNS = {}", client.dns).unwrap();
    }
    writeln!(config, "MTU = {}", server.mtu).unwrap();
    writeln!(config).unwrap();
    writeln!(config, "[Peer]").unwrap();
    writeln!(config, "PublicKey = {}", server.public_key).unwrap();
    writeln!(config, "PresharedKey = {}", client.preshared_key).unwrap();
    writeln!(config, "Endpoint = {endpoint_host}:{}", server.listen_port).unwrap();
    writeln!(config, "AllowedIPs = {}", server_subnet(&server.address)).unwrap();
    writeln!(config, "PersistentKeepalive = {CLIENT_KEEPALIVE}").unwrap();

    config
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use test_case::test_case;
    use tunnelkeep_types::{DEFAULT_DNS, DEFAULT_MTU};
    use uuid::Uuid;

    use super::*;

    fn make_client(name: &str, ip: &str, enabled: bool) -> Client {
        Client {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            private_key: format!("{name}-priv"),
            public_key: format!("{name}-pub"),
            preshared_key: format!("{name}-psk"),
            allowed_ips: ip.into(),
            dns: DEFAULT_DNS.into(),
            enabled,
            created_at: Utc::now(),
        }
    }

    fn make_server(clients: Vec<Client>) -> Server {
        Server {
            id: Uuid::new_v4(),
            tag: "wg0".into(),
            address: "10.0.0.1/24".into(),
            listen_port: 51820,
            mtu: DEFAULT_MTU,
            dns: DEFAULT_DNS.into(),
            private_key: "server-priv".into(),
            public_key: "server-pub".into(),
            enabled: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            clients,
        }
    }

    #[test_case("10.0.0.1/24", "10.0.0.0/24" ; "host address")]
    #[test_case("172.16.5.9/16", "172.16.0.0/16" ; "wider prefix")]
    #[test_case("10.0.0.1", "10.0.0.1/32" ; "bare address")]
    #[test_case("bogus", "bogus" ; "passthrough")]
    fn subnet(address: &str, expected: &str) {
        assert_eq!(server_subnet(address), expected);
    }

    #[test]
    fn server_config_lists_enabled_peers() {
        let server = make_server(vec![
            make_client("laptop", "10.0.0.2/32", true),
            make_client("old-phone", "10.0.0.3/32", false),
        ]);
        let config = server_config(&server);

        assert!(config.contains("PrivateKey = server-priv"));
        assert!(config.contains("Address = 10.0.0.1/24"));
        assert!(config.contains("ListenPort = 51820"));
        assert!(config.contains("MTU = 1420"));
        assert_eq!(config.matches("[Peer]").count(), 1);
        assert!(config.contains("PublicKey = laptop-pub"));
        assert!(config.contains("PresharedKey = laptop-psk"));
        assert!(config.contains("AllowedIPs = 10.0.0.2/32"));
        assert!(!config.contains("old-phone-pub"));
    }

    #[test]
    fn client_config_points_at_server() {
        let client = make_client("laptop", "10.0.0.2/32", true);
        let server = make_server(vec![client.clone()]);
        let config = client_config(&server, &client, "vpn.example.com");

        assert!(config.contains("PrivateKey = laptop-priv"));
        assert!(config.contains("Address = 10.0.0.2/32"));
        assert!(config.contains("DNS = 1.1.1.1,8.8.8.8"));
        assert!(config.contains("PublicKey = server-pub"));
        assert!(config.contains("PresharedKey = laptop-psk"));
        assert!(config.contains("Endpoint = vpn.example.com:51820"));
        assert!(config.contains("AllowedIPs = 10.0.0.0/24"));
        assert!(config.contains("PersistentKeepalive = 25"));
    }

    #[test]
    fn client_config_omits_empty_dns() {
        let mut client = make_client("laptop", "10.0.0.2/32", true);
        client.dns.clear();
        let server = make_server(vec![client.clone()]);
        assert!(!client_config(&server, &client, "vpn.example.com").contains("DNS ="));
    }
}
