//! Cluster Configuration
//!
//! Loads the static cluster topology from a plain text file with one
//! `<id> <ip> <port>` triple per line. Blank lines and lines starting with
//! `#` are skipped. Membership is fixed for the lifetime of the cluster;
//! every node reads the same file and derives the same topology.

use anyhow::{Context, Result, bail};
use std::collections::BTreeMap;
use std::path::Path;

use super::types::{NodeId, NodeIdentity};

/// Address record for one cluster member.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub id: NodeId,
    pub ip: String,
    pub port: u16,
}

impl NodeInfo {
    /// `ip:port`, as dialed by the HTTP messenger.
    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

/// The full, fixed cluster topology.
#[derive(Debug, Clone, Default)]
pub struct ClusterConfig {
    pub nodes: BTreeMap<NodeId, NodeInfo>,
}

impl ClusterConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("could not open cluster config {}", path.display()))?;
        let config = Self::parse(&text)
            .with_context(|| format!("invalid cluster config {}", path.display()))?;
        tracing::info!(
            "Loaded {} node(s) from {}",
            config.nodes.len(),
            path.display()
        );
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut nodes = BTreeMap::new();

        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split_whitespace();
            let (Some(id), Some(ip), Some(port)) = (fields.next(), fields.next(), fields.next())
            else {
                bail!("line {}: expected '<id> <ip> <port>'", lineno + 1);
            };
            let id: u32 = id
                .parse()
                .with_context(|| format!("line {}: bad node id '{}'", lineno + 1, id))?;
            let port: u16 = port
                .parse()
                .with_context(|| format!("line {}: bad port '{}'", lineno + 1, port))?;

            let info = NodeInfo {
                id: NodeId(id),
                ip: ip.to_string(),
                port,
            };
            if nodes.insert(info.id, info).is_some() {
                bail!("line {}: duplicate node id {}", lineno + 1, id);
            }
        }

        if nodes.is_empty() {
            bail!("config lists no nodes");
        }

        // Placement maps hashes onto ids with modulo arithmetic, so ids must
        // cover 0..n without gaps.
        for (expected, id) in nodes.keys().enumerate() {
            if id.0 != expected as u32 {
                bail!(
                    "node ids must be contiguous from 0; missing id {}",
                    expected
                );
            }
        }

        Ok(Self { nodes })
    }

    pub fn total_nodes(&self) -> u32 {
        self.nodes.len() as u32
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeInfo> {
        self.nodes.get(&id)
    }

    /// Identity of the local node, failing if `my_id` is not in the file.
    pub fn identity_for(&self, my_id: NodeId) -> Result<NodeIdentity> {
        if !self.nodes.contains_key(&my_id) {
            bail!("my id ({}) is not in the config file", my_id);
        }
        Ok(NodeIdentity::new(my_id, self.total_nodes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_triples_and_skips_comments() {
        let config = ClusterConfig::parse(
            "# cluster of three\n\
             0 127.0.0.1 6000\n\
             \n\
             1 127.0.0.1 6001\n\
             2 10.0.0.7 6002\n",
        )
        .unwrap();

        assert_eq!(config.total_nodes(), 3);
        assert_eq!(config.get(NodeId(2)).unwrap().address(), "10.0.0.7:6002");
    }

    #[test]
    fn rejects_gaps_in_node_ids() {
        let err = ClusterConfig::parse("0 a 1\n2 b 2\n").unwrap_err();
        assert!(err.to_string().contains("contiguous"));
    }

    #[test]
    fn rejects_duplicates_and_garbage() {
        assert!(ClusterConfig::parse("0 a 1\n0 b 2\n").is_err());
        assert!(ClusterConfig::parse("zero a 1\n").is_err());
        assert!(ClusterConfig::parse("").is_err());
    }

    #[test]
    fn identity_requires_listed_id() {
        let config = ClusterConfig::parse("0 a 1\n1 b 2\n").unwrap();
        let identity = config.identity_for(NodeId(1)).unwrap();
        assert_eq!(identity.total_nodes, 2);
        assert!(config.identity_for(NodeId(9)).is_err());
    }
}
