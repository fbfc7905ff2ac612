//! p2praft CLI entry point.

use std::path::{Path, PathBuf};

use clap::Parser;
use eyre::{Result, WrapErr};
use libp2p::{PeerId, identity::Keypair};
use serde::Deserialize;

use crate::args::{LogArgs, NetworkArgs};

/// Raft transport demo node over libp2p streams.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    /// TOML config file with `[log]` and `[network]` sections.
    ///
    /// Sections present in the file replace the corresponding flags.
    #[arg(long, value_name = "FILE", env = "P2PRAFT_CONFIG")]
    pub(crate) config: Option<PathBuf>,

    /// Derive the node identity from this seed instead of a random key.
    #[arg(long, value_name = "SEED")]
    pub(crate) seed: Option<u8>,

    /// Dial this peer once connected, send a line and wait for the echo.
    #[arg(long, value_name = "PEER_ID")]
    pub(crate) ping: Option<PeerId>,

    #[command(flatten)]
    pub(crate) logs: LogArgs,

    #[command(flatten)]
    pub(crate) network: NetworkArgs,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    log: Option<LogArgs>,
    network: Option<NetworkArgs>,
}

impl Cli {
    /// Merge the config file, if any, into the parsed flags.
    pub(crate) fn load(mut self) -> Result<Self> {
        let Some(path) = self.config.clone() else {
            return Ok(self);
        };

        let file = read_config(&path)?;
        if let Some(log) = file.log {
            self.logs = LogArgs {
                verbosity: self.logs.verbosity,
                ..log
            };
        }
        if let Some(network) = file.network {
            self.network = network;
        }
        Ok(self)
    }

    pub(crate) fn keypair(&self) -> Result<Keypair> {
        match self.seed {
            Some(seed) => Keypair::ed25519_from_bytes([seed; 32]).wrap_err("invalid identity seed"),
            None => Ok(Keypair::generate_ed25519()),
        }
    }
}

fn read_config(path: &Path) -> Result<FileConfig> {
    let raw = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read config file: {}", path.display()))?;
    toml::from_str(&raw).wrap_err_with(|| format!("invalid config file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_sections_are_optional() {
        let file: FileConfig = toml::from_str("[log]\nquiet = true\n").unwrap();
        assert!(file.log.is_some_and(|log| log.quiet));
        assert!(file.network.is_none());
    }

    #[test]
    fn test_seed_is_deterministic() {
        let cli = Cli::parse_from(["p2praft", "--seed", "7"]);
        let a = cli.keypair().unwrap().public().to_peer_id();
        let b = cli.keypair().unwrap().public().to_peer_id();
        assert_eq!(a, b);
    }
}
