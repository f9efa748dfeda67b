// CLI module for offline-vault
// Author: kelexine (https://github.com/kelexine)

use clap::Parser;
use std::path::PathBuf;

/// offline-vault - Offline-first caching proxy with bucketed storage
#[derive(Parser, Debug)]
#[command(name = "offline-vault", version, about, long_about = None)]
pub struct Args {
    /// Path to a TOML config file (default: ~/.offline-vault/config.toml)
    #[arg(long, short = 'c', env = "OFFLINE_VAULT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip the install-time precache pass
    #[arg(long)]
    pub skip_precache: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let args = Args::parse_from(["offline-vault", "--config", "/tmp/v.toml", "--skip-precache"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/v.toml")));
        assert!(args.skip_precache);
        assert!(!args.print_config);
    }
}
