use anyhow::{Context, Result};
use ethers::types::Address;
use std::str::FromStr;

/// Canonical ERC-4337 EntryPoint v0.6 deployment, shared across chains.
pub const ENTRY_POINT: &str = "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789";

/// Dev bundler. Production: https://api-bundler.voltacircuit.com
pub const DEFAULT_BUNDLER_BASE_URL: &str = "https://api-bundler.dev.voltacircuit.com";
pub const DEFAULT_CHAIN: &str = "arbitrum-mainnet";
pub const DEFAULT_CHAIN_ID: &str = "0xa4b1";

pub const EXPLORER_BASE_URL: &str = "https://jiffyscan.xyz/userOpHash";

/// Resolved run configuration for the submit flows.
///
/// `bundler_url` is the effective JSON-RPC endpoint (`<base>/<chain>`); the
/// Volta bundler doubles as the chain RPC, so every read goes through it too.
#[derive(Debug, Clone)]
pub struct VoltaConfig {
    pub chain: String,
    pub chain_id: u64,
    pub bundler_url: String,
    pub entrypoint: Address,
    /// Vault owner key. When absent, the flows prompt for a combined
    /// signature produced out-of-band with the `sign` subcommand.
    pub private_key: Option<String>,
}

impl VoltaConfig {
    pub fn resolve(
        bundler_base_url: &str,
        chain: &str,
        chain_id_hex: &str,
        entrypoint: &str,
        private_key: Option<String>,
    ) -> Result<Self> {
        let chain_id = parse_chain_id(chain_id_hex)?;
        let entrypoint =
            Address::from_str(entrypoint).context("invalid entry point address")?;

        let bundler_url = format!("{}/{}", bundler_base_url.trim_end_matches('/'), chain);

        let private_key = private_key.filter(|k| !k.trim().is_empty());

        Ok(Self {
            chain: chain.to_string(),
            chain_id,
            bundler_url,
            entrypoint,
            private_key,
        })
    }
}

pub fn parse_chain_id(s: &str) -> Result<u64> {
    let trimmed = s.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    u64::from_str_radix(digits, 16).with_context(|| format!("invalid hex chain id: {s}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_chain_id_arbitrum_default() {
        assert_eq!(parse_chain_id(DEFAULT_CHAIN_ID).unwrap(), 42161);
    }

    #[test]
    fn parse_chain_id_accepts_unprefixed_hex() {
        assert_eq!(parse_chain_id("a4b1").unwrap(), 42161);
    }

    #[test]
    fn parse_chain_id_rejects_garbage() {
        assert!(parse_chain_id("arbitrum").is_err());
        assert!(parse_chain_id("").is_err());
    }

    #[test]
    fn resolve_joins_bundler_url() {
        let cfg = VoltaConfig::resolve(
            DEFAULT_BUNDLER_BASE_URL,
            DEFAULT_CHAIN,
            DEFAULT_CHAIN_ID,
            ENTRY_POINT,
            None,
        )
        .unwrap();
        assert_eq!(
            cfg.bundler_url,
            "https://api-bundler.dev.voltacircuit.com/arbitrum-mainnet"
        );
    }

    #[test]
    fn resolve_strips_trailing_slash() {
        let cfg = VoltaConfig::resolve(
            "https://api-bundler.dev.voltacircuit.com/",
            "sepolia",
            "0xaa36a7",
            ENTRY_POINT,
            None,
        )
        .unwrap();
        assert_eq!(
            cfg.bundler_url,
            "https://api-bundler.dev.voltacircuit.com/sepolia"
        );
        assert_eq!(cfg.chain_id, 11155111);
    }

    #[test]
    fn resolve_treats_blank_private_key_as_unset() {
        let cfg = VoltaConfig::resolve(
            DEFAULT_BUNDLER_BASE_URL,
            DEFAULT_CHAIN,
            DEFAULT_CHAIN_ID,
            ENTRY_POINT,
            Some("  ".to_string()),
        )
        .unwrap();
        assert!(cfg.private_key.is_none());
    }

    #[test]
    fn resolve_rejects_bad_entrypoint() {
        let res = VoltaConfig::resolve(
            DEFAULT_BUNDLER_BASE_URL,
            DEFAULT_CHAIN,
            DEFAULT_CHAIN_ID,
            "not-an-address",
            None,
        );
        assert!(res.is_err());
    }
}
