use anyhow::{bail, Context, Result};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Bytes, H256};
use std::str::FromStr;

/// EIP-191 personal signature over the raw 32 hash bytes, hex with `0x`.
pub async fn sign_hash(private_key: &str, hash: H256) -> Result<String> {
    let wallet = LocalWallet::from_str(private_key.trim()).context("invalid private key")?;
    let sig = wallet
        .sign_message(hash.as_bytes())
        .await
        .context("failed to sign hash")?;
    Ok(format!("0x{}", hex::encode(sig.to_vec())))
}

/// Joins per-signer signatures in the given order: the bundler's aggregate
/// format is the plain concatenation with each `0x` prefix stripped.
pub fn combine_signatures(signatures: &[String]) -> String {
    let mut out = String::from("0x");
    for sig in signatures {
        out.push_str(sig.strip_prefix("0x").unwrap_or(sig));
    }
    out
}

/// Parses a (possibly combined) signature string into bytes. Combined
/// signatures are whole multiples of the 65-byte ECDSA signature.
pub fn parse_signature_hex(s: &str) -> Result<Bytes> {
    let trimmed = s.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(digits).context("invalid signature hex")?;
    if bytes.is_empty() {
        bail!("empty signature");
    }
    if bytes.len() % 65 != 0 {
        bail!(
            "signature length {} is not a multiple of 65 bytes",
            bytes.len()
        );
    }
    Ok(Bytes::from(bytes))
}
