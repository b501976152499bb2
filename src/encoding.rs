use crate::types::UserOperation;
use anyhow::Result;
use ethers::abi::{AbiParser, Token};
use ethers::types::{Address, Bytes, H256, U256};
use ethers::utils::keccak256;

pub fn fmt_address(addr: Address) -> String {
    format!("0x{}", hex::encode(addr.as_bytes()))
}

pub fn fmt_h256(h: H256) -> String {
    format!("0x{}", hex::encode(h.as_bytes()))
}

/// JSON-RPC "quantity" decoding; empty and `0x` both mean zero.
pub fn parse_u256_quantity(s: &str) -> Result<U256> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.is_empty() {
        return Ok(U256::zero());
    }
    Ok(U256::from_str_radix(s, 16)?)
}

pub fn parse_h256(s: &str) -> Result<H256> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s)?;
    if bytes.len() != 32 {
        anyhow::bail!("expected 32-byte hex, got {} bytes", bytes.len());
    }
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    Ok(H256(arr))
}

/// ERC-4337 v0.6 userOpHash, computed locally instead of round-tripping
/// through `EntryPoint.getUserOpHash`:
///
///   keccak(abi.encode(keccak(abi.encode(op fields)), entryPoint, chainId))
///
/// The signature field never participates in the hash.
pub fn user_op_hash(op: &UserOperation, entry_point: Address, chain_id: u64) -> H256 {
    let packed = ethers::abi::encode(&[
        Token::Address(op.sender),
        Token::Uint(op.nonce),
        Token::FixedBytes(keccak256(&op.init_code).to_vec()),
        Token::FixedBytes(keccak256(&op.call_data).to_vec()),
        Token::Uint(op.call_gas_limit),
        Token::Uint(op.verification_gas_limit),
        Token::Uint(op.pre_verification_gas),
        Token::Uint(op.max_fee_per_gas),
        Token::Uint(op.max_priority_fee_per_gas),
        Token::FixedBytes(keccak256(&op.paymaster_and_data).to_vec()),
    ]);

    let enc = ethers::abi::encode(&[
        Token::FixedBytes(keccak256(packed).to_vec()),
        Token::Address(entry_point),
        Token::Uint(U256::from(chain_id)),
    ]);

    H256(keccak256(enc))
}

/// Calldata for the vault's `execute(address,uint256,bytes)`.
///
/// A plain ETH transfer uses empty inner data; a WETH-style wrap passes
/// `deposit()` calldata so the value lands wrapped.
pub fn execute_call_data(target: Address, value: U256, inner: Bytes) -> Result<Bytes> {
    let abi = AbiParser::default()
        .parse(&["function execute(address dest, uint256 value, bytes func)"])?;
    let data = abi.function("execute")?.encode_input(&[
        Token::Address(target),
        Token::Uint(value),
        Token::Bytes(inner.to_vec()),
    ])?;
    Ok(Bytes::from(data))
}

/// Calldata for a WETH-style `deposit()`.
pub fn deposit_call_data() -> Result<Bytes> {
    let abi = AbiParser::default().parse(&["function deposit()"])?;
    let data = abi.function("deposit")?.encode_input(&[])?;
    Ok(Bytes::from(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_op() -> UserOperation {
        UserOperation {
            sender: Address::from_str("0x1111111111111111111111111111111111111111").unwrap(),
            nonce: U256::from(3u64),
            init_code: Bytes::default(),
            call_data: Bytes::from(vec![0xde, 0xad]),
            call_gas_limit: U256::from(120_000u64),
            verification_gas_limit: U256::from(90_000u64),
            pre_verification_gas: U256::from(48_000u64),
            max_fee_per_gas: U256::from(1_000_000u64),
            max_priority_fee_per_gas: U256::from(1_000_000u64),
            paymaster_and_data: Bytes::default(),
            signature: Bytes::from(vec![0u8; 65]),
        }
    }

    fn entry_point() -> Address {
        Address::from_str(crate::config::ENTRY_POINT).unwrap()
    }

    #[test]
    fn execute_selector_matches_simple_account() {
        let data = execute_call_data(Address::zero(), U256::zero(), Bytes::default()).unwrap();
        assert_eq!(&data[..4], &[0xb6, 0x1d, 0x27, 0xf6]);
        // 3 head words + the empty bytes length word
        assert_eq!(data.len(), 4 + 32 * 4);
    }

    #[test]
    fn deposit_selector_matches_weth() {
        let data = deposit_call_data().unwrap();
        assert_eq!(data.as_ref(), &[0xd0, 0xe3, 0x0d, 0xb0]);
    }

    #[test]
    fn parse_u256_quantity_handles_zero_forms() {
        assert_eq!(parse_u256_quantity("0x0").unwrap(), U256::zero());
        assert_eq!(parse_u256_quantity("0x").unwrap(), U256::zero());
        assert_eq!(parse_u256_quantity("").unwrap(), U256::zero());
        assert_eq!(parse_u256_quantity("0x186a0").unwrap(), U256::from(100_000u64));
        assert_eq!(parse_u256_quantity("a4b1").unwrap(), U256::from(42161u64));
    }

    #[test]
    fn parse_h256_rejects_wrong_length() {
        assert!(parse_h256("0x1234").is_err());
        assert!(parse_h256("zz").is_err());
        let h = "0x2222222222222222222222222222222222222222222222222222222222222222";
        assert_eq!(fmt_h256(parse_h256(h).unwrap()), h);
    }

    #[test]
    fn hash_ignores_signature() {
        let op = sample_op();
        let mut signed = op.clone();
        signed.signature = Bytes::from(vec![0xab; 130]);

        assert_eq!(
            user_op_hash(&op, entry_point(), 42161),
            user_op_hash(&signed, entry_point(), 42161)
        );
    }

    #[test]
    fn hash_binds_chain_id_and_entry_point() {
        let op = sample_op();
        let base = user_op_hash(&op, entry_point(), 42161);
        assert_ne!(base, user_op_hash(&op, entry_point(), 1));
        assert_ne!(base, user_op_hash(&op, Address::zero(), 42161));
    }

    #[test]
    fn hash_binds_operation_fields() {
        let op = sample_op();
        let base = user_op_hash(&op, entry_point(), 42161);

        let mut bumped = op.clone();
        bumped.nonce = op.nonce + U256::one();
        assert_ne!(base, user_op_hash(&bumped, entry_point(), 42161));

        let mut padded = op.clone();
        padded.pre_verification_gas = op.pre_verification_gas + U256::one();
        assert_ne!(base, user_op_hash(&padded, entry_point(), 42161));
    }
}
