use ethers::types::{Address, Bytes, U256};
use serde::Serialize;

/// ERC-4337 UserOperation (EntryPoint v0.6 layout).
///
/// Serializes straight to the camelCase wire form expected by
/// `eth_sendUserOperation` / `eth_estimateUserOperationGas`: hex quantities
/// for the uint fields, `0x`-prefixed hex strings for the byte fields.
///
/// Volta vaults never use a paymaster, so `paymaster_and_data` stays empty.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    pub sender: Address,
    pub nonce: U256,
    pub init_code: Bytes,
    pub call_data: Bytes,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub paymaster_and_data: Bytes,
    pub signature: Bytes,
}
