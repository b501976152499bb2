use crate::bundler::BundlerClient;
use crate::types::UserOperation;
use anyhow::{Context, Result};
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Address, Bytes, U256};

/// Gas middleware steps, applied in the order they were attached.
///
/// The submit flows use the fixed chain price -> estimate -> pad; order
/// matters because padding works on the estimator's output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GasMiddleware {
    /// Fetch the current gas price and set both fee fields from it.
    GasPrice,
    /// `eth_estimateUserOperationGas` on the bundler fills the three limits.
    EstimateGas,
    /// The 20% padding rule; see [`pad_gas`].
    PadGas,
}

/// Accumulates UserOperation fields by successive assignment, then runs the
/// attached middleware chain to fill the gas fields.
///
/// The op starts with empty `initCode` (vaults are initialized through the
/// Volta dashboard, never deployed from here) and a 65-byte dummy signature
/// so gas estimation sees a correctly-sized operation.
pub struct UserOperationBuilder {
    op: UserOperation,
    middleware: Vec<GasMiddleware>,
}

impl UserOperationBuilder {
    pub fn new(sender: Address) -> Self {
        Self {
            op: UserOperation {
                sender,
                nonce: U256::zero(),
                init_code: Bytes::default(),
                call_data: Bytes::default(),
                call_gas_limit: U256::zero(),
                verification_gas_limit: U256::zero(),
                pre_verification_gas: U256::zero(),
                max_fee_per_gas: U256::zero(),
                max_priority_fee_per_gas: U256::zero(),
                paymaster_and_data: Bytes::default(),
                signature: Bytes::from(vec![0u8; 65]),
            },
            middleware: Vec::new(),
        }
    }

    pub fn nonce(mut self, nonce: U256) -> Self {
        self.op.nonce = nonce;
        self
    }

    pub fn init_code(mut self, init_code: Bytes) -> Self {
        self.op.init_code = init_code;
        self
    }

    pub fn call_data(mut self, call_data: Bytes) -> Self {
        self.op.call_data = call_data;
        self
    }

    pub fn use_middleware(mut self, mw: GasMiddleware) -> Self {
        self.middleware.push(mw);
        self
    }

    /// Runs the middleware chain and yields the finished (unsigned) op.
    pub async fn build(
        mut self,
        provider: &Provider<Http>,
        bundler: &BundlerClient,
        entrypoint: Address,
    ) -> Result<UserOperation> {
        for mw in &self.middleware {
            match mw {
                GasMiddleware::GasPrice => {
                    let gas_price = provider
                        .get_gas_price()
                        .await
                        .context("failed to fetch gas price")?;
                    self.op.max_fee_per_gas = gas_price;
                    self.op.max_priority_fee_per_gas = gas_price;
                }
                GasMiddleware::EstimateGas => {
                    let est = bundler
                        .estimate_user_operation_gas(serde_json::to_value(&self.op)?, entrypoint)
                        .await
                        .context("bundler gas estimate failed")?;
                    self.op.call_gas_limit = est.call_gas_limit;
                    self.op.verification_gas_limit = est.verification_gas_limit;
                    self.op.pre_verification_gas = est.pre_verification_gas;
                }
                GasMiddleware::PadGas => pad_gas(&mut self.op),
            }
        }

        Ok(self.op)
    }
}

/// Adds one fifth to verificationGasLimit and preVerificationGas to absorb
/// preVerificationGas jumps between estimation and inclusion, then keeps
/// callGasLimit at least as large as verificationGasLimit.
pub fn pad_gas(op: &mut UserOperation) {
    let five = U256::from(5u64);
    let vgl = op.verification_gas_limit;
    let pvg = op.pre_verification_gas;
    op.verification_gas_limit = vgl + vgl / five;
    op.pre_verification_gas = pvg + pvg / five;
    if op.call_gas_limit < op.verification_gas_limit {
        op.call_gas_limit = op.verification_gas_limit;
    }
}
