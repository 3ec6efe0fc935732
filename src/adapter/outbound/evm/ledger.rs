//! JSON-RPC implementation of the token ledger.

use alloy_primitives::{Address, TxHash, U256};
use alloy_provider::network::EthereumWallet;
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use tracing::{debug, info};

use super::contracts::{IDepositManager, IMeteredToken, IQueryTool};
use crate::domain::transaction::ReceiptStatus;
use crate::port::{ContractSet, LedgerError, LedgerResult, TokenLedger};

/// Token ledger backed by an EVM node.
///
/// Reads go through the same provider as writes. Without a signer the
/// ledger is read-only and every write fails with [`LedgerError::NoSigner`].
pub struct EvmLedger {
    provider: DynProvider,
    signer: Option<Address>,
    contracts: ContractSet,
}

impl EvmLedger {
    /// Connect to `rpc_url`, signing writes with `signer` when present.
    pub fn new(rpc_url: url::Url, signer: Option<PrivateKeySigner>, contracts: ContractSet) -> Self {
        let address = signer.as_ref().map(PrivateKeySigner::address);
        let provider = match signer {
            Some(signer) => ProviderBuilder::new()
                .wallet(EthereumWallet::from(signer))
                .connect_http(rpc_url)
                .erased(),
            None => ProviderBuilder::new().connect_http(rpc_url).erased(),
        };
        Self {
            provider,
            signer: address,
            contracts,
        }
    }

    fn require_signer(&self) -> LedgerResult<Address> {
        self.signer.ok_or(LedgerError::NoSigner)
    }
}

/// Map any alloy error through the message classifier.
fn classify(err: impl std::fmt::Display) -> LedgerError {
    LedgerError::from_message(err.to_string())
}

#[async_trait]
impl TokenLedger for EvmLedger {
    fn signer(&self) -> Option<Address> {
        self.signer
    }

    fn contracts(&self) -> ContractSet {
        self.contracts
    }

    async fn decimals(&self) -> LedgerResult<u8> {
        let token = IMeteredToken::new(self.contracts.token, &self.provider);
        token.decimals().call().await.map_err(classify)
    }

    async fn balance_of(&self, owner: Address) -> LedgerResult<U256> {
        let token = IMeteredToken::new(self.contracts.token, &self.provider);
        token.balanceOf(owner).call().await.map_err(classify)
    }

    async fn allowance(&self, owner: Address, spender: Address) -> LedgerResult<U256> {
        let token = IMeteredToken::new(self.contracts.token, &self.provider);
        token.allowance(owner, spender).call().await.map_err(classify)
    }

    async fn price(&self) -> LedgerResult<U256> {
        let manager = IDepositManager::new(self.contracts.deposit_manager, &self.provider);
        manager.getPrice().call().await.map_err(classify)
    }

    async fn approve(&self, spender: Address, amount: U256) -> LedgerResult<TxHash> {
        let owner = self.require_signer()?;
        let token = IMeteredToken::new(self.contracts.token, &self.provider);
        let pending = token
            .approve(spender, amount)
            .from(owner)
            .send()
            .await
            .map_err(classify)?;
        let tx = *pending.tx_hash();
        info!(tx = %tx, spender = %spender, amount = %amount, "Approval broadcast");
        Ok(tx)
    }

    async fn submit_query(&self, cost: U256, gas_limit: u64) -> LedgerResult<TxHash> {
        let owner = self.require_signer()?;
        let tool = IQueryTool::new(self.contracts.query_tool, &self.provider);
        let pending = tool
            .queryAI(cost)
            .from(owner)
            .gas(gas_limit)
            .send()
            .await
            .map_err(classify)?;
        let tx = *pending.tx_hash();
        info!(tx = %tx, cost = %cost, gas_limit, "Query broadcast");
        Ok(tx)
    }

    async fn deposit(&self, value: U256) -> LedgerResult<TxHash> {
        let owner = self.require_signer()?;
        let manager = IDepositManager::new(self.contracts.deposit_manager, &self.provider);
        let pending = manager
            .depositBaseTokens(value)
            .from(owner)
            .value(value)
            .send()
            .await
            .map_err(classify)?;
        let tx = *pending.tx_hash();
        info!(tx = %tx, value = %value, "Deposit broadcast");
        Ok(tx)
    }

    async fn receipt(&self, tx: TxHash) -> LedgerResult<Option<ReceiptStatus>> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx)
            .await
            .map_err(classify)?;
        let status = receipt.map(|r| {
            if r.status() {
                ReceiptStatus::Success
            } else {
                ReceiptStatus::Reverted
            }
        });
        debug!(tx = %tx, status = ?status, "Receipt polled");
        Ok(status)
    }
}
