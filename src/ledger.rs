//! Ledger access seam
//!
//! The distribution engine never talks to a global RPC client. Everything
//! it needs from the chain goes through the [`LedgerClient`] trait, so the
//! whole pipeline is testable against a mock with no network access. The
//! production implementation wraps the nonblocking Solana RPC client.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_request::TokenAccountsFilter;
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};

use crate::distributor::errors::DistributionError;

/// Read and broadcast access to the ledger, as the engine sees it.
///
/// Balance reads must reflect latest confirmed state; the engine does not
/// speculate on pending balances and never caches results across calls.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Token balance of `owner` for the configured mint, in whole units.
    ///
    /// An owner with no token account has a balance of zero.
    async fn get_token_balance(&self, owner: &Pubkey) -> Result<Decimal, DistributionError>;

    /// Whether an account exists at `account`.
    async fn account_exists(&self, account: &Pubkey) -> Result<bool, DistributionError>;

    /// A recent blockhash for signing.
    async fn latest_blockhash(&self) -> Result<Hash, DistributionError>;

    /// Broadcast a signed transaction, returning its signature.
    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, DistributionError>;
}

/// RPC-backed [`LedgerClient`] for one token mint.
pub struct RpcLedgerClient {
    client: RpcClient,
    mint: Pubkey,
}

impl RpcLedgerClient {
    pub fn new(endpoint: impl Into<String>, mint: Pubkey, timeout: Duration) -> Self {
        let client = RpcClient::new_with_timeout_and_commitment(
            endpoint.into(),
            timeout,
            CommitmentConfig::confirmed(),
        );
        Self { client, mint }
    }

    pub fn mint(&self) -> Pubkey {
        self.mint
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn get_token_balance(&self, owner: &Pubkey) -> Result<Decimal, DistributionError> {
        let accounts = self
            .client
            .get_token_accounts_by_owner(owner, TokenAccountsFilter::Mint(self.mint))
            .await
            .map_err(|e| DistributionError::BalanceQuery(e.to_string()))?;

        let Some(token_account) = accounts.first() else {
            return Ok(Decimal::ZERO);
        };
        let token_account_pubkey = Pubkey::from_str(&token_account.pubkey)
            .map_err(|e| DistributionError::BalanceQuery(e.to_string()))?;

        let balance = self
            .client
            .get_token_account_balance(&token_account_pubkey)
            .await
            .map_err(|e| DistributionError::BalanceQuery(e.to_string()))?;

        // Raw amount with the reported decimals as scale gives whole units.
        let raw: i128 = balance
            .amount
            .parse()
            .map_err(|_| DistributionError::BalanceQuery(format!(
                "unparseable token amount: {}",
                balance.amount
            )))?;
        Ok(Decimal::from_i128_with_scale(raw, balance.decimals as u32))
    }

    async fn account_exists(&self, account: &Pubkey) -> Result<bool, DistributionError> {
        let response = self
            .client
            .get_account_with_commitment(account, self.client.commitment())
            .await
            .map_err(|e| DistributionError::account_query(account, e.to_string()))?;
        Ok(response.value.is_some())
    }

    async fn latest_blockhash(&self) -> Result<Hash, DistributionError> {
        self.client
            .get_latest_blockhash()
            .await
            .map_err(|e| DistributionError::Blockhash(e.to_string()))
    }

    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, DistributionError> {
        self.client
            .send_transaction(tx)
            .await
            .map_err(|e| DistributionError::submission(e.to_string()))
    }
}
