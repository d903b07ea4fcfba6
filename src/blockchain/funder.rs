// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet funding: ERC-20 transfers from the configured funding wallet.
//!
//! A transfer is built, gas-estimated and signed locally, then broadcast.
//! The call returns as soon as the node accepts the signed payload; nothing
//! is tracked afterwards.

use std::future::Future;
use std::str::FromStr;

use alloy::{
    consensus::TxEnvelope,
    network::{Ethereum, EthereumWallet, TransactionBuilder},
    primitives::Address,
    providers::{
        fillers::{
            BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller,
            WalletFiller,
        },
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    rpc::types::TransactionRequest,
};

use super::erc20::{encode_transfer, to_base_units};
use super::error::{classify_broadcast_error, classify_transport_error, FundingError};
use super::signing::{signer_from_config, wallet_from_signer};
use super::types::{find_network, FeeModel, FeeParams, TransferReceipt, TOKEN_DECIMALS};
use crate::config::FundingConfig;

/// HTTP provider with the recommended fillers and a local signing wallet.
type SigningProvider = FillProvider<
    JoinFill<
        JoinFill<
            Identity,
            JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
        >,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider<Ethereum>,
>;

/// Anything able to move tokens to a wallet address.
pub trait TokenAllocator: Send + Sync {
    /// Transfer `amount` whole tokens to `to`.
    fn allocate_tokens(
        &self,
        to: &str,
        amount: u64,
    ) -> impl Future<Output = Result<TransferReceipt, FundingError>> + Send;
}

/// Resolved JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub network: String,
    pub rpc_url: url::Url,
    pub explorer_url: Option<String>,
}

/// Resolve the JSON-RPC endpoint from configuration.
///
/// An explicit RPC URL wins; otherwise the network must be known and a
/// provider API key must be set.
pub fn resolve_endpoint(config: &FundingConfig) -> Result<Endpoint, FundingError> {
    let known = find_network(&config.network);

    let raw_url = match (&config.rpc_url, &known, &config.provider_api_key) {
        (Some(url), _, _) => url.clone(),
        (None, Some(net), Some(key)) => net.rpc_url(key),
        (None, Some(_), None) => {
            return Err(FundingError::Config(
                "provider API key is not set".to_string(),
            ))
        }
        (None, None, _) => {
            return Err(FundingError::Config(format!(
                "unknown network `{}`",
                config.network
            )))
        }
    };

    let rpc_url = raw_url
        .parse::<url::Url>()
        .map_err(|e| FundingError::Config(format!("invalid RPC URL: {e}")))?;

    Ok(Endpoint {
        network: known
            .as_ref()
            .map(|n| n.name.to_string())
            .unwrap_or_else(|| config.network.clone()),
        rpc_url,
        explorer_url: known.map(|n| n.explorer_url.to_string()),
    })
}

/// Build the transfer transaction sent to the token contract.
pub fn transfer_request(
    from: Address,
    contract: Address,
    calldata: Vec<u8>,
    gas_limit: u64,
    fees: FeeParams,
) -> TransactionRequest {
    let tx = TransactionRequest::default()
        .from(from)
        .to(contract)
        .input(calldata.into())
        .gas_limit(gas_limit);

    match fees {
        FeeParams::Eip1559 {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        } => tx
            .max_fee_per_gas(max_fee_per_gas)
            .max_priority_fee_per_gas(max_priority_fee_per_gas),
        FeeParams::Legacy { gas_price } => tx.with_gas_price(gas_price),
    }
}

/// Sends token transfers from the funding wallet.
pub struct WalletFunder {
    endpoint: Endpoint,
    sender: Address,
    contract: Address,
    fee_model: FeeModel,
    provider: SigningProvider,
}

impl WalletFunder {
    /// Create a funder from configuration.
    ///
    /// Performs no network I/O: the provider connects lazily, so a malformed
    /// key or endpoint fails here before any RPC call is attempted.
    pub fn new(config: &FundingConfig) -> Result<Self, FundingError> {
        let endpoint = resolve_endpoint(config)?;
        let signer = signer_from_config(config.private_key.as_deref())?;
        let contract = Address::from_str(&config.contract_address)
            .map_err(|e| FundingError::Config(format!("invalid contract address: {e}")))?;

        let sender = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(wallet_from_signer(signer))
            .connect_http(endpoint.rpc_url.clone());

        tracing::info!(
            network = %endpoint.network,
            sender = %sender,
            contract = %contract,
            fee_model = ?config.fee_model,
            "Wallet funder configured"
        );

        Ok(Self {
            endpoint,
            sender,
            contract,
            fee_model: config.fee_model,
            provider,
        })
    }

    /// Address of the funding wallet.
    pub fn sender(&self) -> Address {
        self.sender
    }

    /// Token contract the transfers are sent to.
    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn fee_model(&self) -> FeeModel {
        self.fee_model
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn fee_params(&self) -> Result<FeeParams, FundingError> {
        match self.fee_model {
            FeeModel::Eip1559 => Ok(FeeParams::eip1559_default()),
            FeeModel::Legacy => {
                let gas_price = self
                    .provider
                    .get_gas_price()
                    .await
                    .map_err(|e| classify_transport_error("gas price lookup failed", &e))?;
                Ok(FeeParams::Legacy { gas_price })
            }
        }
    }

    /// Build, estimate and sign a transfer without broadcasting it.
    ///
    /// Every RPC call made here happens before anything reaches the mempool,
    /// so a network failure leaves nothing behind on-chain.
    pub async fn prepare_transfer(&self, to: &str, amount: u64) -> Result<TxEnvelope, FundingError> {
        let to_addr = Address::from_str(to)
            .map_err(|e| FundingError::InvalidAddress(format!("{to}: {e}")))?;

        let value = to_base_units(amount, TOKEN_DECIMALS);
        let calldata = encode_transfer(to_addr, value);

        let estimate_tx = TransactionRequest::default()
            .from(self.sender)
            .to(self.contract)
            .input(calldata.clone().into());

        let gas_limit = self
            .provider
            .estimate_gas(estimate_tx)
            .await
            .map_err(|e| classify_transport_error("gas estimation failed", &e))?;

        let fees = self.fee_params().await?;
        let tx = transfer_request(self.sender, self.contract, calldata, gas_limit, fees);

        tracing::debug!(to = %to_addr, gas_limit, ?fees, "Signing token transfer");

        self.provider
            .fill(tx)
            .await
            .map_err(|e| classify_transport_error("transaction fill failed", &e))?
            .try_into_envelope()
            .map_err(|_| FundingError::Config("funding wallet did not sign the transfer".to_string()))
    }

    /// Submit a signed transfer.
    ///
    /// A failure without a node reply is `BroadcastUnknown`: the node may
    /// already hold the transaction.
    pub async fn broadcast(&self, envelope: TxEnvelope) -> Result<TransferReceipt, FundingError> {
        let signed_hash = format!("{:?}", envelope.tx_hash());

        let pending = self
            .provider
            .send_tx_envelope(envelope)
            .await
            .map_err(|e| classify_broadcast_error(&signed_hash, &e))?;

        let tx_hash = format!("{:?}", pending.tx_hash());
        let explorer_url = self
            .endpoint
            .explorer_url
            .as_ref()
            .map(|base| format!("{base}/tx/{tx_hash}"));

        Ok(TransferReceipt {
            tx_hash,
            network: self.endpoint.network.clone(),
            explorer_url,
        })
    }

    async fn try_allocate(&self, to: &str, amount: u64) -> Result<TransferReceipt, FundingError> {
        let envelope = self.prepare_transfer(to, amount).await?;
        self.broadcast(envelope).await
    }

    /// Funder wired to an in-memory JSON-RPC transport.
    #[cfg(test)]
    pub(crate) fn mocked(fee_model: FeeModel, asserter: alloy::providers::mock::Asserter) -> Self {
        let signer = signer_from_config(Some(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        ))
        .expect("dev key is valid");
        let sender = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(wallet_from_signer(signer))
            .connect_mocked_client(asserter);

        Self {
            endpoint: Endpoint {
                network: "sepolia".to_string(),
                rpc_url: "http://127.0.0.1:8545".parse().expect("static url"),
                explorer_url: Some("https://sepolia.etherscan.io".to_string()),
            },
            sender,
            contract: Address::from_str("0x5425890298aed601595a70AB815c96711a31Bc65")
                .expect("static address"),
            fee_model,
            provider,
        }
    }
}

impl TokenAllocator for WalletFunder {
    async fn allocate_tokens(&self, to: &str, amount: u64) -> Result<TransferReceipt, FundingError> {
        let result = self.try_allocate(to, amount).await;

        match &result {
            Ok(receipt) => tracing::info!(
                to,
                amount,
                tx_hash = %receipt.tx_hash,
                network = %receipt.network,
                "Token allocation broadcast"
            ),
            Err(e) => tracing::error!(
                to,
                amount,
                kind = e.kind(),
                error = %e,
                "Failed to allocate tokens"
            ),
        }

        result
    }
}
