//! Wallet connection
//!
//! The dashboard only displays a connected account; there is no chain access.
//! A `WalletProvider` stands in for the browser-injected provider and the
//! demo implementation answers from configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::views::shorten_address;

/// Wallet provider errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum WalletError {
    #[error("No wallet provider detected")]
    NoProvider,

    #[error("Wallet connection was rejected")]
    Rejected,

    #[error("No accounts returned by provider")]
    NoAccounts,

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("{0}")]
    InvalidInput(String),
}

/// Network reported by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub name: String,
    pub chain_id: u64,
}

/// Source of accounts, network and balance
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask the user to expose their accounts
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError>;

    async fn network(&self) -> Result<NetworkInfo, WalletError>;

    /// Balance in ether
    async fn balance(&self, address: &str) -> Result<f64, WalletError>;
}

/// A connected wallet as shown in the top bar and wallet overview
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSession {
    pub address: String,
    pub short_address: String,
    pub network: String,
    pub chain_id: u64,
    pub balance_eth: f64,
}

/// Run the connect handshake against a provider.
///
/// Nothing is recorded here; the caller logs the connection once this
/// succeeds.
pub async fn open_session(provider: &dyn WalletProvider) -> Result<WalletSession, WalletError> {
    let accounts = provider.request_accounts().await?;
    let address = accounts.into_iter().next().ok_or(WalletError::NoAccounts)?;
    let network = provider.network().await?;
    let balance_eth = provider.balance(&address).await?;

    info!(address = %shorten_address(&address), network = %network.name, "Wallet connected");

    Ok(WalletSession {
        short_address: shorten_address(&address),
        address,
        network: if network.name.is_empty() {
            network.chain_id.to_string()
        } else {
            network.name
        },
        chain_id: network.chain_id,
        balance_eth,
    })
}

/// Demo wallet settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Whether a provider is "installed"
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default = "default_network")]
    pub network: String,

    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    #[serde(default)]
    pub balance_eth: f64,

    /// Simulate the user declining the connection request
    #[serde(default)]
    pub reject: bool,
}

fn default_true() -> bool { true }
fn default_address() -> String { "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".to_string() }
fn default_network() -> String { "sepolia".to_string() }
fn default_chain_id() -> u64 { 11155111 }

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: default_address(),
            network: default_network(),
            chain_id: default_chain_id(),
            balance_eth: 0.0,
            reject: false,
        }
    }
}

/// Provider that answers from `WalletConfig`
pub struct DemoWallet {
    config: WalletConfig,
}

impl DemoWallet {
    pub fn new(config: WalletConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl WalletProvider for DemoWallet {
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        if !self.config.enabled {
            return Err(WalletError::NoProvider);
        }
        if self.config.reject {
            return Err(WalletError::Rejected);
        }
        Ok(vec![self.config.address.clone()])
    }

    async fn network(&self) -> Result<NetworkInfo, WalletError> {
        Ok(NetworkInfo {
            name: self.config.network.clone(),
            chain_id: self.config.chain_id,
        })
    }

    async fn balance(&self, _address: &str) -> Result<f64, WalletError> {
        Ok(self.config.balance_eth)
    }
}

/// Placeholder contract read; validates input and acknowledges.
pub fn read_contract(address: &str) -> Result<String, WalletError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(WalletError::InvalidInput("Please enter contract address".to_string()));
    }
    Ok(format!("Reading contract {} (placeholder)", address))
}

/// Placeholder token transfer; validates input and acknowledges.
pub fn token_transfer(address: &str, amount: &str) -> Result<String, WalletError> {
    let address = address.trim();
    let amount = amount.trim();
    if address.is_empty() || amount.is_empty() {
        return Err(WalletError::InvalidInput(
            "Token address and amount required".to_string(),
        ));
    }
    match amount.parse::<f64>() {
        Ok(a) if a.is_finite() && a > 0.0 => {
            Ok(format!("Transfer {} tokens to {} (placeholder)", amount, address))
        }
        _ => Err(WalletError::InvalidInput(format!("Invalid token amount: {}", amount))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_wallet_session() {
        let wallet = DemoWallet::new(WalletConfig {
            balance_eth: 1.5,
            ..Default::default()
        });

        let session = open_session(&wallet).await.unwrap();
        assert_eq!(session.short_address, "0x5aAe...eAed");
        assert_eq!(session.network, "sepolia");
        assert_eq!(session.balance_eth, 1.5);
    }

    #[tokio::test]
    async fn test_rejected_connection() {
        let wallet = DemoWallet::new(WalletConfig {
            reject: true,
            ..Default::default()
        });
        let err = open_session(&wallet).await.unwrap_err();
        assert!(matches!(err, WalletError::Rejected));
    }

    #[tokio::test]
    async fn test_missing_provider() {
        let wallet = DemoWallet::new(WalletConfig {
            enabled: false,
            ..Default::default()
        });
        assert!(matches!(
            open_session(&wallet).await,
            Err(WalletError::NoProvider)
        ));
    }

    #[test]
    fn test_placeholders_validate_input() {
        assert!(matches!(read_contract("  "), Err(WalletError::InvalidInput(_))));
        assert!(read_contract("0xabc").unwrap().contains("0xabc"));

        assert!(matches!(
            token_transfer("0xabc", ""),
            Err(WalletError::InvalidInput(_))
        ));
        assert!(matches!(
            token_transfer("0xabc", "ten"),
            Err(WalletError::InvalidInput(msg)) if msg.contains("ten")
        ));
        assert!(token_transfer("0xabc", "10").is_ok());
    }
}
