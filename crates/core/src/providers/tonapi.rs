use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::errors::CoreError;
use crate::models::account::AccountId;
use crate::models::amount::{format_fiat, format_units, units_to_f64, TON_DECIMALS};
use crate::models::settings::Settings;
use crate::models::snapshot::{BalanceSnapshot, PageItem, PageKey, WalletHeader, WalletPage};
use super::traits::BalanceSource;

const PROVIDER: &str = "TonAPI";

/// TON API (tonapi.io v2) balance source.
///
/// - **Account**: `/v2/accounts/{id}`, native balance in nanotons.
/// - **Jettons**: `/v2/accounts/{id}/jettons?currencies={cur}`, token balances with prices.
/// - **Rates**: `/v2/rates?tokens=ton&currencies={cur}`, TON fiat rate.
/// - **NFTs**: `/v2/accounts/{id}/nfts?limit={n}`, collectibles.
///
/// Account and jettons are required for a snapshot. Rates and NFTs are
/// best-effort: without a rate the total is shown in TON, without NFTs the
/// collectibles page is omitted.
pub struct TonApiSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    wallet_title: String,
    currency: String,
    nft_page_limit: u32,
}

impl TonApiSource {
    pub fn new(settings: &Settings) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            wallet_title: settings.wallet_title.clone(),
            currency: settings.currency.trim().to_uppercase(),
            nft_page_limit: settings.nft_page_limit,
        }
    }

    /// Assemble a snapshot from already-decoded API responses.
    ///
    /// Zero jetton balances are skipped. A jetton balance that is not a
    /// base-10 integer fails the whole snapshot.
    pub fn build_snapshot(
        &self,
        account: &AccountResponse,
        jettons: &[JettonBalance],
        ton_rate: Option<f64>,
        nfts: &[NftItem],
        fetched_at: DateTime<Utc>,
    ) -> Result<BalanceSnapshot, CoreError> {
        let ton_units = units_to_f64(u128::from(account.balance), TON_DECIMALS);

        let mut items = vec![PageItem {
            symbol: "TON".to_string(),
            name: "Toncoin".to_string(),
            amount: format_units(u128::from(account.balance), TON_DECIMALS),
            fiat_value: ton_rate.map(|rate| format_fiat(ton_units * rate, &self.currency)),
        }];
        let mut fiat_total = ton_rate.map(|rate| ton_units * rate);

        for entry in jettons {
            let raw: u128 = entry.balance.parse().map_err(|_| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!(
                    "Invalid balance '{}' for jetton {}",
                    entry.balance, entry.jetton.symbol
                ),
            })?;
            if raw == 0 {
                continue;
            }

            let price = entry
                .price
                .as_ref()
                .and_then(|p| p.prices.get(&self.currency).copied())
                .filter(|p| p.is_finite() && *p >= 0.0);
            let value = price.map(|p| units_to_f64(raw, entry.jetton.decimals) * p);
            if let (Some(total), Some(v)) = (fiat_total.as_mut(), value) {
                *total += v;
            }

            items.push(PageItem {
                symbol: entry.jetton.symbol.clone(),
                name: entry.jetton.name.clone(),
                amount: format_units(raw, entry.jetton.decimals),
                fiat_value: value.map(|v| format_fiat(v, &self.currency)),
            });
        }

        let mut pages = vec![WalletPage::new(PageKey::Tokens, items)];
        if !nfts.is_empty() {
            let collectibles = nfts
                .iter()
                .map(|nft| PageItem {
                    symbol: nft
                        .collection
                        .as_ref()
                        .map(|c| c.name.clone())
                        .unwrap_or_else(|| "NFT".to_string()),
                    name: nft
                        .metadata
                        .get("name")
                        .and_then(|v| v.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| nft.address.clone()),
                    amount: "1".to_string(),
                    fiat_value: None,
                })
                .collect();
            pages.push(WalletPage::new(PageKey::Collectibles, collectibles));
        }

        let total = match fiat_total {
            Some(total) => format_fiat(total, &self.currency),
            None => format!("{} TON", format_units(u128::from(account.balance), TON_DECIMALS)),
        };
        let header = WalletHeader::new(self.wallet_title.clone(), total, account.address.clone());

        Ok(BalanceSnapshot::new(header, pages).with_fetched_at(fetched_at))
    }

    fn url(&self, segments: &[&str]) -> Result<Url, CoreError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Invalid base URL '{}': {e}", self.base_url),
        })?;
        url.path_segments_mut()
            .map_err(|_| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Base URL '{}' cannot have a path", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, CoreError> {
        let url = self.url(segments)?;
        let mut request = self.client.get(url).query(query);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("HTTP {status} for /{}", segments.join("/")),
            });
        }

        response.json().await.map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to parse /{}: {e}", segments.join("/")),
        })
    }

    async fn fetch_ton_rate(&self) -> Option<f64> {
        let query = [("tokens", "ton".to_string()), ("currencies", self.currency.clone())];
        match self.get_json::<RatesResponse>(&["v2", "rates"], &query).await {
            Ok(resp) => resp
                .rates
                .iter()
                .find(|(token, _)| token.eq_ignore_ascii_case("ton"))
                .and_then(|(_, rates)| rates.prices.get(&self.currency).copied())
                .filter(|r| r.is_finite() && *r >= 0.0),
            Err(e) => {
                debug!(error = %e, "TON rate unavailable, showing total in TON");
                None
            }
        }
    }

    async fn fetch_nfts(&self, account: &AccountId) -> Vec<NftItem> {
        let query = [("limit", self.nft_page_limit.to_string())];
        match self
            .get_json::<NftsResponse>(&["v2", "accounts", account.as_str(), "nfts"], &query)
            .await
        {
            Ok(resp) => resp.nft_items,
            Err(e) => {
                debug!(%account, error = %e, "collectibles unavailable");
                Vec::new()
            }
        }
    }

    async fn fetch_snapshot(&self, account: &AccountId) -> Result<BalanceSnapshot, CoreError> {
        let info_path = ["v2", "accounts", account.as_str()];
        let jettons_path = ["v2", "accounts", account.as_str(), "jettons"];
        let jettons_query = [("currencies", self.currency.clone())];
        let (info, jettons, rate, nfts) = tokio::join!(
            self.get_json::<AccountResponse>(&info_path, &[]),
            self.get_json::<JettonsResponse>(&jettons_path, &jettons_query),
            self.fetch_ton_rate(),
            self.fetch_nfts(account),
        );

        self.build_snapshot(&info?, &jettons?.balances, rate, &nfts, Utc::now())
    }
}

// ── TON API response types ──────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct AccountResponse {
    pub address: String,
    /// Native balance in nanotons.
    pub balance: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JettonsResponse {
    #[serde(default)]
    pub balances: Vec<JettonBalance>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JettonBalance {
    /// Raw integer amount, as a decimal string.
    pub balance: String,
    pub jetton: JettonPreview,
    #[serde(default)]
    pub price: Option<TokenRates>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JettonPreview {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRates {
    #[serde(default)]
    pub prices: HashMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RatesResponse {
    #[serde(default)]
    pub rates: HashMap<String, TokenRates>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NftsResponse {
    #[serde(default)]
    pub nft_items: Vec<NftItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NftItem {
    pub address: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub collection: Option<NftCollection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NftCollection {
    pub name: String,
}

#[async_trait]
impl BalanceSource for TonApiSource {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn fetch_balance(&self, account: &AccountId) -> Result<BalanceSnapshot, CoreError> {
        self.fetch_snapshot(account)
            .await
            .map_err(|e| CoreError::RefreshFailed(e.to_string()))
    }
}
