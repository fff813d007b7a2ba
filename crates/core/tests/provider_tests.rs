// ═══════════════════════════════════════════════════════════════════
// Provider Tests — TON API response parsing and snapshot assembly
// ═══════════════════════════════════════════════════════════════════

use chrono::{TimeZone, Utc};
use wallet_balance_core::errors::CoreError;
use wallet_balance_core::models::account::AccountId;
use wallet_balance_core::models::settings::Settings;
use wallet_balance_core::models::snapshot::PageKey;
use wallet_balance_core::providers::tonapi::{
    AccountResponse, JettonBalance, JettonsResponse, NftItem, NftsResponse, RatesResponse,
    TonApiSource,
};
use wallet_balance_core::providers::traits::BalanceSource;

const ADDRESS: &str = "0:83dfd552e63729b472fcbcc8c45ebcc6691702558b68ec7527e1ba403a0f31a8";

fn source() -> TonApiSource {
    TonApiSource::new(&Settings::default())
}

fn account_json(balance: u64) -> AccountResponse {
    serde_json::from_str(&format!(
        r#"{{"address":"{ADDRESS}","balance":{balance},"status":"active","interfaces":["wallet_v4r2"]}}"#
    ))
    .unwrap()
}

fn jettons_json() -> Vec<JettonBalance> {
    let json = r#"{
        "balances": [
            {
                "balance": "3500000",
                "price": { "prices": { "USD": 1.0 }, "diff_24h": { "USD": "+0.01%" } },
                "wallet_address": { "address": "0:aa" },
                "jetton": {
                    "address": "0:b113a994b5024a16719f69139328eb759596c38a25f59028b146fecdc3621dfe",
                    "name": "Tether USD",
                    "symbol": "USD₮",
                    "decimals": 6,
                    "image": "https://example.invalid/usdt.png"
                }
            },
            {
                "balance": "0",
                "jetton": { "address": "0:cc", "name": "Dust", "symbol": "DUST", "decimals": 9 }
            },
            {
                "balance": "1234000000000",
                "jetton": { "address": "0:dd", "name": "Notcoin", "symbol": "NOT", "decimals": 9 }
            }
        ]
    }"#;
    serde_json::from_str::<JettonsResponse>(json).unwrap().balances
}

fn nfts_json() -> Vec<NftItem> {
    let json = r#"{
        "nft_items": [
            {
                "address": "0:nft1",
                "index": 7,
                "metadata": { "name": "TON Punk #7", "image": "https://example.invalid/7.png" },
                "collection": { "address": "0:col", "name": "TON Punks" }
            },
            { "address": "0:nft2" }
        ]
    }"#;
    serde_json::from_str::<NftsResponse>(json).unwrap().nft_items
}

fn fetched_at() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap()
}

// ═══════════════════════════════════════════════════════════════════
// Response parsing
// ═══════════════════════════════════════════════════════════════════

mod parsing {
    use super::*;

    #[test]
    fn account_ignores_unknown_fields() {
        let account = account_json(12_000_000_000);
        assert_eq!(account.address, ADDRESS);
        assert_eq!(account.balance, 12_000_000_000);
    }

    #[test]
    fn jettons_with_and_without_price() {
        let jettons = jettons_json();
        assert_eq!(jettons.len(), 3);
        assert_eq!(jettons[0].jetton.decimals, 6);
        assert_eq!(jettons[0].price.as_ref().unwrap().prices["USD"], 1.0);
        assert!(jettons[2].price.is_none());
    }

    #[test]
    fn missing_balances_array_is_empty() {
        let resp: JettonsResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.balances.is_empty());
    }

    #[test]
    fn rates() {
        let resp: RatesResponse =
            serde_json::from_str(r#"{"rates":{"TON":{"prices":{"USD":5.21}}}}"#).unwrap();
        assert_eq!(resp.rates["TON"].prices["USD"], 5.21);
    }

    #[test]
    fn nft_optional_fields() {
        let nfts = nfts_json();
        assert_eq!(nfts.len(), 2);
        assert!(nfts[1].collection.is_none());
        assert!(nfts[1].metadata.is_empty());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Snapshot assembly
// ═══════════════════════════════════════════════════════════════════

mod build_snapshot {
    use super::*;

    #[test]
    fn without_rate_total_is_in_ton() {
        let snapshot = source()
            .build_snapshot(&account_json(12_000_000_000), &[], None, &[], fetched_at())
            .unwrap();

        assert_eq!(snapshot.header.title, "Wallet");
        assert_eq!(snapshot.header.total, "12 TON");
        assert_eq!(snapshot.header.full_address, ADDRESS);
        assert_eq!(snapshot.fetched_at, Some(fetched_at()));

        let tokens = snapshot.page(PageKey::Tokens).unwrap();
        assert_eq!(tokens.items.len(), 1);
        assert_eq!(tokens.items[0].symbol, "TON");
        assert_eq!(tokens.items[0].amount, "12");
        assert!(tokens.items[0].fiat_value.is_none());
    }

    #[test]
    fn with_rate_total_is_fiat() {
        let snapshot = source()
            .build_snapshot(&account_json(2_000_000_000), &jettons_json(), Some(5.0), &[], fetched_at())
            .unwrap();

        // 2 TON * 5.0 + 3.5 USD₮ * 1.0; NOT has no price and adds nothing.
        assert_eq!(snapshot.header.total, "$13.50");

        let tokens = snapshot.page(PageKey::Tokens).unwrap();
        assert_eq!(tokens.items[0].fiat_value.as_deref(), Some("$10.00"));
        assert_eq!(tokens.items[1].symbol, "USD₮");
        assert_eq!(tokens.items[1].amount, "3.5");
        assert_eq!(tokens.items[1].fiat_value.as_deref(), Some("$3.50"));
    }

    #[test]
    fn zero_balances_skipped_and_order_kept() {
        let snapshot = source()
            .build_snapshot(&account_json(1), &jettons_json(), None, &[], fetched_at())
            .unwrap();

        let symbols: Vec<_> = snapshot
            .page(PageKey::Tokens)
            .unwrap()
            .items
            .iter()
            .map(|i| i.symbol.as_str())
            .collect();
        assert_eq!(symbols, ["TON", "USD₮", "NOT"]);

        let not = &snapshot.page(PageKey::Tokens).unwrap().items[2];
        assert_eq!(not.amount, "1,234");
        assert_eq!(snapshot.header.total, "0.000000001 TON");
    }

    #[test]
    fn invalid_jetton_balance_fails() {
        let mut jettons = jettons_json();
        jettons[0].balance = "12abc".into();

        let err = source()
            .build_snapshot(&account_json(1), &jettons, None, &[], fetched_at())
            .unwrap_err();
        assert!(matches!(err, CoreError::Api { ref provider, .. } if provider == "TonAPI"));
    }

    #[test]
    fn collectibles_page_only_when_nfts_present() {
        let without = source()
            .build_snapshot(&account_json(1), &[], None, &[], fetched_at())
            .unwrap();
        assert!(without.page(PageKey::Collectibles).is_none());

        let with = source()
            .build_snapshot(&account_json(1), &[], None, &nfts_json(), fetched_at())
            .unwrap();
        assert_eq!(with.pages.len(), 2);
        let items = &with.page(PageKey::Collectibles).unwrap().items;
        assert_eq!(items[0].symbol, "TON Punks");
        assert_eq!(items[0].name, "TON Punk #7");
        assert_eq!(items[0].amount, "1");
        assert_eq!(items[1].symbol, "NFT");
        assert_eq!(items[1].name, "0:nft2");
    }

    #[test]
    fn uses_configured_title_and_currency() {
        let settings = Settings {
            wallet_title: "Cold storage".into(),
            currency: "eur".into(),
            ..Settings::default()
        };
        let jettons = jettons_json();
        let snapshot = TonApiSource::new(&settings)
            .build_snapshot(&account_json(1_000_000_000), &jettons, Some(4.0), &[], fetched_at())
            .unwrap();

        assert_eq!(snapshot.header.title, "Cold storage");
        // USD₮ only has a USD price, so only TON counts towards the EUR total.
        assert_eq!(snapshot.header.total, "€4.00");
        assert!(snapshot.page(PageKey::Tokens).unwrap().items[1].fiat_value.is_none());
    }

    #[test]
    fn negative_price_is_ignored() {
        let mut jettons = jettons_json();
        jettons[0]
            .price
            .as_mut()
            .unwrap()
            .prices
            .insert("USD".into(), -1.0);

        let snapshot = source()
            .build_snapshot(&account_json(1_000_000_000), &jettons, Some(2.0), &[], fetched_at())
            .unwrap();
        assert_eq!(snapshot.header.total, "$2.00");
    }
}

// ═══════════════════════════════════════════════════════════════════
// BalanceSource impl
// ═══════════════════════════════════════════════════════════════════

mod source_impl {
    use super::*;

    #[test]
    fn name() {
        assert_eq!(source().name(), "TonAPI");
    }

    #[tokio::test]
    async fn unreachable_host_is_refresh_failure() {
        let settings = Settings {
            api_base_url: "http://127.0.0.1:9".into(),
            request_timeout_secs: 2,
            ..Settings::default()
        };
        let account = AccountId::new(ADDRESS).unwrap();

        let err = TonApiSource::new(&settings)
            .fetch_balance(&account)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::RefreshFailed(_)));
    }

    #[tokio::test]
    async fn invalid_base_url_is_refresh_failure() {
        let settings = Settings {
            api_base_url: "not a url".into(),
            ..Settings::default()
        };
        let account = AccountId::new(ADDRESS).unwrap();

        let err = TonApiSource::new(&settings)
            .fetch_balance(&account)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::RefreshFailed(ref msg) if msg.contains("Invalid base URL")));
    }

    #[test]
    fn usable_as_trait_object() {
        let source: std::sync::Arc<dyn BalanceSource> = std::sync::Arc::new(source());
        assert_eq!(source.name(), "TonAPI");
    }
}

// ═══════════════════════════════════════════════════════════════════
// Fetch against a local TON API stand-in
// ═══════════════════════════════════════════════════════════════════

mod local_server {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const WALLET: &str = "EQlocalWallet1";

    fn route(path: &str) -> (u16, String) {
        let base = path.split('?').next().unwrap_or(path);
        match base {
            "/v2/accounts/EQlocalWallet1" => (
                200,
                r#"{"address":"EQlocalWallet1","balance":2000000000}"#.into(),
            ),
            "/v2/accounts/EQlocalWallet1/jettons" => (
                200,
                r#"{"balances":[{"balance":"3500000","price":{"prices":{"USD":1.0}},
                    "jetton":{"address":"0:usdt","name":"Tether USD","symbol":"USDT","decimals":6}}]}"#
                    .into(),
            ),
            "/v2/rates" => (200, r#"{"rates":{"TON":{"prices":{"USD":5.0}}}}"#.into()),
            "/v2/accounts/EQlocalWallet1/nfts" => (500, "{}".into()),
            _ => (404, "{}".into()),
        }
    }

    /// Serves canned TON API responses and records each request head.
    async fn serve() -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = requests.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let log = log.clone();
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        match stream.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => buf.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let head = String::from_utf8_lossy(&buf).to_string();
                    let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                    log.lock().unwrap().push(head);

                    let (status, body) = route(&path);
                    let response = format!(
                        "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        (format!("http://{addr}"), requests)
    }

    #[tokio::test]
    async fn fetch_builds_snapshot_from_all_endpoints() {
        let (base_url, requests) = serve().await;
        let settings = Settings {
            api_base_url: base_url,
            api_key: Some("secret-key".into()),
            request_timeout_secs: 5,
            ..Settings::default()
        };

        let snapshot = TonApiSource::new(&settings)
            .fetch_balance(&AccountId::new(WALLET).unwrap())
            .await
            .unwrap();

        // 2 TON * 5.0 + 3.5 USDT * 1.0
        assert_eq!(snapshot.header.total, "$13.50");
        assert_eq!(snapshot.header.full_address, WALLET);
        assert_eq!(snapshot.page(PageKey::Tokens).unwrap().items.len(), 2);
        // NFTs failed with HTTP 500: best-effort, so the page is just omitted.
        assert!(snapshot.page(PageKey::Collectibles).is_none());
        assert!(snapshot.fetched_at.is_some());

        let requests = requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 4);
        for head in &requests {
            assert!(
                head.to_ascii_lowercase().contains("authorization: bearer secret-key"),
                "missing bearer token in {head}"
            );
        }
        assert!(requests.iter().any(|h| h.starts_with("GET /v2/accounts/EQlocalWallet1/jettons?currencies=USD ")));
        assert!(requests.iter().any(|h| h.starts_with("GET /v2/rates?tokens=ton&currencies=USD ")));
        assert!(requests.iter().any(|h| h.starts_with("GET /v2/accounts/EQlocalWallet1/nfts?limit=50 ")));
    }

    #[tokio::test]
    async fn unknown_account_is_refresh_failure() {
        let (base_url, _requests) = serve().await;
        let settings = Settings {
            api_base_url: base_url,
            request_timeout_secs: 5,
            ..Settings::default()
        };

        let err = TonApiSource::new(&settings)
            .fetch_balance(&AccountId::new("EQsomeoneElse").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::RefreshFailed(ref msg) if msg.contains("HTTP 404")));
    }
}
