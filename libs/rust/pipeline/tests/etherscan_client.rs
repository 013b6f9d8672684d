use mockito::Matcher;
use serial_test::serial;
use treasury_pipeline::directory::Address;
use treasury_pipeline::models::DataSource;
use treasury_pipeline::providers::{etherscan::EtherscanClient, fallback, ChainDataProvider, FallbackReason};

fn timelock() -> Address {
    // mixed case on purpose: the pipeline must lowercase before use
    Address::parse("0xFe89cc7aBB2C4183683ab71653C4cdc9B02D44b7").unwrap()
}

#[tokio::test]
async fn balance_normalizes_the_envelope() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("action".into(), "balance".into()),
            // outbound address is already lowercased
            Matcher::UrlEncoded(
                "address".into(),
                "0xfe89cc7abb2c4183683ab71653c4cdc9b02d44b7".into(),
            ),
            Matcher::UrlEncoded("apikey".into(), "test-key".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":"1","message":"OK","result":"1000000000000000000"}"#)
        .create_async()
        .await;

    let client = EtherscanClient::new(server.url(), Some("test-key".to_string()));
    let fetched = client.balance(&timelock()).await;

    mock.assert_async().await;
    assert!(!fetched.is_fallback());
    let snapshot = fetched.into_value();
    assert_eq!(snapshot.balance, "1");
    assert_eq!(snapshot.address.as_str(), "0xfe89cc7abb2c4183683ab71653c4cdc9b02d44b7");
    assert_eq!(snapshot.source, DataSource::Etherscan);
}

#[tokio::test]
async fn provider_reported_errors_fall_back_deterministically() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"status":"0","message":"NOTOK","result":"Max rate limit reached"}"#)
        .create_async()
        .await;

    let client = EtherscanClient::new(server.url(), Some("test-key".to_string()));
    let address = timelock();
    let fetched = client.balance(&address).await;

    assert!(fetched.is_fallback());
    match fetched.reason() {
        Some(FallbackReason::Provider { message }) => {
            assert!(message.contains("Max rate limit reached"))
        }
        other => panic!("unexpected reason {other:?}"),
    }
    // the substitute is the address-seeded mock value
    assert_eq!(fetched.value().balance, fallback::balance_snapshot(&address).balance);
}

#[tokio::test]
async fn http_errors_fall_back_without_retrying() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("upstream exploded")
        .expect(1)
        .create_async()
        .await;

    let client = EtherscanClient::new(server.url(), Some("test-key".to_string()));
    let fetched = client.gas_price().await;

    mock.assert_async().await;
    assert!(fetched.is_fallback());
    assert_eq!(fetched.reason(), Some(&FallbackReason::Status { code: 503 }));
    assert_eq!(fetched.value().standard, fallback::gas_price_snapshot().standard);
}

#[tokio::test]
async fn no_transactions_found_is_an_empty_live_list() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api")
        .match_query(Matcher::UrlEncoded("action".into(), "txlist".into()))
        .with_status(200)
        .with_body(r#"{"status":"0","message":"No transactions found","result":[]}"#)
        .create_async()
        .await;

    let client = EtherscanClient::new(server.url(), Some("test-key".to_string()));
    let fetched = client.transactions(&timelock(), 50).await;

    assert!(!fetched.is_fallback());
    assert!(fetched.into_value().is_empty());
}

#[tokio::test]
async fn txlist_normalizes_and_isolates_malformed_records() {
    let body = r#"{
        "status": "1",
        "message": "OK",
        "result": [
            {
                "hash": "0xaaa1",
                "from": "0xFe89cc7aBB2C4183683ab71653C4cdc9B02D44b7",
                "to": "0x2686A8919Df194aA7673244549E68D42C1685d03",
                "value": "2000000000000000000",
                "gas": "21000",
                "gasPrice": "30000000000",
                "gasUsed": "21000",
                "blockNumber": "18570000",
                "confirmations": "64",
                "timeStamp": "1700000000",
                "isError": "0"
            },
            {
                "from": "0xFe89cc7aBB2C4183683ab71653C4cdc9B02D44b7",
                "to": "0x2686A8919Df194aA7673244549E68D42C1685d03",
                "value": "1"
            },
            {
                "hash": "0xaaa2",
                "from": "0xFe89cc7aBB2C4183683ab71653C4cdc9B02D44b7",
                "to": "0x2686A8919Df194aA7673244549E68D42C1685d03",
                "value": "500000000000000000",
                "gas": "21000",
                "gasPrice": "30000000000",
                "gasUsed": "21000",
                "blockNumber": "18569000",
                "confirmations": "1088",
                "timeStamp": "1699990000",
                "isError": "1"
            }
        ]
    }"#;
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api")
        .match_query(Matcher::UrlEncoded("action".into(), "txlist".into()))
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let client = EtherscanClient::new(server.url(), Some("test-key".to_string()));
    let transactions = client.transactions(&timelock(), 50).await.into_value();

    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0].value, "2");
    assert!(!transactions[0].is_error);
    assert!(transactions[1].is_error);
    assert_eq!(transactions[1].value, "0.5");
}

#[tokio::test]
async fn gas_oracle_maps_all_three_tiers() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api")
        .match_query(Matcher::UrlEncoded("module".into(), "gastracker".into()))
        .with_status(200)
        .with_body(
            r#"{"status":"1","message":"OK","result":{"LastBlock":"18570000","SafeGasPrice":"21","ProposeGasPrice":"24","FastGasPrice":"29","suggestBaseFee":"20.7"}}"#,
        )
        .create_async()
        .await;

    let client = EtherscanClient::new(server.url(), Some("test-key".to_string()));
    let gas = client.gas_price().await.into_value();

    assert_eq!((gas.safe_low, gas.standard, gas.fast), (21, 24, 29));
    assert_eq!(gas.source, DataSource::Etherscan);
}

#[tokio::test]
async fn demo_mode_serves_stable_fallbacks_without_network() {
    let client = EtherscanClient::demo();
    let address = timelock();

    let first = client.balance(&address).await;
    let second = client.balance(&address).await;

    assert!(client.is_demo());
    assert_eq!(first.reason(), Some(&FallbackReason::MissingApiKey));
    assert_eq!(first.value().balance, second.value().balance);
    assert!(client.token_transfers(&address, 50).await.into_value().is_empty());
}

#[tokio::test]
#[serial]
async fn from_env_selects_demo_mode_when_the_key_is_absent() {
    std::env::remove_var("ETHERSCAN_API_KEY");
    std::env::remove_var("ETHERSCAN_API_URL");
    assert!(EtherscanClient::from_env().is_demo());

    std::env::set_var("ETHERSCAN_API_KEY", "test-key");
    assert!(!EtherscanClient::from_env().is_demo());
    std::env::remove_var("ETHERSCAN_API_KEY");
}
