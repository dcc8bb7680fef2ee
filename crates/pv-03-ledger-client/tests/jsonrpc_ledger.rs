//! `JsonRpcLedger` against a fake Ethereum node served by axum.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use pv_03_ledger_client::domain::abi::{self, REVOKE_DOCUMENT, UPLOAD_DOCUMENT, VERIFY_DOCUMENT};
use pv_03_ledger_client::{
    await_confirmation, Address, ConfirmationPolicy, JsonRpcConfig, JsonRpcLedger, LedgerClient,
    LedgerError,
};
use serde_json::{json, Value};
use shared_types::Fingerprint;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

const NODE_ACCOUNT: &str = "0x00000000000000000000000000000000000000aa";

#[derive(Default)]
struct NodeState {
    anchored: HashSet<String>,
    receipts: HashMap<String, Value>,
    methods: Vec<String>,
    senders: Vec<String>,
    nonce: u64,
    revert_on_submit: bool,
    fail_http: bool,
}

#[derive(Clone, Default)]
struct FakeNode {
    state: Arc<Mutex<NodeState>>,
}

fn hex_data(value: &Value) -> Vec<u8> {
    let raw = value.as_str().unwrap_or_default();
    hex::decode(raw.trim_start_matches("0x")).unwrap_or_default()
}

async fn rpc(State(node): State<FakeNode>, Json(req): Json<Value>) -> Response {
    let mut st = node.state.lock();
    let method = req["method"].as_str().unwrap_or_default().to_string();
    st.methods.push(method.clone());

    if st.fail_http {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let id = req["id"].clone();
    let params = &req["params"];
    let reply = |result: Value| Json(json!({"jsonrpc": "2.0", "id": id.clone(), "result": result}));

    match method.as_str() {
        "eth_accounts" => reply(json!([NODE_ACCOUNT])).into_response(),
        "eth_blockNumber" => reply(json!("0x10")).into_response(),
        "eth_call" => {
            let (sel, fp) = abi::decode_string_call(&hex_data(&params[0]["data"])).unwrap();
            assert_eq!(sel, abi::selector(VERIFY_DOCUMENT));
            let word = abi::encode_bool(st.anchored.contains(&fp));
            reply(json!(format!("0x{}", hex::encode(word)))).into_response()
        }
        "eth_sendTransaction" => {
            let tx = &params[0];
            st.senders.push(tx["from"].as_str().unwrap_or_default().to_string());
            if st.revert_on_submit {
                return Json(json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {"code": -32000, "message": "VM Exception while processing transaction: revert"}
                }))
                .into_response();
            }

            let (sel, fp) = abi::decode_string_call(&hex_data(&tx["data"])).unwrap();
            let applied = if sel == abi::selector(UPLOAD_DOCUMENT) {
                st.anchored.insert(fp)
            } else if sel == abi::selector(REVOKE_DOCUMENT) {
                st.anchored.remove(&fp)
            } else {
                false
            };

            st.nonce += 1;
            let hash = format!("0x{:064x}", st.nonce);
            let status = if applied { "0x1" } else { "0x0" };
            let receipt = json!({
                "transactionHash": hash,
                "blockNumber": format!("0x{:x}", st.nonce),
                "status": status,
            });
            st.receipts.insert(hash.clone(), receipt);
            reply(json!(hash)).into_response()
        }
        "eth_getTransactionReceipt" => {
            let hash = params[0].as_str().unwrap_or_default();
            reply(st.receipts.get(hash).cloned().unwrap_or(Value::Null)).into_response()
        }
        _ => Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": -32601, "message": "method not found"}
        }))
        .into_response(),
    }
}

async fn spawn_node() -> (FakeNode, String) {
    let node = FakeNode::default();
    let app = Router::new().route("/", post(rpc)).with_state(node.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (node, format!("http://{}/", addr))
}

fn ledger(url: String, account: Option<Address>) -> JsonRpcLedger {
    JsonRpcLedger::new(JsonRpcConfig {
        rpc_url: url,
        contract_address: Address::repeat_byte(0xc0),
        account,
        request_timeout: Duration::from_secs(2),
        gas_limit: Some(300_000),
    })
    .unwrap()
}

fn policy() -> ConfirmationPolicy {
    ConfirmationPolicy {
        timeout: Duration::from_secs(2),
        poll_interval: Duration::from_millis(20),
    }
}

fn fp(s: &str) -> Fingerprint {
    Fingerprint::parse(s).unwrap()
}

#[tokio::test]
async fn test_register_confirm_and_exists() {
    let (node, url) = spawn_node().await;
    let ledger = ledger(url, None);

    assert!(!ledger.exists(&fp("hash1")).await.unwrap());

    let tx = ledger.submit_register(&fp("hash1")).await.unwrap();
    let receipt = await_confirmation(&ledger, tx, &policy()).await.unwrap();
    assert!(receipt.succeeded());
    assert_eq!(receipt.tx_hash, tx);
    assert!(ledger.exists(&fp("hash1")).await.unwrap());

    let tx = ledger.submit_revoke(&fp("hash1")).await.unwrap();
    await_confirmation(&ledger, tx, &policy()).await.unwrap();
    assert!(!ledger.exists(&fp("hash1")).await.unwrap());

    let st = node.state.lock();
    assert_eq!(
        st.methods.iter().filter(|m| *m == "eth_accounts").count(),
        1,
        "sender resolved once and cached"
    );
    assert!(st.senders.iter().all(|s| s == NODE_ACCOUNT));
}

#[tokio::test]
async fn test_configured_account_is_sender() {
    let (node, url) = spawn_node().await;
    let account = Address::repeat_byte(0x42);
    let ledger = ledger(url, Some(account));

    ledger.submit_register(&fp("hash1")).await.unwrap();

    let st = node.state.lock();
    assert!(!st.methods.contains(&"eth_accounts".to_string()));
    assert_eq!(st.senders, vec![format!("{:?}", account)]);
}

#[tokio::test]
async fn test_duplicate_register_reverted_receipt() {
    let (_node, url) = spawn_node().await;
    let ledger = ledger(url, None);

    let first = ledger.submit_register(&fp("dup")).await.unwrap();
    await_confirmation(&ledger, first, &policy()).await.unwrap();

    let second = ledger.submit_register(&fp("dup")).await.unwrap();
    assert_eq!(
        await_confirmation(&ledger, second, &policy()).await,
        Err(LedgerError::Reverted {
            tx_hash: Some(second)
        })
    );
}

#[tokio::test]
async fn test_revert_on_submission() {
    let (node, url) = spawn_node().await;
    node.state.lock().revert_on_submit = true;
    let ledger = ledger(url, None);

    assert_eq!(
        ledger.submit_register(&fp("hash1")).await,
        Err(LedgerError::Reverted { tx_hash: None })
    );
}

#[tokio::test]
async fn test_http_failure_is_transient_rpc_error() {
    let (node, url) = spawn_node().await;
    node.state.lock().fail_http = true;
    let ledger = ledger(url, None);

    let err = ledger.exists(&fp("hash1")).await.unwrap_err();
    assert!(err.is_transient(), "{:?}", err);
    assert!(ledger.health_check().await.is_err());
}

#[tokio::test]
async fn test_unreachable_node() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let ledger = ledger(format!("http://{}/", addr), None);
    assert!(matches!(
        ledger.exists(&fp("hash1")).await,
        Err(LedgerError::Rpc(_))
    ));
}

#[tokio::test]
async fn test_health_check() {
    let (_node, url) = spawn_node().await;
    let ledger = ledger(url, None);
    ledger.health_check().await.unwrap();
    assert_eq!(ledger.backend(), "jsonrpc");
}
