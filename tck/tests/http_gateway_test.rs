//! End-to-end gateway and mirror tests against stub HTTP servers.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sdk_tck::fees::CustomFee;
use sdk_tck::keys::{KeySpec, KeySpecGenerator};
use sdk_tck::readers::{EntityId, MirrorReader, MirrorRecord, MirrorRestClient};
use sdk_tck::test_utils::LocalKeyBackend;
use serde_json::{json, Value};
use tck_common::crypto::KeyTree;
use tck_common::rpc::{
    RpcClient, RpcClientConfig, RpcError, RpcRequest, RpcResponse, Transport, METHOD_NOT_FOUND,
};
use tck_common::TestContext;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Request as seen by the stub server
#[derive(Debug, Clone)]
struct StubRequest {
    method: String,
    path: String,
    content_type: Option<String>,
    body: String,
}

type Handler = dyn Fn(&StubRequest) -> (u16, String) + Send + Sync;

/// Minimal HTTP/1.1 server answering every request through `handler`
struct StubServer {
    url: String,
    requests: Arc<Mutex<Vec<StubRequest>>>,
}

impl StubServer {
    async fn start(handler: impl Fn(&StubRequest) -> (u16, String) + Send + Sync + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<Handler> = Arc::new(handler);

        let seen = requests.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let handler = handler.clone();
                let seen = seen.clone();
                tokio::spawn(async move {
                    let (read, mut write) = stream.into_split();
                    let mut reader = BufReader::new(read);
                    let Some(request) = read_request(&mut reader).await else {
                        return;
                    };
                    seen.lock().push(request.clone());
                    let (status, body) = handler(&request);
                    let response = format!(
                        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        reason(status),
                        body.len(),
                        body
                    );
                    let _ = write.write_all(response.as_bytes()).await;
                    let _ = write.shutdown().await;
                });
            }
        });

        Self {
            url: format!("http://{}", addr),
            requests,
        }
    }

    fn requests(&self) -> Vec<StubRequest> {
        self.requests.lock().clone()
    }
}

async fn read_request<R: AsyncBufReadExt + Unpin>(reader: &mut R) -> Option<StubRequest> {
    let mut line = String::new();
    reader.read_line(&mut line).await.ok()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut content_length = 0;
    let mut content_type = None;
    loop {
        let mut header = String::new();
        reader.read_line(&mut header).await.ok()?;
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.trim().parse().ok()?,
                "content-type" => content_type = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await.ok()?;
    Some(StubRequest {
        method,
        path,
        content_type,
        body: String::from_utf8(body).ok()?,
    })
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

fn request_id(request: &StubRequest) -> Value {
    serde_json::from_str::<Value>(&request.body).unwrap()["id"].clone()
}

fn client_for(server: &StubServer) -> RpcClient {
    let config = RpcClientConfig {
        request_timeout: Duration::from_secs(5),
        connection_timeout: Duration::from_secs(5),
    };
    RpcClient::http(&server.url, &config).unwrap()
}

#[tokio::test]
async fn test_successful_call_carries_session_and_id() {
    init_logging();
    let server = StubServer::start(|request| {
        let body = json!({ "jsonrpc": "2.0", "id": request_id(request), "result": { "status": "SUCCESS" } });
        (200, body.to_string())
    })
    .await;
    let client = client_for(&server);
    let ctx = TestContext::new("http").with_session("abc");

    let result = client
        .call(&ctx, "getAccountInfo", json!({ "accountId": "0.0.2" }))
        .await
        .unwrap();
    assert_eq!(result["status"], "SUCCESS");

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].content_type.as_deref(), Some("application/json"));
    let sent: Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(sent["jsonrpc"], "2.0");
    assert_eq!(sent["id"], 1);
    assert_eq!(sent["method"], "getAccountInfo");
    assert_eq!(sent["params"]["sessionId"], "abc");
    assert_eq!(sent["params"]["accountId"], "0.0.2");
}

#[tokio::test]
async fn test_method_not_found_is_skip_signal() {
    init_logging();
    let server = StubServer::start(|request| {
        let body = json!({
            "jsonrpc": "2.0",
            "id": request_id(request),
            "error": { "code": METHOD_NOT_FOUND, "message": "Method not found" }
        });
        (200, body.to_string())
    })
    .await;

    let err = client_for(&server)
        .call(&TestContext::new("http"), "createTopic", json!({}))
        .await
        .unwrap_err();

    assert!(err.is_not_implemented());
    assert_eq!(err.get_code(), METHOD_NOT_FOUND);
    assert_eq!(
        sdk_tck::skip_unsupported::<Value>(Err(err)).unwrap(),
        None
    );
}

#[tokio::test]
async fn test_error_status_on_http_500_is_surfaced() {
    init_logging();
    let server = StubServer::start(|request| {
        let body = json!({
            "jsonrpc": "2.0",
            "id": request_id(request),
            "error": {
                "code": -32603,
                "message": "Precheck failed",
                "data": { "status": "INVALID_SIGNATURE" }
            }
        });
        (500, body.to_string())
    })
    .await;

    let err = client_for(&server)
        .call(&TestContext::new("http"), "createAccount", json!({}))
        .await
        .unwrap_err();

    assert!(err.is_application());
    assert!(!err.is_not_implemented());
    assert_eq!(err.status(), Some("INVALID_SIGNATURE"));
}

#[tokio::test]
async fn test_http_500_without_body_is_transport_error() {
    init_logging();
    let server = StubServer::start(|_| (500, String::new())).await;

    let err = client_for(&server)
        .call(&TestContext::new("http"), "createAccount", json!({}))
        .await
        .unwrap_err();

    assert!(matches!(err, RpcError::Transport { .. }));
    assert!(err.to_string().contains("500"));
    assert_eq!(err.get_code(), -32603);
}

#[tokio::test]
async fn test_mismatched_response_id() {
    init_logging();
    let server = StubServer::start(|_| {
        (200, json!({ "jsonrpc": "2.0", "id": 999, "result": {} }).to_string())
    })
    .await;

    let err = client_for(&server)
        .call(&TestContext::new("http"), "getAccountInfo", json!({}))
        .await
        .unwrap_err();

    assert!(matches!(err, RpcError::MismatchedId { expected: 1, .. }));
}

#[tokio::test]
async fn test_ids_increase_per_call() {
    init_logging();
    let server = StubServer::start(|request| {
        let body = json!({ "jsonrpc": "2.0", "id": request_id(request), "result": null });
        (200, body.to_string())
    })
    .await;
    let client = client_for(&server);
    let ctx = TestContext::new("http");

    for _ in 0..3 {
        client.call(&ctx, "reset", json!({})).await.unwrap();
    }

    let ids: Vec<Value> = server.requests().iter().map(request_id).collect();
    assert_eq!(ids, vec![json!(1), json!(2), json!(3)]);
    assert_eq!(client.last_id(), 3);
}

#[tokio::test]
async fn test_generator_over_http() {
    init_logging();
    let backend = Arc::new(LocalKeyBackend::with_seed(21));
    let server = {
        let backend = backend.clone();
        StubServer::start(move |request| {
            let rpc: RpcRequest = serde_json::from_str(&request.body).unwrap();
            let response: RpcResponse = futures::executor::block_on(backend.send(&rpc)).unwrap();
            (200, serde_json::to_string(&response).unwrap())
        })
        .await
    };
    let generator = KeySpecGenerator::new(Arc::new(client_for(&server)));

    let spec = KeySpec::threshold(1, vec![KeySpec::ed25519(), KeySpec::ecdsa_secp256k1()]);
    let key = generator
        .generate(&TestContext::new("http"), &spec)
        .await
        .unwrap();

    assert_eq!(server.requests().len(), 2);
    assert_eq!(backend.generate_calls(), 2);
    assert_eq!(key.signing_keys.len(), 2);
    assert_eq!(key.tree().unwrap().leaf_count(), 2);
}

#[tokio::test]
async fn test_mirror_rest_client() {
    init_logging();
    let server = StubServer::start(|request| match request.path.as_str() {
        "/api/v1/accounts/0.0.1001" => (
            200,
            json!({
                "account": "0.0.1001",
                "key": { "_type": "ProtobufEncoded", "key": "3200" }
            })
            .to_string(),
        ),
        "/api/v1/topics/0.0.7" => (200, json!({ "topic_id": "0.0.7", "admin_key": null }).to_string()),
        "/api/v1/tokens/0.0.300" => (
            200,
            json!({
                "token_id": "0.0.300",
                "admin_key": null,
                "custom_fees": {
                    "created_timestamp": "1700000000.000000001",
                    "fixed_fees": [{
                        "all_collectors_are_exempt": false,
                        "amount": 25,
                        "collector_account_id": "0.0.5",
                        "denominating_token_id": null
                    }],
                    "fractional_fees": []
                }
            })
            .to_string(),
        ),
        _ => (404, json!({ "_status": { "messages": [{ "message": "Not found" }] } }).to_string()),
    })
    .await;
    let mirror = MirrorRestClient::new(&server.url, Duration::from_secs(5)).unwrap();

    let account = mirror
        .entity_key(&EntityId::Account("0.0.1001".into()))
        .await
        .unwrap()
        .found()
        .flatten()
        .unwrap();
    assert_eq!(
        account.tree().unwrap(),
        KeyTree::List {
            threshold: None,
            keys: vec![]
        }
    );

    assert_eq!(
        mirror
            .entity_key(&EntityId::Topic("0.0.7".into()))
            .await
            .unwrap(),
        MirrorRecord::Found(None)
    );
    assert_eq!(
        mirror
            .entity_key(&EntityId::Contract("0.0.8".into()))
            .await
            .unwrap(),
        MirrorRecord::NotIndexed
    );

    let fees = mirror
        .token_custom_fees("0.0.300")
        .await
        .unwrap()
        .found()
        .unwrap();
    assert!(sdk_tck::fees::fee_schedules_agree(
        &[CustomFee::fixed("0.0.5", 25, None)],
        &fees
    ));
    assert!(server.requests().iter().all(|r| r.method == "GET"));
}

#[tokio::test]
async fn test_mirror_server_error_is_unavailable() {
    init_logging();
    let server = StubServer::start(|_| (503, "{}".to_string())).await;
    let mirror = MirrorRestClient::new(&server.url, Duration::from_secs(5)).unwrap();

    match mirror.token_custom_fees("0.0.300").await.unwrap() {
        MirrorRecord::Unavailable(detail) => assert!(detail.contains("503")),
        other => panic!("expected unavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_mirror_refused_connection_is_unavailable() {
    init_logging();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);
    let mirror = MirrorRestClient::new(&address.to_string(), Duration::from_secs(5)).unwrap();

    assert!(matches!(
        mirror
            .entity_key(&EntityId::Account("0.0.2".into()))
            .await
            .unwrap(),
        MirrorRecord::Unavailable(_)
    ));
}

#[tokio::test]
async fn test_mirror_client_error_is_failure() {
    init_logging();
    let server = StubServer::start(|_| (400, "{}".to_string())).await;
    let mirror = MirrorRestClient::new(&server.url, Duration::from_secs(5)).unwrap();

    let err = mirror.token_custom_fees("0.0.300").await.unwrap_err();
    assert!(err.to_string().contains("400"));
}
