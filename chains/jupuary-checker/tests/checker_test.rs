use async_trait::async_trait;
use core_logic::{
    HttpReply, LineSink, Method, NetworkError, ProxyConfig, ProxyRotator, RequestSpec,
    RetryPolicy, RetryingClient, SinkError, Transport, WorkerRunner,
};
use ed25519_dalek::SigningKey;
use jupuary_checker::{resolve, Account, AllocationChecker, CheckOutcome, CheckSummary, Pubkey};
use serde_json::Value;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
const ADDRESS: &str = "HAgk14JpMQLgt6rVgv7cBQFJWFto5Dqxi472uT3DKpqk";
const ADDRESS_JUP_ATA: &str = "8qHzu5xguCX6ZzyrL9mG7zbpTyWZyYnbPfzVFQB99rKS";
const RPC_URL: &str = "http://rpc.test";
const ALLOCATION_URL: &str = "http://allocation.test/";

/// Serves allocation (GET) and RPC (POST) replies from separate queues,
/// falling back to a fixed reply once a queue runs dry.
struct ScriptedTransport {
    allocation: Mutex<VecDeque<Result<HttpReply, NetworkError>>>,
    rpc: Mutex<VecDeque<Result<HttpReply, NetworkError>>>,
    allocation_fallback: Option<HttpReply>,
    rpc_fallback: Option<HttpReply>,
    requests: Mutex<Vec<RequestSpec>>,
}

impl ScriptedTransport {
    fn new(
        allocation: Vec<Result<HttpReply, NetworkError>>,
        rpc: Vec<Result<HttpReply, NetworkError>>,
    ) -> Self {
        Self {
            allocation: Mutex::new(allocation.into()),
            rpc: Mutex::new(rpc.into()),
            allocation_fallback: None,
            rpc_fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn with_fallbacks(mut self, allocation: HttpReply, rpc: HttpReply) -> Self {
        self.allocation_fallback = Some(allocation);
        self.rpc_fallback = Some(rpc);
        self
    }

    fn requests(&self, method: Method) -> Vec<RequestSpec> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(
        &self,
        request: &RequestSpec,
        _proxy: Option<&ProxyConfig>,
    ) -> Result<HttpReply, NetworkError> {
        self.requests.lock().unwrap().push(request.clone());
        let (queue, fallback) = match request.method {
            Method::Get => (&self.allocation, &self.allocation_fallback),
            Method::Post => (&self.rpc, &self.rpc_fallback),
        };
        let next = queue.lock().unwrap().pop_front();
        match (next, fallback) {
            (Some(reply), _) => reply,
            (None, Some(reply)) => Ok(reply.clone()),
            (None, None) => panic!("unscripted {:?} to {}", request.method, request.url),
        }
    }
}

#[derive(Default)]
struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

#[async_trait]
impl LineSink for MemorySink {
    async fn append(&self, line: &str) -> Result<(), SinkError> {
        self.lines.lock().unwrap().push(line.to_string());
        Ok(())
    }
}

struct BrokenSink;

#[async_trait]
impl LineSink for BrokenSink {
    async fn append(&self, _line: &str) -> Result<(), SinkError> {
        Err(SinkError::Append {
            path: "broken.txt".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }
}

struct Harness {
    transport: Arc<ScriptedTransport>,
    retained: Arc<MemorySink>,
    changed: Arc<MemorySink>,
    checker: Arc<AllocationChecker<Arc<ScriptedTransport>>>,
}

fn harness(transport: ScriptedTransport) -> Harness {
    let transport = Arc::new(transport);
    let retained = Arc::new(MemorySink::default());
    let changed = Arc::new(MemorySink::default());
    let client = RetryingClient::new(
        Arc::clone(&transport),
        Arc::new(ProxyRotator::direct()),
        RetryPolicy::default(),
    );
    let checker = Arc::new(AllocationChecker::new(
        client,
        ALLOCATION_URL,
        RPC_URL,
        retained.clone(),
        changed.clone(),
    ));
    Harness {
        transport,
        retained,
        changed,
        checker,
    }
}

fn reply(status: u16, body: &str) -> HttpReply {
    HttpReply {
        status,
        body: body.to_string(),
    }
}

fn ok(body: &str) -> Result<HttpReply, NetworkError> {
    Ok(reply(200, body))
}

fn allocation(amount: &str) -> Result<HttpReply, NetworkError> {
    ok(&format!(
        r#"{{"status":"success","data":{{"total_allocated":{}}}}}"#,
        amount
    ))
}

fn owner_body(owner: &str) -> String {
    format!(
        r#"{{"jsonrpc":"2.0","id":1,"result":{{"context":{{"slot":1}},"value":{{"data":{{"parsed":{{"info":{{"owner":"{}"}},"type":"account"}},"program":"spl-token"}}}}}}}}"#,
        owner
    )
}

fn address_account() -> Account {
    resolve(ADDRESS).unwrap()
}

#[tokio::test]
async fn test_null_data_is_not_eligible() {
    let h = harness(ScriptedTransport::new(
        vec![ok(r#"{"status":"success","data":null}"#)],
        vec![],
    ));

    let outcome = h.checker.check(&address_account()).await;

    assert_eq!(outcome, CheckOutcome::NotEligible);
    assert!(h.transport.requests(Method::Post).is_empty());
    assert!(h.retained.lines().is_empty());
    assert!(h.changed.lines().is_empty());
}

#[tokio::test]
async fn test_zero_and_null_totals_are_not_eligible() {
    for body in ["0", "null"] {
        let h = harness(ScriptedTransport::new(vec![allocation(body)], vec![]));
        assert_eq!(h.checker.check(&address_account()).await, CheckOutcome::NotEligible);
        assert!(h.retained.lines().is_empty());
        assert!(h.changed.lines().is_empty());
    }
}

#[tokio::test]
async fn test_error_status_with_null_data_is_retried() {
    let h = harness(ScriptedTransport::new(
        vec![ok(r#"{"status":"error","data":null}"#), allocation("500")],
        vec![ok(&owner_body(ADDRESS))],
    ));

    let outcome = h.checker.check(&address_account()).await;

    assert_eq!(
        outcome,
        CheckOutcome::AuthorityRetained {
            label: ADDRESS.to_string(),
            amount: 500.0
        }
    );
    assert_eq!(h.transport.requests(Method::Get).len(), 2);
    assert_eq!(h.checker.client().failed_attempts(), 1);
}

#[tokio::test]
async fn test_allocation_status_code_is_not_checked() {
    let h = harness(ScriptedTransport::new(
        vec![Ok(reply(403, r#"{"status":"success","data":{"total_allocated":7}}"#))],
        vec![ok(&owner_body(ADDRESS))],
    ));

    let outcome = h.checker.check(&address_account()).await;
    assert!(matches!(outcome, CheckOutcome::AuthorityRetained { amount, .. } if amount == 7.0));
}

#[tokio::test]
async fn test_retained_owner_writes_retained_sink() {
    let h = harness(ScriptedTransport::new(
        vec![allocation("1234.5")],
        vec![ok(&owner_body(ADDRESS))],
    ));

    h.checker.check(&address_account()).await;

    assert_eq!(h.retained.lines(), vec![format!("{} | 1234.5 $JUP", ADDRESS)]);
    assert!(h.changed.lines().is_empty());
    assert_eq!(
        h.checker.summary(),
        CheckSummary {
            retained: 1,
            changed: 0,
            not_eligible: 0
        }
    );
}

#[tokio::test]
async fn test_owner_comparison_ignores_case() {
    for owner in [ADDRESS.to_lowercase(), ADDRESS.to_uppercase()] {
        let h = harness(ScriptedTransport::new(
            vec![allocation("10")],
            vec![ok(&owner_body(&owner))],
        ));
        let outcome = h.checker.check(&address_account()).await;
        assert!(matches!(outcome, CheckOutcome::AuthorityRetained { .. }), "{}", owner);
    }
}

#[tokio::test]
async fn test_foreign_owner_writes_changed_sink() {
    let h = harness(ScriptedTransport::new(
        vec![allocation("42")],
        vec![ok(&owner_body("9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM"))],
    ));

    let outcome = h.checker.check(&address_account()).await;

    assert!(matches!(outcome, CheckOutcome::AuthorityChanged { .. }));
    assert_eq!(h.changed.lines(), vec![format!("{} | 42 $JUP", ADDRESS)]);
    assert!(h.retained.lines().is_empty());
}

#[tokio::test]
async fn test_missing_token_account_counts_as_changed() {
    let h = harness(ScriptedTransport::new(
        vec![allocation("42")],
        vec![ok(r#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":1},"value":null}}"#)],
    ));

    let outcome = h.checker.check(&address_account()).await;

    assert!(matches!(outcome, CheckOutcome::AuthorityChanged { .. }));
    assert_eq!(h.changed.lines().len(), 1);
}

#[tokio::test]
async fn test_rpc_failures_are_retried() {
    let h = harness(ScriptedTransport::new(
        vec![allocation("3")],
        vec![
            Ok(reply(429, "Too Many Requests")),
            ok(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32005,"message":"Node is behind"}}"#),
            Err(NetworkError::Transport {
                endpoint: RPC_URL.to_string(),
                reason: "timed out".to_string(),
            }),
            ok(&owner_body(ADDRESS)),
        ],
    ));

    let outcome = h.checker.check(&address_account()).await;

    assert!(matches!(outcome, CheckOutcome::AuthorityRetained { .. }));
    assert_eq!(h.transport.requests(Method::Post).len(), 4);
    assert_eq!(h.checker.client().failed_attempts(), 3);
}

#[tokio::test]
async fn test_request_shapes() {
    let h = harness(ScriptedTransport::new(
        vec![allocation("1")],
        vec![ok(&owner_body(ADDRESS))],
    ));

    h.checker.check(&address_account()).await;

    let get = &h.transport.requests(Method::Get)[0];
    assert_eq!(
        get.url,
        format!("http://allocation.test/api/allocation?wallet={}", ADDRESS)
    );
    assert!(!get.require_success);
    assert!(get
        .headers
        .iter()
        .any(|(k, v)| k == "referer" && v == "https://jupuary.jup.ag/allocation"));

    let post = &h.transport.requests(Method::Post)[0];
    assert_eq!(post.url, RPC_URL);
    assert!(post.require_success);
    let body: Value = serde_json::from_slice(post.body.as_ref().unwrap()).unwrap();
    assert_eq!(body["method"], "getAccountInfo");
    assert_eq!(body["params"][0], ADDRESS_JUP_ATA);
    assert_eq!(body["params"][1]["encoding"], "jsonParsed");
}

#[tokio::test]
async fn test_mnemonic_account_is_labelled_by_mnemonic() {
    let h = harness(ScriptedTransport::new(
        vec![allocation("2")],
        vec![ok(&owner_body(ADDRESS))],
    ));

    h.checker.check(&resolve(ABANDON).unwrap()).await;

    assert_eq!(h.retained.lines(), vec![format!("{} | 2 $JUP", ABANDON)]);
}

#[tokio::test]
async fn test_sink_failure_does_not_abort_check() {
    let transport = Arc::new(ScriptedTransport::new(
        vec![allocation("5")],
        vec![ok(&owner_body(ADDRESS))],
    ));
    let client = RetryingClient::new(
        Arc::clone(&transport),
        Arc::new(ProxyRotator::direct()),
        RetryPolicy::default(),
    );
    let checker = AllocationChecker::new(
        client,
        ALLOCATION_URL,
        RPC_URL,
        Arc::new(BrokenSink),
        Arc::new(BrokenSink),
    );

    let outcome = checker.check(&address_account()).await;
    assert!(matches!(outcome, CheckOutcome::AuthorityRetained { .. }));
}

#[tokio::test]
async fn test_runner_checks_every_account_once() {
    let accounts: Vec<Account> = (1..=12u8)
        .map(|i| {
            let key = SigningKey::from_bytes(&[i; 32]);
            let address = Pubkey::new(key.verifying_key().to_bytes());
            Account::from_address(&address.to_base58()).unwrap()
        })
        .collect();

    let h = harness(ScriptedTransport::new(vec![], vec![]).with_fallbacks(
        reply(200, r#"{"status":"success","data":{"total_allocated":1}}"#),
        reply(200, &owner_body("9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM")),
    ));

    let stats = WorkerRunner::run(
        Arc::clone(&h.checker),
        accounts.clone(),
        NonZeroUsize::new(4).unwrap(),
        CancellationToken::new(),
    )
    .await;

    assert_eq!(stats.completed, 12);
    assert_eq!(stats.skipped, 0);
    assert_eq!(h.checker.summary().changed, 12);

    let mut written = h.changed.lines();
    written.sort();
    let mut expected: Vec<String> = accounts
        .iter()
        .map(|a| format!("{} | 1 $JUP", a.address()))
        .collect();
    expected.sort();
    assert_eq!(written, expected);
}
