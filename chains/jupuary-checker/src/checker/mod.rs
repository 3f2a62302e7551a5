//! Per-account allocation and token-account authority check.

pub mod ata;
pub mod schema;

use crate::account::Account;
use crate::pubkey::Pubkey;
use async_trait::async_trait;
use core_logic::{LineSink, RequestSpec, RetryingClient, Task, Transport};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info};

pub use ata::{associated_token_address, JUP_MINT, JUP_MINT_ID};
pub use schema::{interpret_account_owner, interpret_allocation, Allocation};

pub const DEFAULT_ALLOCATION_URL: &str = "https://jupuary.jup.ag";

const ALLOCATION_REFERER: &str = "https://jupuary.jup.ag/allocation";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36";

/// Result of one [`AllocationChecker::check`].
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    NotEligible,
    /// The token account is still owned by the wallet.
    AuthorityRetained { label: String, amount: f64 },
    /// Owner differs from the wallet, or the token account does not exist.
    AuthorityChanged { label: String, amount: f64 },
}

/// Owner comparison ignores ASCII case.
pub fn classify(owner: &str, address: &Pubkey) -> bool {
    owner.eq_ignore_ascii_case(&address.to_base58())
}

/// `"<label> | <amount> $JUP"`. Amounts use plain decimal notation at any
/// magnitude, never exponent form.
pub fn format_line(label: &str, amount: f64) -> String {
    format!("{} | {} $JUP", label, amount)
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CheckSummary {
    pub retained: u64,
    pub changed: u64,
    pub not_eligible: u64,
}

pub struct AllocationChecker<T> {
    client: RetryingClient<T>,
    allocation_url: String,
    rpc_url: String,
    mint: Pubkey,
    retained_sink: Arc<dyn LineSink>,
    changed_sink: Arc<dyn LineSink>,
    retained: AtomicU64,
    changed: AtomicU64,
    not_eligible: AtomicU64,
}

impl<T: Transport> AllocationChecker<T> {
    pub fn new(
        client: RetryingClient<T>,
        allocation_url: impl Into<String>,
        rpc_url: impl Into<String>,
        retained_sink: Arc<dyn LineSink>,
        changed_sink: Arc<dyn LineSink>,
    ) -> Self {
        Self {
            client,
            allocation_url: allocation_url.into().trim_end_matches('/').to_string(),
            rpc_url: rpc_url.into(),
            mint: JUP_MINT_ID,
            retained_sink,
            changed_sink,
            retained: AtomicU64::new(0),
            changed: AtomicU64::new(0),
            not_eligible: AtomicU64::new(0),
        }
    }

    /// Checks holders of another SPL mint.
    pub fn with_mint(mut self, mint: Pubkey) -> Self {
        self.mint = mint;
        self
    }

    pub fn client(&self) -> &RetryingClient<T> {
        &self.client
    }

    pub fn summary(&self) -> CheckSummary {
        CheckSummary {
            retained: self.retained.load(Ordering::Relaxed),
            changed: self.changed.load(Ordering::Relaxed),
            not_eligible: self.not_eligible.load(Ordering::Relaxed),
        }
    }

    /// Allocated $JUP for `address`. Retries until the API gives a usable answer.
    pub async fn get_allocation(&self, address: &Pubkey) -> f64 {
        let wallet = address.to_base58();
        let request = RequestSpec::get(format!(
            "{}/api/allocation?wallet={}",
            self.allocation_url, wallet
        ))
        .header("accept", "*/*")
        .header("accept-language", "ru,en;q=0.9")
        .header("pragma", "no-cache")
        .header("referer", ALLOCATION_REFERER)
        .header("user-agent", BROWSER_USER_AGENT);

        self.client
            .fetch(&request, &wallet, "Parsing Allocation", |reply| {
                interpret_allocation(&reply.body)
            })
            .await
            .amount()
    }

    /// Owner of `token_account` per `getAccountInfo`, empty if the account
    /// does not exist.
    pub async fn get_account_owner(&self, token_account: &Pubkey, log_prefix: &str) -> String {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getAccountInfo",
            "params": [
                token_account.to_base58(),
                { "encoding": "jsonParsed" }
            ]
        });
        let request = RequestSpec::post_json(&self.rpc_url, &payload).require_success();

        self.client
            .fetch(&request, log_prefix, "Getting Account Info", |reply| {
                interpret_account_owner(&reply.body)
            })
            .await
    }

    pub async fn check(&self, account: &Account) -> CheckOutcome {
        let address = account.address();
        let prefix = address.to_base58();

        let amount = self.get_allocation(address).await;
        if amount <= 0.0 {
            info!("{} | Not Eligible", prefix);
            self.not_eligible.fetch_add(1, Ordering::Relaxed);
            return CheckOutcome::NotEligible;
        }

        // No off-curve bump counts as a missing token account.
        let owner = match associated_token_address(address, &self.mint) {
            Some(ata) => self.get_account_owner(&ata, &prefix).await,
            None => {
                error!("{} | No off-curve token account address found", prefix);
                String::new()
            }
        };

        let label = account.display_label();
        let line = format_line(&label, amount);

        if classify(&owner, address) {
            info!("{} | Total Allocation: {} $JUP | Not Changed Authority", prefix, amount);
            self.retained.fetch_add(1, Ordering::Relaxed);
            if let Err(e) = self.retained_sink.append(&line).await {
                error!("{} | {}", prefix, e);
            }
            CheckOutcome::AuthorityRetained { label, amount }
        } else {
            info!("{} | Total Allocation: {} $JUP | Changed Authority", prefix, amount);
            self.changed.fetch_add(1, Ordering::Relaxed);
            if let Err(e) = self.changed_sink.append(&line).await {
                error!("{} | {}", prefix, e);
            }
            CheckOutcome::AuthorityChanged { label, amount }
        }
    }
}

#[async_trait]
impl<T: Transport + 'static> Task<Account> for AllocationChecker<T> {
    fn name(&self) -> &str {
        "jupuary_allocation"
    }

    async fn run(&self, account: Account) {
        self.check(&account).await;
    }
}
