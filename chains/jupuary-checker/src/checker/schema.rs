//! Typed shapes of the allocation API and `getAccountInfo` replies.
//!
//! Each `interpret_*` function either returns a terminal answer or a
//! [`NetworkError`] that sends the request back into the retry loop.

use core_logic::NetworkError;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Distinguishes an absent key (`None`) from an explicit `null` (`Some(None)`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
struct AllocationEnvelope {
    #[serde(default, deserialize_with = "present")]
    status: Option<Option<Value>>,
    #[serde(default, deserialize_with = "present")]
    data: Option<Option<Value>>,
}

#[derive(Debug, Deserialize)]
struct AllocationData {
    #[serde(default, deserialize_with = "present")]
    total_allocated: Option<Option<f64>>,
}

/// Terminal answers of the allocation endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Allocation {
    /// `status: "success"` with `data: null`.
    NoData,
    /// `data.total_allocated`, with `null` read as zero.
    Amount(f64),
}

impl Allocation {
    pub fn amount(&self) -> f64 {
        match self {
            Allocation::NoData => 0.0,
            Allocation::Amount(v) => *v,
        }
    }
}

fn malformed_json(e: serde_json::Error, body: &str) -> NetworkError {
    NetworkError::MalformedJson {
        reason: e.to_string(),
        body: body.to_string(),
    }
}

fn wrong_shape(body: &str) -> NetworkError {
    NetworkError::UnexpectedShape {
        body: body.to_string(),
    }
}

/// Only a `"success"` status may short-circuit on `data: null`; every other
/// status still needs a well-formed data object.
pub fn interpret_allocation(body: &str) -> Result<Allocation, NetworkError> {
    let envelope: AllocationEnvelope =
        serde_json::from_str(body).map_err(|e| malformed_json(e, body))?;

    let (Some(status), Some(data)) = (envelope.status, envelope.data) else {
        return Err(wrong_shape(body));
    };

    let is_success = matches!(&status, Some(Value::String(s)) if s == "success");

    match data {
        None if is_success => Ok(Allocation::NoData),
        Some(data @ Value::Object(_)) => {
            let parsed: AllocationData =
                serde_json::from_value(data).map_err(|_| wrong_shape(body))?;
            match parsed.total_allocated {
                Some(Some(v)) => Ok(Allocation::Amount(v)),
                Some(None) => Ok(Allocation::Amount(0.0)),
                None => Err(wrong_shape(body)),
            }
        }
        _ => Err(wrong_shape(body)),
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<RpcResult>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RpcResult {
    value: Option<AccountValue>,
}

#[derive(Debug, Deserialize)]
struct AccountValue {
    data: Option<AccountData>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AccountData {
    Parsed { parsed: ParsedAccount },
    // ["<base64>", "base64"] when the RPC cannot parse the account
    Raw(Value),
}

#[derive(Debug, Deserialize)]
struct ParsedAccount {
    info: Option<ParsedInfo>,
}

#[derive(Debug, Deserialize)]
struct ParsedInfo {
    #[serde(default)]
    owner: String,
}

/// Extracts `result.value.data.parsed.info.owner`.
///
/// An RPC `error` object is retried; a missing account is the empty owner.
pub fn interpret_account_owner(body: &str) -> Result<String, NetworkError> {
    let response: RpcResponse = serde_json::from_str(body).map_err(|e| malformed_json(e, body))?;

    if response.error.is_some() {
        return Err(wrong_shape(body));
    }

    let owner = response
        .result
        .and_then(|result| result.value)
        .and_then(|value| value.data)
        .and_then(|data| match data {
            AccountData::Parsed { parsed } => parsed.info,
            AccountData::Raw(_) => None,
        })
        .map(|info| info.owner)
        .unwrap_or_default();

    Ok(owner)
}
