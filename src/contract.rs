use serde_json::Value;

use crate::error::FetchError;

/// Minimal shape a page expects from its endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contract {
    pub require_ok: bool,
    pub payload_field: &'static str,
}

impl Contract {
    pub const fn with_ok(payload_field: &'static str) -> Self {
        Self {
            require_ok: true,
            payload_field,
        }
    }

    pub const fn field(payload_field: &'static str) -> Self {
        Self {
            require_ok: false,
            payload_field,
        }
    }
}

pub fn validate(contract: Contract, payload: &Value) -> Result<(), FetchError> {
    let Some(obj) = payload.as_object() else {
        return Err(FetchError::contract("payload is not a JSON object"));
    };

    // An explicit ok:false always wins, even on endpoints that omit `ok`.
    match obj.get("ok") {
        Some(Value::Bool(false)) => {
            let message = obj
                .get("error")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or("backend reported ok=false");
            return Err(FetchError::backend(message));
        }
        Some(Value::Bool(true)) => {}
        Some(other) if contract.require_ok => {
            return Err(FetchError::contract(format!(
                "`ok` must be a boolean, got {other}"
            )));
        }
        None if contract.require_ok => {
            return Err(FetchError::contract("missing `ok` flag"));
        }
        _ => {}
    }

    match obj.get(contract.payload_field) {
        None | Some(Value::Null) => Err(FetchError::contract(format!(
            "missing `{}`",
            contract.payload_field
        ))),
        Some(_) => Ok(()),
    }
}
