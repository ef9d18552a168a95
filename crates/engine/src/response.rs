//! JSON envelope for every request outcome

use serde::{Deserialize, Serialize};
use serde_json::Value;
use symbridge_core::{SafeDeleteOutcome, UsageReport};

use crate::error::{BridgeError, BridgeResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Ok,
    /// A refactoring stopped after Phase 1; the result explains why
    Blocked,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeResponse {
    pub status: ResponseStatus,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub retryable: bool,
}

impl BridgeResponse {
    pub fn ok<T: Serialize>(result: &T) -> Self {
        match serde_json::to_value(result) {
            Ok(Value::Null) => Self {
                status: ResponseStatus::Ok,
                code: "ok".to_string(),
                message: Some("not applicable to this element".to_string()),
                result: Some(Value::Null),
                retryable: false,
            },
            Ok(value) => Self {
                status: ResponseStatus::Ok,
                code: "ok".to_string(),
                message: None,
                result: Some(value),
                retryable: false,
            },
            Err(err) => Self::error(&BridgeError::Internal(format!(
                "failed to serialize result: {err}"
            ))),
        }
    }

    pub fn error(err: &BridgeError) -> Self {
        Self {
            status: ResponseStatus::Error,
            code: err.code().to_string(),
            message: Some(err.to_string()),
            result: None,
            retryable: err.is_retryable(),
        }
    }

    pub fn blocked(report: &UsageReport) -> Self {
        Self {
            status: ResponseStatus::Blocked,
            code: "refactoring-conflict".to_string(),
            message: Some(format!(
                "{} usage(s) found; pass force to delete anyway",
                report.usage_count
            )),
            result: serde_json::to_value(report).ok(),
            retryable: false,
        }
    }

    pub fn from_result<T: Serialize>(result: BridgeResult<T>) -> Self {
        match result {
            Ok(value) => Self::ok(&value),
            Err(err) => Self::error(&err),
        }
    }

    pub fn from_safe_delete(result: BridgeResult<SafeDeleteOutcome>) -> Self {
        match result {
            Ok(SafeDeleteOutcome::Deleted(outcome)) => Self::ok(&outcome),
            Ok(SafeDeleteOutcome::Blocked(report)) => Self::blocked(&report),
            Err(err) => Self::error(&err),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_response() {
        let response = BridgeResponse::from_result::<()>(Err(BridgeError::IndexNotReady));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["code"], "index-not-ready");
        assert_eq!(value["retryable"], true);
    }

    #[test]
    fn test_not_applicable_is_ok() {
        let response = BridgeResponse::from_result::<Option<u32>>(Ok(None));
        assert!(response.is_ok());
        assert_eq!(response.result, Some(Value::Null));
        assert!(response.message.is_some());
    }

    #[test]
    fn test_blocked_response_carries_report() {
        let report = UsageReport {
            can_delete: false,
            usage_count: 2,
            blocking_usages: Vec::new(),
        };
        let response = BridgeResponse::from_safe_delete(Ok(SafeDeleteOutcome::Blocked(report)));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "blocked");
        assert_eq!(value["code"], "refactoring-conflict");
        assert_eq!(value["result"]["usage_count"], json!(2));
        assert!(value.get("retryable").is_none());
    }
}
