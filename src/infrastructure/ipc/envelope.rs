//! Wire envelopes — `{id,type,payload,timestamp}` requests and
//! `{id,success,error?,data?,processingTimeMs?}` responses (spec.md §6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestFamily {
    State,
    Gap,
    Queue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: String,
    #[serde(rename = "type")]
    pub family: RequestFamily,
    pub payload: serde_json::Value,
    pub timestamp: i64,
}

impl Request {
    pub fn new(id: impl Into<String>, family: RequestFamily, payload: serde_json::Value, timestamp: i64) -> Self {
        Self {
            id: id.into(),
            family,
            payload,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "processingTimeMs")]
    pub processing_time_ms: Option<u64>,
}

impl Response {
    pub fn ok(id: impl Into<String>, data: serde_json::Value, processing_time_ms: u64) -> Self {
        Self {
            id: id.into(),
            success: true,
            error: None,
            data: Some(data),
            processing_time_ms: Some(processing_time_ms),
        }
    }

    pub fn err(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: false,
            error: Some(error.into()),
            data: None,
            processing_time_ms: None,
        }
    }
}
