use kura_core::AggregationMode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ExplorerRequest {
    Status,
    Tree,
    Level {
        level: usize,
    },
    Cluster {
        id: String,
        #[serde(default)]
        mode: Option<AggregationMode>,
    },
    Conversations {
        id: String,
    },
}

impl ExplorerRequest {
    /// Everything except `status` needs a built view.
    pub fn needs_view(&self) -> bool {
        !matches!(self, ExplorerRequest::Status)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExplorerResponse {
    pub status: String,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub version: String,
}

impl ExplorerResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            status: "ok".to_string(),
            data: Some(data),
            error: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(msg.into()),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_format() {
        let request: ExplorerRequest =
            serde_json::from_value(json!({"action": "cluster", "id": "7", "mode": "list"})).unwrap();
        assert_eq!(
            request,
            ExplorerRequest::Cluster {
                id: "7".to_string(),
                mode: Some(AggregationMode::List),
            }
        );

        let request: ExplorerRequest =
            serde_json::from_value(json!({"action": "cluster", "id": "7"})).unwrap();
        assert!(matches!(request, ExplorerRequest::Cluster { mode: None, .. }));

        let request: ExplorerRequest = serde_json::from_value(json!({"action": "level", "level": 2})).unwrap();
        assert_eq!(request, ExplorerRequest::Level { level: 2 });
        assert!(request.needs_view());
        assert!(!ExplorerRequest::Status.needs_view());
    }

    #[test]
    fn test_response_shapes() {
        let ok = ExplorerResponse::ok(json!({"n": 1}));
        assert!(ok.is_ok());
        assert!(ok.error.is_none());

        let err = ExplorerResponse::err("boom");
        assert!(!err.is_ok());
        assert_eq!(err.error.as_deref(), Some("boom"));
        assert!(err.data.is_none());
    }
}
