use kura_core::session::SessionStatus;
use kura_core::{
    ClusterDetails, ClusterTreeNode, ConversationInfo, ExplorerSession, FlatClusterNode, KuraError,
    SessionError,
};
use serde::Serialize;

use crate::protocol::{ExplorerRequest, ExplorerResponse};

/// Typed answer to a request, before it is rendered as text or JSON.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Reply<'a> {
    Status(SessionStatus),
    Tree(&'a ClusterTreeNode),
    Level {
        level: usize,
        clusters: Vec<&'a FlatClusterNode>,
    },
    Cluster(ClusterDetails<'a>),
    Conversations {
        cluster_id: String,
        conversations: Vec<&'a ConversationInfo>,
    },
}

/// Answer a request against the session, visualising first if needed.
pub fn dispatch(request: ExplorerRequest, session: &mut ExplorerSession) -> Result<Reply<'_>, KuraError> {
    tracing::debug!("Handling request: {:?}", request);

    if request.needs_view() && session.view().is_none() {
        session.visualize()?;
    }

    match request {
        ExplorerRequest::Status => Ok(Reply::Status(session.status())),
        ExplorerRequest::Tree => {
            let view = session.view().ok_or(SessionError::NoView)?;
            Ok(Reply::Tree(view.tree()))
        }
        ExplorerRequest::Level { level } => {
            let view = session.view().ok_or(SessionError::NoView)?;
            Ok(Reply::Level {
                level,
                clusters: view.clusters_at_level(level),
            })
        }
        ExplorerRequest::Cluster { id, mode } => {
            let mode = mode.unwrap_or(session.config().aggregation_mode);
            let details = session.select_with_mode(&id, mode)?;
            Ok(Reply::Cluster(details))
        }
        ExplorerRequest::Conversations { id } => {
            let details = session.select(&id)?;
            Ok(Reply::Conversations {
                cluster_id: id,
                conversations: details.conversations,
            })
        }
    }
}

/// Dispatch and wrap the outcome in the JSON envelope.
pub fn handle_request(request: ExplorerRequest, session: &mut ExplorerSession) -> ExplorerResponse {
    match dispatch(request, session) {
        Ok(reply) => match serde_json::to_value(&reply) {
            Ok(data) => ExplorerResponse::ok(data),
            Err(e) => ExplorerResponse::err(format!("Serialization error: {}", e)),
        },
        Err(e) => {
            tracing::warn!("Request failed: {}", e);
            ExplorerResponse::err(e.to_string())
        }
    }
}
