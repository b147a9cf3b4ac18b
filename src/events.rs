use serde::Serialize;

use crate::models::{EdgeId, NodeId};
use crate::state::{FailureReason, RequestId, RequestType};

/// Lifecycle notifications emitted while a tick runs, in processing order.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum RequestEvent {
    Generated {
        request_id: RequestId,
        request_type: RequestType,
        source: NodeId,
        destination: NodeId,
        size_kb: u32,
    },
    Hopped {
        request_id: RequestId,
        from: NodeId,
        to: NodeId,
        edge: EdgeId,
    },
    Retried {
        request_id: RequestId,
        node: NodeId,
        retry_count: u32,
    },
    Completed {
        request_id: RequestId,
        node: NodeId,
        response_time_ms: u64,
    },
    Failed {
        request_id: RequestId,
        node: NodeId,
        reason: FailureReason,
    },
}

impl RequestEvent {
    pub fn request_id(&self) -> RequestId {
        match self {
            RequestEvent::Generated { request_id, .. }
            | RequestEvent::Hopped { request_id, .. }
            | RequestEvent::Retried { request_id, .. }
            | RequestEvent::Completed { request_id, .. }
            | RequestEvent::Failed { request_id, .. } => *request_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestEvent::Completed { .. } | RequestEvent::Failed { .. }
        )
    }
}
