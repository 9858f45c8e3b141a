use serde::{Deserialize, Serialize};

/// Request body for bulk block/unblock/delete. An absent list deserializes
/// as empty and is rejected by the handlers' id check, keeping the error in
/// the standard envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkIdsRequest {
    #[serde(default)]
    pub user_ids: Vec<i64>,
}

/// Response for bulk actions.
#[derive(Debug, Serialize)]
pub struct BulkActionResponse {
    pub message: String,
}
