//! Action type DTOs

use serde::{Deserialize, Serialize};

use crate::domain::action::{ActionOwner, ActionType};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListActionTypesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_owner_filter: Option<ActionOwner>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListActionTypesResponse {
    #[serde(default)]
    pub action_types: Vec<ActionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}
