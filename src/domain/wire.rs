//! Serializable descriptions handed to the client runtime on arrival.

use serde::Serialize;

use super::phase::{PageletPhase, PhaseCallbacks, ResourcePhase};
use super::types::{PageletId, Priority, ResourceId};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ResourceWire<'a> {
    pub id: &'a ResourceId,
    pub source: &'a str,
    pub phase_callbacks: &'a PhaseCallbacks<ResourcePhase>,
}

/// Resources grouped by kind; both groups are always present.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ResourcesWire<'a> {
    pub stylesheet: Vec<ResourceWire<'a>>,
    pub javascript: Vec<ResourceWire<'a>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct PageletWire<'a> {
    pub id: &'a PageletId,
    pub priority: Priority,
    pub resources: ResourcesWire<'a>,
    pub inline_scripts: &'a [String],
    pub phase_callbacks: &'a PhaseCallbacks<PageletPhase>,
    /// Only serialized on the final fragment of a render pass.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_last: bool,
}
