use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Where a raw parameter was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamOrigin {
    Query,
    Cookie,
}

/// One unparsed parameter as pulled from the page, before any interpretation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawParam {
    pub slot: String,
    pub raw_value: String,
    pub origin: ParamOrigin,
}

impl RawParam {
    pub fn new(slot: impl Into<String>, raw_value: impl Into<String>, origin: ParamOrigin) -> Self {
        Self {
            slot: slot.into(),
            raw_value: raw_value.into(),
            origin,
        }
    }
}

/// The unparsed slot → value mapping from the most recent extraction.
/// Kept around so a pass can be replayed without re-reading the page.
pub type ParamBag = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub chatbase_id: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_default: Option<bool>,
}

impl BotRecord {
    /// Record for the flat scalar encoding: the value is both the dedup id
    /// and the chatbase identifier, everything else defaults downstream.
    pub fn from_scalar(value: &str) -> Self {
        Self {
            id: value.to_string(),
            name: None,
            description: None,
            chatbase_id: value.to_string(),
            avatar_url: None,
            is_default: None,
        }
    }
}

/// Summary of one ingestion pass, printed by the CLI and returned to hosts.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// Records actually applied this pass, in merge order.
    pub merged: Vec<BotRecord>,
    pub added: u32,
    pub replaced: u32,
    /// Raw parameters dropped during normalization.
    pub skipped: u32,
    /// Query slots removed from the address bar.
    pub consumed_slots: Vec<String>,
    /// Rewritten address-bar URL, present only when a rewrite happened.
    pub cleaned_url: Option<String>,
}
