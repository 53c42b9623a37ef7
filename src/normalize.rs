use serde::Deserialize;
use simd_json::OwnedValue;
use simd_json::prelude::*;
use thiserror::Error;

use crate::types::{BotRecord, ParamOrigin, RawParam};
use crate::utils::{preview, warn_once};

/// Why a raw parameter was dropped instead of becoming a record.
#[derive(Debug, Error, PartialEq)]
pub enum DropReason {
    #[error("empty value")]
    EmptyValue,
    #[error("no usable identifier")]
    EmptyIdentifier,
    #[error("object encoding did not map onto a bot record: {0}")]
    MalformedObject(String),
}

/// A record plus the slot it rode in on, so consumed query keys can be
/// stripped from the address bar after the merge.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedParam {
    pub slot: String,
    pub origin: ParamOrigin,
    pub record: BotRecord,
}

/// JSON-object encoding of a bot parameter. The object's own `chatbaseId`
/// doubles as the dedup id; an explicit `id` field is not part of the wire
/// format.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BotParamObject {
    #[serde(default)]
    chatbase_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
    #[serde(default)]
    is_default: Option<bool>,
}

/// Convert one raw parameter into a canonical record.
///
/// A value that parses as a JSON object is the full encoding; anything else
/// (parse failures, JSON scalars, arrays) is the flat encoding where the
/// raw text is the chatbase identifier itself.
pub fn normalize(raw: &RawParam) -> Result<BotRecord, DropReason> {
    if raw.raw_value.is_empty() {
        return Err(DropReason::EmptyValue);
    }

    let mut probe = raw.raw_value.clone().into_bytes();
    match simd_json::from_slice::<OwnedValue>(&mut probe) {
        Ok(value) if value.as_object().is_some() => object_record(raw),
        _ => Ok(BotRecord::from_scalar(&raw.raw_value)),
    }
}

/// Normalize a batch, skipping rejected entries with a warning. One bad
/// parameter never aborts the rest.
pub fn normalize_batch(raws: Vec<RawParam>) -> (Vec<NormalizedParam>, u32) {
    let mut normalized = Vec::with_capacity(raws.len());
    let mut skipped = 0u32;

    for raw in raws {
        match normalize(&raw) {
            Ok(record) => normalized.push(NormalizedParam {
                slot: raw.slot,
                origin: raw.origin,
                record,
            }),
            Err(reason) => {
                skipped += 1;
                warn_once(format!(
                    "⚠️  Skipping bot parameter `{}` ({}): {}",
                    raw.slot,
                    preview(&raw.raw_value, 40),
                    reason
                ));
            }
        }
    }

    (normalized, skipped)
}

fn object_record(raw: &RawParam) -> Result<BotRecord, DropReason> {
    let mut bytes = raw.raw_value.clone().into_bytes();
    let object: BotParamObject = simd_json::from_slice(&mut bytes)
        .map_err(|e| DropReason::MalformedObject(e.to_string()))?;

    // An empty chatbaseId counts as absent (the widget treats it as falsy),
    // so the slot name steps in for both identifiers.
    let id = match object.chatbase_id.filter(|v| !v.is_empty()) {
        Some(chatbase_id) => chatbase_id,
        None if raw.slot.is_empty() => return Err(DropReason::EmptyIdentifier),
        None => raw.slot.clone(),
    };

    Ok(BotRecord {
        id: id.clone(),
        name: object.name,
        description: object.description,
        chatbase_id: id,
        avatar_url: object.avatar_url,
        is_default: object.is_default,
    })
}
