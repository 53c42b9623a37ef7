use percent_encoding::percent_decode_str;
use simd_json::OwnedValue;
use simd_json::prelude::*;
use thiserror::Error;
use url::Url;

use crate::types::{ParamOrigin, RawParam};
use crate::utils::warn_once;

/// Cookie that carries a JSON bag of bot parameters between page loads.
pub const PARAMS_COOKIE: &str = "chatbase_query_params";

/// Slot naming convention for bot parameters: `bot_` plus a non-empty
/// suffix, numbered (`bot_1`) or descriptive (`bot_support`).
pub fn is_bot_slot(key: &str) -> bool {
    key.strip_prefix("bot_").is_some_and(|rest| !rest.is_empty())
}

#[derive(Debug, Error, PartialEq)]
pub enum CookieBagError {
    #[error("cookie value is not valid percent-encoded UTF-8")]
    BadEncoding,
    #[error("cookie value is not valid JSON: {0}")]
    MalformedJson(String),
    #[error("cookie JSON is not an object")]
    NotAnObject,
}

/// Pull every candidate parameter off the page, cookie-sourced entries
/// first so that query-sourced entries win later last-writer merges.
///
/// A broken cookie is worth a warning but never an error: the pass
/// continues with whatever the query string offers.
pub fn extract(url: &Url, raw_cookies: Option<&str>) -> Vec<RawParam> {
    let mut params = match cookie_bag_params(raw_cookies) {
        Ok(cookie_params) => cookie_params,
        Err(err) => {
            warn_once(format!("⚠️  Ignoring bot parameter cookie: {err}"));
            Vec::new()
        }
    };
    params.extend(query_params(url));
    params
}

/// Query-string extraction. Values arrive percent-decoded by the URL layer;
/// keys outside the slot convention are not candidates and stay untouched
/// in the address bar.
pub fn query_params(url: &Url) -> Vec<RawParam> {
    url.query_pairs()
        .filter(|(key, _)| is_bot_slot(key))
        .map(|(key, value)| RawParam::new(key, value, ParamOrigin::Query))
        .collect()
}

/// Cookie extraction with an explicit result at the parse boundary.
///
/// An absent cookie, an absent bag, or an empty value all yield an empty
/// batch; only a bag that exists but cannot be interpreted is an error.
pub fn cookie_bag_params(raw_cookies: Option<&str>) -> Result<Vec<RawParam>, CookieBagError> {
    let Some(raw) = raw_cookies else {
        return Ok(Vec::new());
    };
    let Some(encoded) = find_cookie_value(raw, PARAMS_COOKIE) else {
        return Ok(Vec::new());
    };
    if encoded.is_empty() {
        return Ok(Vec::new());
    }

    let decoded = percent_decode_str(encoded)
        .decode_utf8()
        .map_err(|_| CookieBagError::BadEncoding)?;

    let mut bytes = decoded.as_bytes().to_vec();
    let bag = simd_json::from_slice::<OwnedValue>(&mut bytes)
        .map_err(|e| CookieBagError::MalformedJson(e.to_string()))?;

    let Some(entries) = bag.as_object() else {
        return Err(CookieBagError::NotAnObject);
    };

    let mut params: Vec<RawParam> = entries
        .iter()
        .map(|(slot, value)| {
            let raw_value = match value.as_str() {
                Some(text) => text.to_string(),
                // A bag written by hand may hold the object encoding
                // unquoted; carry it forward as its JSON text.
                None => simd_json::to_string(value).unwrap_or_default(),
            };
            RawParam::new(slot.to_string(), raw_value, ParamOrigin::Cookie)
        })
        .collect();

    // The JSON object parser does not keep key order; sort by slot so
    // append order downstream is stable across runs.
    params.sort_by(|a, b| a.slot.cmp(&b.slot));
    Ok(params)
}

/// Locate one cookie's value inside a raw `document.cookie` style string.
fn find_cookie_value<'a>(raw_cookies: &'a str, name: &str) -> Option<&'a str> {
    raw_cookies.split(';').find_map(|pair| {
        let mut parts = pair.trim().splitn(2, '=');
        let key = parts.next()?.trim();
        let value = parts.next()?;
        (key == name).then_some(value)
    })
}
