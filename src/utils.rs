use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

static WARNED_MESSAGES: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();

/// Print a warning to stderr at most once per process. A bad cookie would
/// otherwise repeat the same line on every ingestion pass.
pub fn warn_once(message: impl Into<String>) {
    let message = message.into();
    let cache = WARNED_MESSAGES.get_or_init(|| Mutex::new(HashSet::new()));

    if let Ok(mut warned) = cache.lock()
        && warned.insert(message.clone())
    {
        eprintln!("{message}");
    }
}

/// Shorten a raw value for warning output so a pathological parameter does
/// not flood stderr.
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}
