//! Address-bar cleanup after an ingestion pass.

use std::collections::HashSet;

use url::{Url, form_urlencoded};

/// Compute the page URL with the consumed slots stripped from its query
/// string.
///
/// Unrelated segments are kept byte-for-byte (the raw query is filtered, not
/// re-encoded), so their order and escaping survive untouched. Returns `None`
/// when nothing would change, so callers can skip the address-bar write
/// entirely. Removing the last segment drops the `?` as well.
pub fn clean_url(url: &Url, consumed: &HashSet<String>) -> Option<Url> {
    if consumed.is_empty() {
        return None;
    }
    let query = url.query()?;

    let mut kept: Vec<&str> = Vec::new();
    let mut dropped = false;
    for segment in query.split('&') {
        if segment_is_consumed(segment, consumed) {
            dropped = true;
        } else {
            kept.push(segment);
        }
    }
    if !dropped {
        return None;
    }

    let mut cleaned = url.clone();
    if kept.is_empty() {
        cleaned.set_query(None);
    } else {
        cleaned.set_query(Some(&kept.join("&")));
    }
    Some(cleaned)
}

fn segment_is_consumed(segment: &str, consumed: &HashSet<String>) -> bool {
    // Decode the segment's key the same way query_pairs() does, so slots
    // carrying percent escapes or `+` line up with the extracted form.
    match form_urlencoded::parse(segment.as_bytes()).next() {
        Some((key, _)) => consumed.contains(key.as_ref()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consumed(slots: &[&str]) -> HashSet<String> {
        slots.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn strips_only_the_consumed_slots() {
        let url = Url::parse("https://host.test/page?keep=1&bot_1=ABC123&other=2").unwrap();

        let cleaned = clean_url(&url, &consumed(&["bot_1"])).unwrap();

        assert_eq!(cleaned.query(), Some("keep=1&other=2"));
        assert_eq!(cleaned.path(), "/page");
    }

    #[test]
    fn unrelated_segments_survive_byte_for_byte() {
        // `a%2Bb` must not be rewritten to `a+b` while bot_1 is removed.
        let url = Url::parse("https://host.test/p?a%2Bb=1&bot_1=x&empty&flag=#frag").unwrap();

        let cleaned = clean_url(&url, &consumed(&["bot_1"])).unwrap();

        assert_eq!(cleaned.query(), Some("a%2Bb=1&empty&flag="));
        assert_eq!(cleaned.fragment(), Some("frag"));
    }

    #[test]
    fn removing_every_segment_drops_the_question_mark() {
        let url = Url::parse("https://host.test/page?bot_1=a&bot_2=b").unwrap();

        let cleaned = clean_url(&url, &consumed(&["bot_1", "bot_2"])).unwrap();

        assert_eq!(cleaned.query(), None);
        assert_eq!(cleaned.as_str(), "https://host.test/page");
    }

    #[test]
    fn untouched_url_is_a_no_op() {
        let url = Url::parse("https://host.test/page?keep=1").unwrap();

        assert_eq!(clean_url(&url, &consumed(&["bot_1"])), None);
        assert_eq!(clean_url(&url, &HashSet::new()), None);
    }

    #[test]
    fn url_without_a_query_is_a_no_op() {
        let url = Url::parse("https://host.test/page").unwrap();

        assert_eq!(clean_url(&url, &consumed(&["bot_1"])), None);
    }

    #[test]
    fn matches_slots_through_their_encoded_form() {
        // query_pairs() decodes `bot_a+b` to `bot_a b`; the raw filter must
        // agree on that reading.
        let url = Url::parse("https://host.test/p?bot_a+b=1&z=2").unwrap();

        let cleaned = clean_url(&url, &consumed(&["bot_a b"])).unwrap();

        assert_eq!(cleaned.query(), Some("z=2"));
    }

    #[test]
    fn repeated_occurrences_of_a_slot_are_all_removed() {
        let url = Url::parse("https://host.test/p?bot_1=a&k=v&bot_1=b").unwrap();

        let cleaned = clean_url(&url, &consumed(&["bot_1"])).unwrap();

        assert_eq!(cleaned.query(), Some("k=v"));
    }
}
