use std::collections::HashSet;

use crate::types::BotRecord;

/// Result of reconciling one incoming batch against the registry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    /// The updated registry. Existing records keep their positions; new
    /// ones are appended in batch order.
    pub bots: Vec<BotRecord>,
    /// Final state of every record touched this batch, unique by id.
    pub applied: Vec<BotRecord>,
    /// Ids that were not in the registry before this batch.
    pub added: u32,
    /// Ids that already existed and were overwritten.
    pub replaced: u32,
}

/// Merge a batch of normalized records into an existing registry.
///
/// Dedup key is `id`: a colliding record fully replaces the existing one in
/// its original position (newest ingestion wins); a new id is appended.
/// Records merge one at a time, so a later entry for the same id (query
/// over cookie, say) wins without any special casing. Pure: persistence is
/// the caller's problem.
pub fn merge(existing: Vec<BotRecord>, incoming: &[BotRecord]) -> MergeOutcome {
    let original_ids: HashSet<String> = existing.iter().map(|bot| bot.id.clone()).collect();

    let mut bots = existing;
    let mut applied: Vec<BotRecord> = Vec::with_capacity(incoming.len());

    for record in incoming {
        match bots.iter().position(|bot| bot.id == record.id) {
            Some(index) => bots[index] = record.clone(),
            None => bots.push(record.clone()),
        }
        match applied.iter().position(|bot| bot.id == record.id) {
            Some(index) => applied[index] = record.clone(),
            None => applied.push(record.clone()),
        }
    }

    let added = applied
        .iter()
        .filter(|record| !original_ids.contains(&record.id))
        .count() as u32;
    let replaced = applied.len() as u32 - added;

    MergeOutcome {
        bots,
        applied,
        added,
        replaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bot(id: &str) -> BotRecord {
        BotRecord::from_scalar(id)
    }

    fn named_bot(id: &str, name: &str) -> BotRecord {
        BotRecord {
            name: Some(name.to_string()),
            ..BotRecord::from_scalar(id)
        }
    }

    #[test]
    fn new_ids_append_in_batch_order() {
        let outcome = merge(vec![bot("A")], &[bot("B"), bot("C")]);

        let ids: Vec<&str> = outcome.bots.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, ["A", "B", "C"]);
        assert_eq!(outcome.added, 2);
        assert_eq!(outcome.replaced, 0);
    }

    #[test]
    fn colliding_id_replaces_in_place_without_growing() {
        let existing = vec![named_bot("A", "old A"), bot("B")];
        let outcome = merge(existing, &[named_bot("A", "new A")]);

        assert_eq!(outcome.bots.len(), 2);
        assert_eq!(outcome.bots[0].id, "A");
        // Fields are fully replaced, not patched.
        assert_eq!(outcome.bots[0].name.as_deref(), Some("new A"));
        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.replaced, 1);
    }

    #[test]
    fn later_batch_entry_wins_for_the_same_id() {
        // Cookie entry first, query entry second, same identifier.
        let incoming = [named_bot("X", "from cookie"), named_bot("X", "from query")];
        let outcome = merge(Vec::new(), &incoming);

        assert_eq!(outcome.bots.len(), 1);
        assert_eq!(outcome.bots[0].name.as_deref(), Some("from query"));
        assert_eq!(outcome.applied.len(), 1);
        assert_eq!(outcome.applied[0].name.as_deref(), Some("from query"));
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.replaced, 0);
    }

    #[test]
    fn merging_twice_is_idempotent_on_length() {
        let incoming = [bot("A"), bot("B")];

        let first = merge(Vec::new(), &incoming);
        let second = merge(first.bots.clone(), &incoming);

        assert_eq!(first.bots.len(), 2);
        assert_eq!(second.bots.len(), 2);
        assert_eq!(second.added, 0);
        assert_eq!(second.replaced, 2);
        assert_eq!(first.bots, second.bots);
    }

    #[test]
    fn empty_batch_leaves_the_registry_alone() {
        let existing = vec![bot("A")];
        let outcome = merge(existing.clone(), &[]);

        assert_eq!(outcome.bots, existing);
        assert!(outcome.applied.is_empty());
        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.replaced, 0);
    }
}
