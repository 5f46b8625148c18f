//! Storage backend implementations.
//!
//! Concrete implementations of [`crate::domain::repositories::UrlStorage`].
//!
//! # Backends
//!
//! - [`MemoryUrlStorage`] - Process memory, lost on restart
//! - [`FileUrlStorage`] - Append-only JSON-lines journal replayed on startup
//! - [`PgUrlStorage`] - PostgreSQL table with a unique short identifier column

pub mod file_storage;
pub mod memory_storage;
pub mod pg_pool;
pub mod pg_storage;

pub use file_storage::FileUrlStorage;
pub use memory_storage::MemoryUrlStorage;
pub use pg_pool::{PgSettings, connect_pool};
pub use pg_storage::PgUrlStorage;

use crate::domain::entities::UrlRecord;
use std::collections::HashMap;

/// How a record relates to what is already stored under its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placement {
    New,
    Identical,
    Conflict,
}

pub(crate) fn place(index: &HashMap<String, UrlRecord>, record: &UrlRecord) -> Placement {
    match index.get(&record.id) {
        None => Placement::New,
        Some(existing) if existing.is_identical(record) => Placement::Identical,
        Some(_) => Placement::Conflict,
    }
}

/// Records of a batch split into those to insert and conflicting identifiers.
///
/// Later items are checked against earlier items of the same batch, so a
/// repeated URL in one batch is stored once.
pub(crate) struct BatchPlan {
    pub inserts: Vec<UrlRecord>,
    pub conflicts: Vec<String>,
}

pub(crate) fn plan_batch(index: &HashMap<String, UrlRecord>, records: Vec<UrlRecord>) -> BatchPlan {
    let mut staged: HashMap<String, usize> = HashMap::new();
    let mut inserts: Vec<UrlRecord> = Vec::new();
    let mut conflicts = Vec::new();

    for record in records {
        let placement = match staged.get(&record.id) {
            Some(&pos) if inserts[pos].is_identical(&record) => Placement::Identical,
            Some(_) => Placement::Conflict,
            None => place(index, &record),
        };

        match placement {
            Placement::New => {
                staged.insert(record.id.clone(), inserts.len());
                inserts.push(record);
            }
            Placement::Identical => {}
            Placement::Conflict => {
                if !conflicts.contains(&record.id) {
                    conflicts.push(record.id);
                }
            }
        }
    }

    BatchPlan { inserts, conflicts }
}

/// Returns deleted copies of the live records in `ids` owned by `owner_id`.
pub(crate) fn plan_deletion(
    index: &HashMap<String, UrlRecord>,
    owner_id: &str,
    ids: &[String],
) -> Vec<UrlRecord> {
    let mut updates: Vec<UrlRecord> = Vec::new();

    for id in ids {
        if let Some(record) = index.get(id)
            && record.is_owned_by(owner_id)
            && !record.deleted
            && !updates.iter().any(|u| &u.id == id)
        {
            let mut deleted = record.clone();
            deleted.deleted = true;
            updates.push(deleted);
        }
    }

    updates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, url: &str, owner: &str) -> UrlRecord {
        UrlRecord::new(id.to_string(), url.to_string(), owner.to_string())
    }

    fn index_of(records: &[UrlRecord]) -> HashMap<String, UrlRecord> {
        records.iter().map(|r| (r.id.clone(), r.clone())).collect()
    }

    #[test]
    fn test_place() {
        let index = index_of(&[record("aaaa0000", "https://a.io", "u1")]);

        assert_eq!(place(&index, &record("bbbb0000", "https://b.io", "u1")), Placement::New);
        assert_eq!(
            place(&index, &record("aaaa0000", "https://a.io", "u1")),
            Placement::Identical
        );
        assert_eq!(
            place(&index, &record("aaaa0000", "https://x.io", "u1")),
            Placement::Conflict
        );
        assert_eq!(
            place(&index, &record("aaaa0000", "https://a.io", "u2")),
            Placement::Conflict
        );
    }

    #[test]
    fn test_plan_batch_with_conflict_in_middle() {
        let index = index_of(&[record("bbbb0000", "https://old.io", "u1")]);

        let plan = plan_batch(
            &index,
            vec![
                record("aaaa0000", "https://a.io", "u1"),
                record("bbbb0000", "https://b.io", "u1"),
                record("cccc0000", "https://c.io", "u1"),
            ],
        );

        let inserted: Vec<_> = plan.inserts.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(inserted, vec!["aaaa0000", "cccc0000"]);
        assert_eq!(plan.conflicts, vec!["bbbb0000".to_string()]);
    }

    #[test]
    fn test_plan_batch_deduplicates_within_batch() {
        let plan = plan_batch(
            &HashMap::new(),
            vec![
                record("aaaa0000", "https://a.io", "u1"),
                record("aaaa0000", "https://a.io", "u1"),
                record("aaaa0000", "https://collide.io", "u1"),
            ],
        );

        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(plan.conflicts, vec!["aaaa0000".to_string()]);
    }

    #[test]
    fn test_plan_deletion_scoped_to_owner() {
        let mut already = record("cccc0000", "https://c.io", "u1");
        already.deleted = true;
        let index = index_of(&[
            record("aaaa0000", "https://a.io", "u1"),
            record("bbbb0000", "https://b.io", "u2"),
            already,
        ]);

        let ids = vec![
            "aaaa0000".to_string(),
            "aaaa0000".to_string(),
            "bbbb0000".to_string(),
            "cccc0000".to_string(),
            "dddd0000".to_string(),
        ];
        let updates = plan_deletion(&index, "u1", &ids);

        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].id, "aaaa0000");
        assert!(updates[0].deleted);
    }
}
