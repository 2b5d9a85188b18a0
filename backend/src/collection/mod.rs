//! Collection manager - the authoritative ordered set of constants.
//!
//! Insertion order is file order. Physical names are unique. The collection
//! is dirty when its own flag is set (add, delete, load) or when any record
//! reports a modification; a successful save clears both.
//!
//! This is the whole surface an interactive front end needs: it picks merge or
//! replace before [`ConstantCollection::load`], asks for a path before
//! [`ConstantCollection::save`], and checks
//! [`ConstantCollection::has_unsaved_changes`] before quitting.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{CollectionError, CollectionResult};
use crate::logs::{log_info, log_success};
use crate::models::ConstantRecord;

// =============================================================================
// Load mode
// =============================================================================

/// How a loaded file combines with the current collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Update matching keys in place, append new keys.
    #[default]
    Merge,
    /// Discard the current collection and take the file contents.
    Replace,
}

impl LoadMode {
    pub fn from_merge_flag(merge: bool) -> Self {
        if merge {
            Self::Merge
        } else {
            Self::Replace
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Replace => "replace",
        }
    }
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoadMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "merge" => Ok(Self::Merge),
            "replace" => Ok(Self::Replace),
            other => Err(format!("unknown load mode '{}'", other)),
        }
    }
}

/// What a load did to the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSummary {
    pub mode: LoadMode,
    /// Valid records read from the file
    pub loaded: usize,
    /// Records overwritten by an incoming row with the same key
    pub updated: usize,
    /// Records added at the end
    pub appended: usize,
    /// Rows the codec skipped
    pub skipped: usize,
}

// =============================================================================
// Collection
// =============================================================================

/// Ordered, key-unique set of constants with dirty tracking.
#[derive(Debug, Clone, Default)]
pub struct ConstantCollection {
    records: Vec<ConstantRecord>,
    dirty: bool,
}

impl ConstantCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a file into a fresh collection with nothing unsaved.
    ///
    /// Unlike [`load`](Self::load), opening a document is not a change.
    pub fn open<P: AsRef<Path>>(path: P) -> CollectionResult<Self> {
        let mut collection = Self::new();
        collection.load(path, LoadMode::Replace)?;
        for record in &mut collection.records {
            record.mark_clean();
        }
        collection.dirty = false;
        Ok(collection)
    }

    /// Records in collection (file) order.
    pub fn records(&self) -> &[ConstantRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.records.iter().position(|r| r.key() == key)
    }

    pub fn contains(&self, physical_name: &str) -> bool {
        self.position(physical_name).is_some()
    }

    pub fn get(&self, physical_name: &str) -> Option<&ConstantRecord> {
        self.records.iter().find(|r| r.key() == physical_name)
    }

    /// Mutable access for in-place edits. Changes go through the record
    /// mutators, so they show up in [`has_unsaved_changes`](Self::has_unsaved_changes).
    pub fn get_mut(&mut self, physical_name: &str) -> Option<&mut ConstantRecord> {
        self.records.iter_mut().find(|r| r.key() == physical_name)
    }

    /// Append a new record.
    pub fn add(&mut self, record: ConstantRecord) -> CollectionResult<()> {
        if self.contains(record.key()) {
            return Err(CollectionError::DuplicateKey(record.key().to_string()));
        }
        log_info(format!("➕ Added {}", record.key()));
        self.records.push(record);
        self.dirty = true;
        Ok(())
    }

    /// Overwrite the mutable fields of the record with the same key.
    ///
    /// Position is kept; only fields that actually differ mark it modified.
    pub fn update(&mut self, record: &ConstantRecord) -> CollectionResult<()> {
        let existing = self
            .get_mut(record.key())
            .ok_or_else(|| CollectionError::NotFound(record.key().to_string()))?;
        if existing.overwrite_from(record) {
            log_info(format!("✏️  Updated {}", record.key()));
        }
        Ok(())
    }

    /// Remove the record with the same key. Missing keys are ignored.
    pub fn delete(&mut self, record: &ConstantRecord) -> Option<ConstantRecord> {
        self.delete_by_name(record.key())
    }

    /// Remove by physical name. Returns the removed record, if any.
    pub fn delete_by_name(&mut self, physical_name: &str) -> Option<ConstantRecord> {
        let idx = self.position(physical_name)?;
        let removed = self.records.remove(idx);
        self.dirty = true;
        log_info(format!("🗑️  Deleted {}", physical_name));
        Some(removed)
    }

    /// Load a CSV file and combine it with the collection.
    ///
    /// The collection is marked dirty after any successful load. On error the
    /// collection is untouched.
    pub fn load<P: AsRef<Path>>(&mut self, path: P, mode: LoadMode) -> CollectionResult<LoadSummary> {
        let report = codec::load_with_report(path)?;
        let loaded = report.records.len();
        let skipped = report.skipped.len();

        let (updated, appended) = match mode {
            LoadMode::Replace => {
                self.records.clear();
                self.merge(report.records)
            }
            LoadMode::Merge => self.merge(report.records),
        };
        self.dirty = true;

        let summary = LoadSummary {
            mode,
            loaded,
            updated,
            appended,
            skipped,
        };
        log_success(format!(
            "{} import: {} updated, {} appended, {} total",
            mode,
            summary.updated,
            summary.appended,
            self.records.len()
        ));
        Ok(summary)
    }

    fn merge(&mut self, incoming: Vec<ConstantRecord>) -> (usize, usize) {
        let mut index: HashMap<String, usize> = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.key().to_string(), i))
            .collect();

        let (mut updated, mut appended) = (0, 0);
        for record in incoming {
            match index.get(record.key()) {
                Some(&i) => {
                    self.records[i].overwrite_from(&record);
                    updated += 1;
                }
                None => {
                    // A key repeated later in the same file updates this one.
                    index.insert(record.key().to_string(), self.records.len());
                    self.records.push(record);
                    appended += 1;
                }
            }
        }
        (updated, appended)
    }

    /// Write the whole collection. On success every record is marked clean.
    ///
    /// On failure nothing about the dirty state changes.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> CollectionResult<()> {
        codec::save(path, &self.records)?;
        for record in &mut self.records {
            record.mark_clean();
        }
        self.dirty = false;
        Ok(())
    }

    /// Write only the named records, in collection order.
    ///
    /// Exporting is not saving: dirty state is left alone.
    pub fn export<P, S>(&self, path: P, physical_names: &[S]) -> CollectionResult<usize>
    where
        P: AsRef<Path>,
        S: AsRef<str>,
    {
        if let Some(missing) = physical_names
            .iter()
            .map(|s| s.as_ref())
            .find(|name| !self.contains(name))
        {
            return Err(CollectionError::NotFound(missing.to_string()));
        }
        let wanted: HashSet<&str> = physical_names.iter().map(|s| s.as_ref()).collect();

        let selected = self.records.iter().filter(|r| wanted.contains(r.key()));
        Ok(codec::save(path, selected)?)
    }

    /// Own flag set, or any record modified.
    pub fn is_dirty(&self) -> bool {
        self.dirty || self.records.iter().any(ConstantRecord::is_modified)
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.is_dirty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    const HEADER_LINE: &str = "PhysicalName,LogicalName,Value,Unit,Description\n";

    fn rec(name: &str, value: &str) -> ConstantRecord {
        ConstantRecord::with_value(name, value).unwrap()
    }

    fn write_csv(dir: &TempDir, name: &str, rows: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, format!("{}{}", HEADER_LINE, rows)).unwrap();
        path
    }

    fn values(collection: &ConstantCollection) -> Vec<(String, String)> {
        collection
            .records()
            .iter()
            .map(|r| (r.physical_name().to_string(), r.value().to_string()))
            .collect()
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_new_collection_is_clean() {
        let collection = ConstantCollection::new();
        assert!(collection.is_empty());
        assert!(!collection.has_unsaved_changes());
    }

    #[test]
    fn test_add_marks_dirty() {
        let mut collection = ConstantCollection::new();
        collection.add(rec("TEST_ITEM", "1")).unwrap();
        assert_eq!(collection.len(), 1);
        assert!(collection.has_unsaved_changes());
    }

    #[test]
    fn test_add_duplicate_key_fails() {
        let mut collection = ConstantCollection::new();
        collection.add(rec("TEST_ITEM", "1")).unwrap();

        let err = collection.add(rec("TEST_ITEM", "2")).unwrap_err();
        assert!(matches!(err, CollectionError::DuplicateKey(ref k) if k == "TEST_ITEM"));
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.get("TEST_ITEM").unwrap().value(), "1");
    }

    #[test]
    fn test_update_keeps_position_and_flags_changes() {
        let mut collection = ConstantCollection::new();
        collection.add(rec("FIRST", "1")).unwrap();
        collection.add(rec("SECOND", "2")).unwrap();
        collection.add(rec("THIRD", "3")).unwrap();

        let edited = ConstantRecord::new("SECOND", "二", "22", "m", "").unwrap();
        collection.update(&edited).unwrap();

        assert_eq!(
            values(&collection),
            pairs(&[("FIRST", "1"), ("SECOND", "22"), ("THIRD", "3")])
        );
        let second = collection.get("SECOND").unwrap();
        assert_eq!(second.logical_name(), "二");
        assert!(second.is_modified());
        assert!(!collection.get("FIRST").unwrap().is_modified());
    }

    #[test]
    fn test_update_identical_does_not_modify() {
        let dir = tempdir().unwrap();
        let mut collection = ConstantCollection::new();
        collection.add(rec("SAME", "1")).unwrap();
        collection.save(dir.path().join("c.csv")).unwrap();

        collection.update(&rec("SAME", "1")).unwrap();
        assert!(!collection.has_unsaved_changes());
    }

    #[test]
    fn test_update_missing_key_fails() {
        let mut collection = ConstantCollection::new();
        let err = collection.update(&rec("MISSING", "1")).unwrap_err();
        assert!(matches!(err, CollectionError::NotFound(ref k) if k == "MISSING"));
        assert!(collection.is_empty());
    }

    #[test]
    fn test_delete() {
        let dir = tempdir().unwrap();
        let mut collection = ConstantCollection::new();
        collection.add(rec("KEEP", "1")).unwrap();
        collection.add(rec("DROP", "2")).unwrap();
        collection.save(dir.path().join("c.csv")).unwrap();

        assert!(collection.delete(&rec("NOT_THERE", "0")).is_none());
        assert!(!collection.has_unsaved_changes());

        let removed = collection.delete(&rec("DROP", "ignored")).unwrap();
        assert_eq!(removed.value(), "2");
        assert_eq!(collection.len(), 1);
        assert!(collection.has_unsaved_changes());
    }

    #[test]
    fn test_get_mut_edit_is_tracked() {
        let dir = tempdir().unwrap();
        let mut collection = ConstantCollection::new();
        collection.add(rec("EDIT_ME", "1")).unwrap();
        collection.save(dir.path().join("c.csv")).unwrap();

        collection.get_mut("EDIT_ME").unwrap().set_unit("ms");
        assert!(collection.has_unsaved_changes());
    }

    #[test]
    fn test_merge_updates_in_place_and_appends() {
        let dir = tempdir().unwrap();
        let mut collection = ConstantCollection::new();
        collection.add(rec("CONST_001", "100")).unwrap();
        collection.add(rec("CONST_002", "200")).unwrap();

        let path = write_csv(&dir, "merge.csv", "CONST_001,,150,,\nCONST_NEW,,999,,\n");
        let summary = collection.load(&path, LoadMode::Merge).unwrap();

        assert_eq!(
            values(&collection),
            pairs(&[("CONST_001", "150"), ("CONST_002", "200"), ("CONST_NEW", "999")])
        );
        assert_eq!(summary.loaded, 2);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.appended, 1);
        assert!(collection.get("CONST_001").unwrap().is_modified());
    }

    #[test]
    fn test_merge_repeated_key_in_file() {
        let dir = tempdir().unwrap();
        let mut collection = ConstantCollection::new();
        let path = write_csv(&dir, "dup.csv", "DUP,,1,,\nDUP,,2,,\n");
        collection.load(&path, LoadMode::Merge).unwrap();

        assert_eq!(values(&collection), pairs(&[("DUP", "2")]));
    }

    #[test]
    fn test_replace_discards_existing() {
        let dir = tempdir().unwrap();
        let mut collection = ConstantCollection::new();
        collection.add(rec("OLD_ONE", "1")).unwrap();
        collection.add(rec("OLD_TWO", "2")).unwrap();

        let path = write_csv(&dir, "replace.csv", "NEW_ONE,,10,,\nOLD_ONE,,1,,\n");
        let summary = collection.load(&path, LoadMode::Replace).unwrap();

        assert_eq!(values(&collection), pairs(&[("NEW_ONE", "10"), ("OLD_ONE", "1")]));
        assert_eq!(summary.appended, 2);
        assert_eq!(summary.updated, 0);
    }

    #[test]
    fn test_replace_keeps_keys_unique() {
        let dir = tempdir().unwrap();
        let mut collection = ConstantCollection::new();
        let path = write_csv(&dir, "dup.csv", "DUP,,1,,\nOTHER,,5,,\nDUP,,2,,\n");
        let summary = collection.load(&path, LoadMode::Replace).unwrap();

        assert_eq!(values(&collection), pairs(&[("DUP", "2"), ("OTHER", "5")]));
        assert_eq!(summary.appended, 2);
        assert_eq!(summary.updated, 1);
    }

    #[test]
    fn test_open_is_clean() {
        let dir = tempdir().unwrap();
        let path = write_csv(&dir, "open.csv", "A_KEY,,1,,\nB_KEY,,2,,\n");
        let collection = ConstantCollection::open(&path).unwrap();
        assert_eq!(collection.len(), 2);
        assert!(!collection.has_unsaved_changes());
    }

    #[test]
    fn test_replace_with_header_only_file_empties_collection() {
        let dir = tempdir().unwrap();
        let mut collection = ConstantCollection::new();
        collection.add(rec("GONE", "1")).unwrap();

        let path = write_csv(&dir, "empty.csv", "");
        collection.load(&path, LoadMode::Replace).unwrap();
        assert!(collection.is_empty());
        assert!(collection.has_unsaved_changes());
    }

    #[test]
    fn test_load_always_marks_dirty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("same.csv");
        let mut collection = ConstantCollection::new();
        collection.add(rec("SAME", "1")).unwrap();
        collection.save(&path).unwrap();
        assert!(!collection.has_unsaved_changes());

        collection.load(&path, LoadMode::Merge).unwrap();
        assert!(collection.has_unsaved_changes());
        assert!(!collection.get("SAME").unwrap().is_modified());
    }

    #[test]
    fn test_failed_load_leaves_collection_untouched() {
        let dir = tempdir().unwrap();
        let mut collection = ConstantCollection::new();
        collection.add(rec("KEEP", "1")).unwrap();
        collection.save(dir.path().join("ok.csv")).unwrap();

        let bad = dir.path().join("bad.csv");
        std::fs::write(&bad, "Wrong,Header\n").unwrap();
        let err = collection.load(&bad, LoadMode::Replace).unwrap_err();
        assert!(matches!(err, CollectionError::Csv(ref e) if e.is_format()));
        assert_eq!(collection.len(), 1);
        assert!(!collection.has_unsaved_changes());

        let err = collection.load(dir.path().join("missing.csv"), LoadMode::Merge).unwrap_err();
        assert!(matches!(err, CollectionError::Csv(ref e) if e.is_io()));
    }

    #[test]
    fn test_load_counts_skipped_rows() {
        let dir = tempdir().unwrap();
        let mut collection = ConstantCollection::new();
        let path = write_csv(&dir, "lenient.csv", "GOOD,,1,,\nFOUR,,2,\nbad,,3,,\n");
        let summary = collection.load(&path, LoadMode::Replace).unwrap();
        assert_eq!(summary.loaded, 1);
        assert_eq!(summary.skipped, 2);
    }

    #[test]
    fn test_save_clears_dirty_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saved.csv");
        let mut collection = ConstantCollection::new();
        collection.add(rec("A_ONE", "1")).unwrap();
        collection.add(rec("A_TWO", "2")).unwrap();
        collection.get_mut("A_ONE").unwrap().set_value("11");

        collection.save(&path).unwrap();
        assert!(!collection.has_unsaved_changes());
        assert!(collection.records().iter().all(|r| !r.is_modified()));

        let reloaded = codec::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded[0].value(), "11");
    }

    #[test]
    fn test_failed_save_keeps_dirty_state() {
        let dir = tempdir().unwrap();
        let mut collection = ConstantCollection::new();
        collection.add(rec("UNSAVED", "1")).unwrap();
        collection.save(dir.path().join("first.csv")).unwrap();
        collection.get_mut("UNSAVED").unwrap().set_value("2");

        let err = collection
            .save(dir.path().join("missing_dir").join("out.csv"))
            .unwrap_err();
        assert!(matches!(err, CollectionError::Csv(ref e) if e.is_io()));
        assert!(collection.has_unsaved_changes());
        assert!(collection.get("UNSAVED").unwrap().is_modified());
    }

    #[test]
    fn test_export_subset_keeps_dirty_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("export.csv");
        let mut collection = ConstantCollection::new();
        collection.add(rec("ONE", "1")).unwrap();
        collection.add(rec("TWO", "2")).unwrap();
        collection.add(rec("THREE", "3")).unwrap();

        let written = collection.export(&path, &["THREE", "ONE"]).unwrap();
        assert_eq!(written, 2);
        assert!(collection.has_unsaved_changes());

        let names: Vec<_> = codec::load(&path)
            .unwrap()
            .iter()
            .map(|r| r.physical_name().to_string())
            .collect();
        assert_eq!(names, ["ONE", "THREE"]);

        let err = collection.export(&path, &["NOPE"]).unwrap_err();
        assert!(matches!(err, CollectionError::NotFound(_)));
    }

    #[test]
    fn test_export_reports_first_unknown_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("export.csv");
        let mut collection = ConstantCollection::new();
        collection.add(rec("ONE", "1")).unwrap();

        for _ in 0..5 {
            let err = collection
                .export(&path, &["ONE", "ZULU", "ALPHA", "MIKE"])
                .unwrap_err();
            assert!(matches!(err, CollectionError::NotFound(ref name) if name == "ZULU"));
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_load_mode_parsing() {
        assert_eq!("merge".parse::<LoadMode>().unwrap(), LoadMode::Merge);
        assert_eq!(" Replace ".parse::<LoadMode>().unwrap(), LoadMode::Replace);
        assert!("append".parse::<LoadMode>().is_err());
        assert_eq!(LoadMode::from_merge_flag(false), LoadMode::Replace);
        assert_eq!(LoadMode::default(), LoadMode::Merge);
    }
}
