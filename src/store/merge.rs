//! Timestamp-keyed merge utilities shared by the partition store and the
//! per-station feed joins.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::models::Record;

/// Last-write-wins union of two record sequences keyed by timestamp.
///
/// An incoming record replaces the whole stored row for its timestamp, so a
/// feed can correct previously ingested values. Output is ascending and
/// unique by timestamp.
pub fn merge_last_wins(existing: Vec<Record>, incoming: &[Record]) -> Vec<Record> {
    let mut by_time: BTreeMap<DateTime<Utc>, Record> = BTreeMap::new();
    for record in existing {
        by_time.insert(record.time, record);
    }
    for record in incoming {
        by_time.insert(record.time, record.clone());
    }
    by_time.into_values().collect()
}

/// Outer-join several field-disjoint series on exact timestamps: one row per
/// timestamp carrying the union of fields. A later series wins if two series
/// carry the same field for the same timestamp.
pub fn join_by_time(series: Vec<Vec<Record>>) -> Vec<Record> {
    let mut by_time: BTreeMap<DateTime<Utc>, Record> = BTreeMap::new();
    for records in series {
        for record in records {
            match by_time.entry(record.time) {
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
                Entry::Occupied(mut slot) => {
                    slot.get_mut().values.extend(record.values);
                }
            }
        }
    }
    by_time.into_values().collect()
}
