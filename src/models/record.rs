use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};

/// One observation: a UTC instant plus named numeric-or-missing fields.
///
/// `None` is the explicit missing value; it survives storage round-trips as
/// the `-` marker rather than being silently dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub time: DateTime<Utc>,
    pub values: BTreeMap<String, Option<f64>>,
}

impl Record {
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            time,
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, field: &str, value: Option<f64>) -> Self {
        self.values.insert(field.to_string(), value);
        self
    }

    /// Partition key: calendar year of the UTC timestamp.
    pub fn year(&self) -> i32 {
        self.time.year()
    }
}

/// Split a payload into per-year groups. Partitions are keyed by year and
/// `PartitionStore::merge` expects pre-split input; this is the only place
/// that split happens.
pub fn split_by_year(records: Vec<Record>) -> BTreeMap<i32, Vec<Record>> {
    let mut by_year: BTreeMap<i32, Vec<Record>> = BTreeMap::new();
    for record in records {
        by_year.entry(record.year()).or_default().push(record);
    }
    by_year
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_partition_key_is_utc_year() {
        let record = Record::new(at(2023, 12, 31, 23));
        assert_eq!(record.year(), 2023);
    }

    #[test]
    fn test_split_by_year_groups_multi_year_payload() {
        let records = vec![
            Record::new(at(2023, 12, 31, 23)).with_value("ta", Some(1.5)),
            Record::new(at(2024, 1, 1, 0)).with_value("ta", Some(1.2)),
            Record::new(at(2023, 6, 1, 12)).with_value("ta", Some(18.0)),
        ];

        let by_year = split_by_year(records);
        assert_eq!(by_year.keys().copied().collect::<Vec<_>>(), vec![2023, 2024]);
        assert_eq!(by_year[&2023].len(), 2);
        assert_eq!(by_year[&2024].len(), 1);
    }
}
