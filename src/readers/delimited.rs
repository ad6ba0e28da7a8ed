//! Normalizer for delimiter-separated observation payloads, the wire shape
//! shared by the meteodata-style feeds: one header row, a formatted time
//! column, optionally a station column when one file carries several
//! stations, and numeric parameter columns with sentinel missing values.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use zip::ZipArchive;

use crate::error::{HarvestError, Result};
use crate::models::Record;
use crate::sources::Normalizer;

#[derive(Debug, Clone)]
pub struct DelimitedNormalizer {
    delimiter: u8,
    time_column: String,
    time_format: String,
    station_column: Option<String>,
    default_station: Option<String>,
    fields: Option<Vec<String>>,
    missing_markers: Vec<String>,
    zipped: bool,
}

impl DelimitedNormalizer {
    pub fn new(time_column: &str, time_format: &str) -> Self {
        Self {
            delimiter: b';',
            time_column: time_column.to_string(),
            time_format: time_format.to_string(),
            station_column: None,
            default_station: None,
            fields: None,
            missing_markers: vec!["-".to_string(), "-999".to_string()],
            zipped: false,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Column whose value names the station a row belongs to.
    pub fn with_station_column(mut self, column: &str) -> Self {
        self.station_column = Some(column.to_string());
        self
    }

    /// Station id assigned to every row of a single-station payload.
    pub fn with_default_station(mut self, station: &str) -> Self {
        self.default_station = Some(station.to_string());
        self
    }

    /// Restrict output to these parameter columns; all other columns are
    /// dropped.
    pub fn with_fields(mut self, fields: &[String]) -> Self {
        if !fields.is_empty() {
            self.fields = Some(fields.to_vec());
        }
        self
    }

    pub fn with_missing_markers(mut self, markers: &[String]) -> Self {
        self.missing_markers = markers.to_vec();
        self
    }

    /// Payload is a zip container holding a single delimited member.
    pub fn with_zipped(mut self, zipped: bool) -> Self {
        self.zipped = zipped;
        self
    }

    fn decode(&self, raw: &[u8]) -> Result<String> {
        let bytes: Vec<u8> = if self.zipped {
            let mut archive = ZipArchive::new(Cursor::new(raw))?;
            let mut member_index = None;
            for index in 0..archive.len() {
                if archive.by_index(index)?.is_file() {
                    member_index = Some(index);
                    break;
                }
            }
            let member_index = member_index.ok_or_else(|| {
                HarvestError::Parse("zipped payload has no file member".to_string())
            })?;
            let mut member = archive.by_index(member_index)?;
            let mut buffer = Vec::new();
            member.read_to_end(&mut buffer)?;
            buffer
        } else {
            raw.to_vec()
        };

        match String::from_utf8(bytes) {
            Ok(text) => Ok(text),
            Err(err) => {
                // Station name columns in the older feeds are WINDOWS-1252.
                let (text, _, _) = encoding_rs::WINDOWS_1252.decode(err.as_bytes());
                Ok(text.into_owned())
            }
        }
    }

    fn parse_time(&self, cell: &str) -> Result<chrono::DateTime<chrono::Utc>> {
        match NaiveDateTime::parse_from_str(cell, &self.time_format) {
            Ok(datetime) => Ok(datetime.and_utc()),
            Err(err) => {
                // Hour-resolution feeds carry no minute component, which
                // chrono refuses to default.
                if self.time_format.contains("%H") && !self.time_format.contains("%M") {
                    let format = format!("{}%M", self.time_format);
                    let padded = format!("{cell}00");
                    if let Ok(datetime) = NaiveDateTime::parse_from_str(&padded, &format) {
                        return Ok(datetime.and_utc());
                    }
                }
                // Date-only formats carry no clock component at all.
                if let Ok(date) = NaiveDate::parse_from_str(cell, &self.time_format) {
                    return Ok(date.and_hms_opt(0, 0, 0).unwrap().and_utc());
                }
                Err(err.into())
            }
        }
    }

    fn is_missing(&self, cell: &str) -> bool {
        cell.is_empty()
            || cell.eq_ignore_ascii_case("nan")
            || self.missing_markers.iter().any(|m| m == cell)
    }

    fn wants_field(&self, column: &str) -> bool {
        match &self.fields {
            Some(fields) => fields.iter().any(|f| f == column),
            None => true,
        }
    }
}

impl Normalizer for DelimitedNormalizer {
    fn normalize(&self, raw: &[u8]) -> Result<BTreeMap<String, Vec<Record>>> {
        let text = self.decode(raw)?;
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let time_index = headers
            .iter()
            .position(|h| h == self.time_column)
            .ok_or_else(|| {
                HarvestError::Parse(format!("payload has no '{}' column", self.time_column))
            })?;
        let station_index = match &self.station_column {
            Some(column) => Some(headers.iter().position(|h| h == column.as_str()).ok_or_else(
                || HarvestError::Parse(format!("payload has no '{}' column", column)),
            )?),
            None => None,
        };

        let mut by_station: BTreeMap<String, Vec<Record>> = BTreeMap::new();
        for row in reader.records() {
            let row = row?;
            let time_cell = row.get(time_index).unwrap_or_default();
            if time_cell.is_empty() {
                continue;
            }
            let time = self.parse_time(time_cell)?;

            let station = match station_index {
                Some(index) => row
                    .get(index)
                    .filter(|cell| !cell.is_empty())
                    .ok_or_else(|| {
                        HarvestError::Parse(format!("row at {} has no station", time_cell))
                    })?
                    .to_string(),
                None => self
                    .default_station
                    .clone()
                    .ok_or_else(|| {
                        HarvestError::Parse(
                            "no station column configured and no default station set".to_string(),
                        )
                    })?,
            };

            let mut record = Record::new(time);
            for (index, column) in headers.iter().enumerate() {
                if index == time_index || Some(index) == station_index {
                    continue;
                }
                if !self.wants_field(column) {
                    continue;
                }
                let cell = row.get(index).unwrap_or_default().trim();
                let value = if self.is_missing(cell) {
                    None
                } else {
                    // Non-numeric free-text columns normalize to missing.
                    cell.parse::<f64>().ok()
                };
                record.values.insert(column.to_string(), value);
            }
            by_station.entry(station).or_default().push(record);
        }

        for records in by_station.values_mut() {
            records.sort_by_key(|r| r.time);
        }
        Ok(by_station)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_multi_station_payload_splits_by_station_column() {
        let payload = b"Station/Location;Date;ta;rh\nGVE;2024030112;3.5;81\nPUY;2024030112;5.1;-\nGVE;2024030113;3.9;80\n";
        let normalizer = DelimitedNormalizer::new("Date", "%Y%m%d%H")
            .with_station_column("Station/Location");

        let by_station = normalizer.normalize(payload).unwrap();
        assert_eq!(by_station.len(), 2);
        assert_eq!(by_station["GVE"].len(), 2);
        assert_eq!(by_station["PUY"].len(), 1);
        assert_eq!(by_station["PUY"][0].values["ta"], Some(5.1));
        assert_eq!(by_station["PUY"][0].values["rh"], None);
    }

    #[test]
    fn test_single_station_payload_uses_default_station() {
        let payload = b"MESS_DATUM;TT_10;RF_10\n202403011200;3.5;81\n";
        let normalizer = DelimitedNormalizer::new("MESS_DATUM", "%Y%m%d%H%M")
            .with_default_station("2559");

        let by_station = normalizer.normalize(payload).unwrap();
        assert_eq!(by_station.len(), 1);
        let records = &by_station["2559"];
        assert_eq!(
            records[0].time,
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_sentinel_values_become_missing() {
        let payload = b"MESS_DATUM;RWS_10\n202403011200;-999\n202403011210;0.4\n";
        let normalizer = DelimitedNormalizer::new("MESS_DATUM", "%Y%m%d%H%M")
            .with_default_station("2559");

        let by_station = normalizer.normalize(payload).unwrap();
        let records = &by_station["2559"];
        assert_eq!(records[0].values["RWS_10"], None);
        assert_eq!(records[1].values["RWS_10"], Some(0.4));
    }

    #[test]
    fn test_field_selection_drops_other_columns() {
        let payload = b"MESS_DATUM;QN;TT_10;RF_10\n202403011200;3;3.5;81\n";
        let normalizer = DelimitedNormalizer::new("MESS_DATUM", "%Y%m%d%H%M")
            .with_default_station("2559")
            .with_fields(&["TT_10".to_string()]);

        let by_station = normalizer.normalize(payload).unwrap();
        let record = &by_station["2559"][0];
        assert_eq!(record.values.len(), 1);
        assert_eq!(record.values["TT_10"], Some(3.5));
    }

    #[test]
    fn test_zipped_payload_unwraps_single_member() {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            writer
                .start_file(
                    "produkt_zehn_min_tu_2559.txt",
                    zip::write::FileOptions::default(),
                )
                .unwrap();
            writer
                .write_all(b"MESS_DATUM;TT_10\n202403011200;3.5\n")
                .unwrap();
            writer.finish().unwrap();
        }

        let normalizer = DelimitedNormalizer::new("MESS_DATUM", "%Y%m%d%H%M")
            .with_default_station("2559")
            .with_zipped(true);

        let by_station = normalizer.normalize(buffer.get_ref()).unwrap();
        assert_eq!(by_station["2559"][0].values["TT_10"], Some(3.5));
    }

    #[test]
    fn test_missing_time_column_is_a_parse_error() {
        let payload = b"ta;rh\n3.5;81\n";
        let normalizer = DelimitedNormalizer::new("Date", "%Y%m%d%H").with_default_station("x");

        assert!(matches!(
            normalizer.normalize(payload),
            Err(HarvestError::Parse(_))
        ));
    }

    #[test]
    fn test_rows_sorted_by_time_per_station() {
        let payload = b"Date;ta\n2024030113;2.0\n2024030112;1.0\n";
        let normalizer = DelimitedNormalizer::new("Date", "%Y%m%d%H").with_default_station("GVE");

        let by_station = normalizer.normalize(payload).unwrap();
        let records = &by_station["GVE"];
        assert!(records[0].time < records[1].time);
    }
}
