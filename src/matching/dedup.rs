//! Calendar-day deduplication.
//!
//! Neighbouring windows often all match the same formation. Matches are
//! collapsed so that at most one record survives per calendar day. Which
//! wall-clock day a timestamp falls on is decided by a caller-supplied
//! [`DayBoundary`], never by an implicit local timezone.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

use chrono::{Duration, FixedOffset, NaiveDate, NaiveDateTime};

use crate::{MatchError, Result};

/// Anything anchored at a point in time.
pub trait Timestamped {
    fn anchor(&self) -> NaiveDateTime;
}

impl Timestamped for NaiveDateTime {
    #[inline]
    fn anchor(&self) -> NaiveDateTime {
        *self
    }
}

impl<T: Timestamped> Timestamped for &T {
    #[inline]
    fn anchor(&self) -> NaiveDateTime {
        (**self).anchor()
    }
}

impl Timestamped for super::Window<'_> {
    #[inline]
    fn anchor(&self) -> NaiveDateTime {
        self.start
    }
}

/// Where one calendar day ends and the next begins.
///
/// Series timestamps are naive; the boundary shifts them by a fixed UTC
/// offset before the date is taken. The default (offset 0) groups by the
/// naive date as stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayBoundary {
    utc_offset_minutes: i32,
}

impl DayBoundary {
    /// Group by the naive date of each timestamp.
    pub const fn naive() -> Self {
        Self {
            utc_offset_minutes: 0,
        }
    }

    /// Group by the date seen at a fixed offset east of UTC.
    pub fn with_offset_minutes(minutes: i32) -> Result<Self> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or(MatchError::OutOfRange {
                field: "utc_offset_minutes",
                value: minutes as f64,
                min: -1439.0,
                max: 1439.0,
            })?;
        Ok(Self {
            utc_offset_minutes: minutes,
        })
    }

    #[inline]
    pub fn offset_minutes(self) -> i32 {
        self.utc_offset_minutes
    }

    /// Calendar day `ts` belongs to under this boundary. Timestamps at the
    /// edge of the representable range keep their naive date.
    #[inline]
    pub fn day_of(self, ts: NaiveDateTime) -> NaiveDate {
        ts.checked_add_signed(Duration::minutes(self.utc_offset_minutes as i64))
            .unwrap_or(ts)
            .date()
    }
}

impl serde::Serialize for DayBoundary {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.offset_minutes().serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for DayBoundary {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let minutes = i32::deserialize(d)?;
        DayBoundary::with_offset_minutes(minutes).map_err(serde::de::Error::custom)
    }
}

/// Keep, for every distinct key, only the record with the earliest
/// timestamp (the first one in input order on ties). Survivors keep their
/// input order.
pub fn dedup_by_key<T, K, F>(records: Vec<T>, key: F) -> Vec<T>
where
    T: Timestamped,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    if records.is_empty() {
        return records;
    }

    let mut earliest: HashMap<K, usize> = HashMap::new();
    for (i, record) in records.iter().enumerate() {
        match earliest.entry(key(record)) {
            Entry::Vacant(slot) => {
                slot.insert(i);
            }
            Entry::Occupied(mut slot) => {
                if record.anchor() < records[*slot.get()].anchor() {
                    slot.insert(i);
                }
            }
        }
    }

    let mut keep = vec![false; records.len()];
    for &i in earliest.values() {
        keep[i] = true;
    }

    records
        .into_iter()
        .zip(keep)
        .filter_map(|(record, kept)| kept.then_some(record))
        .collect()
}

/// Drop every record that shares a calendar day with an earlier one.
///
/// Intended for records of a single scale; mixing scales would let one
/// scale's match shadow another's.
pub fn purge_date_repeats<T: Timestamped>(records: Vec<T>, boundary: DayBoundary) -> Vec<T> {
    let before = records.len();
    let kept = dedup_by_key(records, |r| boundary.day_of(r.anchor()));
    if kept.len() != before {
        log::trace!("purged {} same-day repeats", before - kept.len());
    }
    kept
}
