//! Date-indexed value series for one security or exchange rate.

use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Values keyed by date, unique per date and kept in ascending date order.
#[derive(Debug, Clone, PartialEq)]
pub struct History<T> {
    dates: Vec<NaiveDate>,
    values: Vec<T>,
}

impl<T> Default for History<T> {
    fn default() -> Self {
        History {
            dates: Vec::new(),
            values: Vec::new(),
        }
    }
}

impl<T: Clone> History<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` at `date`, replacing any value already stored for that date.
    pub fn append(&mut self, date: NaiveDate, value: T) {
        match self.dates.last() {
            Some(last) if *last < date => {
                self.dates.push(date);
                self.values.push(value);
            }
            None => {
                self.dates.push(date);
                self.values.push(value);
            }
            Some(_) => match self.dates.binary_search(&date) {
                Ok(i) => self.values[i] = value,
                Err(i) => {
                    self.dates.insert(i, date);
                    self.values.insert(i, value);
                }
            },
        }
    }

    /// Exact lookup.
    pub fn get(&self, date: NaiveDate) -> Option<&T> {
        self.dates
            .binary_search(&date)
            .ok()
            .map(|i| &self.values[i])
    }

    /// Value at the latest date on or before `date`.
    pub fn value_as_of(&self, date: NaiveDate) -> Option<&T> {
        self.entry_as_of(date).map(|(_, v)| v)
    }

    /// Like [`History::value_as_of`] but also returns the date the value was recorded on.
    pub fn entry_as_of(&self, date: NaiveDate) -> Option<(NaiveDate, &T)> {
        let idx = self.dates.partition_point(|d| *d <= date);
        if idx == 0 {
            return None;
        }
        Some((self.dates[idx - 1], &self.values[idx - 1]))
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &T)> {
        self.dates.iter().copied().zip(self.values.iter())
    }

    /// A new series with every value transformed by `f`.
    pub fn map<U: Clone>(&self, f: impl Fn(&T) -> U) -> History<U> {
        History {
            dates: self.dates.clone(),
            values: self.values.iter().map(f).collect(),
        }
    }
}

impl<T: Clone> FromIterator<(NaiveDate, T)> for History<T> {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, T)>>(iter: I) -> Self {
        let mut history = History::new();
        for (date, value) in iter {
            history.append(date, value);
        }
        history
    }
}

/// Sorted union of the distinct dates recorded across `series`.
pub fn merged_dates<T>(series: &[&History<T>]) -> Vec<NaiveDate> {
    let unique: BTreeSet<NaiveDate> = series
        .iter()
        .flat_map(|h| h.dates.iter().copied())
        .collect();
    unique.into_iter().collect()
}
