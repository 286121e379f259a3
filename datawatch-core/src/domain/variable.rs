//! Path variables
//!
//! Named integer counters substituted into path patterns. Each variable
//! carries its own increment, which drives recurrence: after a trigger fires,
//! every variable is advanced to describe the next window.
//!
//! `YEAR`, `MONTH`, `DAY` and `HOUR` are reserved. They are always present on
//! an armed trigger and advance together as one calendar timestamp, so that
//! incrementing `DAY` past the end of a month rolls into `MONTH` and `YEAR`.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, TimeDelta, Timelike, Utc};
use serde::{Deserialize, Serialize};

pub const YEAR: &str = "YEAR";
pub const MONTH: &str = "MONTH";
pub const DAY: &str = "DAY";
pub const HOUR: &str = "HOUR";

/// Reserved calendar variables, in rollover order
pub const CALENDAR_VARIABLES: [&str; 4] = [YEAR, MONTH, DAY, HOUR];

/// A single path variable
///
/// Serialized as a `[value, increment]` pair. String-encoded integers are
/// accepted on input since older persisted definitions stored them that way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "[PairComponent; 2]", into = "[i64; 2]")]
pub struct Variable {
    pub value: i64,
    pub increment: i64,
}

impl Variable {
    pub fn new(value: i64, increment: i64) -> Self {
        Self { value, increment }
    }

    /// A variable that never moves
    pub fn fixed(value: i64) -> Self {
        Self::new(value, 0)
    }

    /// Adds the increment to the value
    pub fn advance(&mut self) {
        self.value = self.value.saturating_add(self.increment);
    }
}

impl From<Variable> for [i64; 2] {
    fn from(var: Variable) -> Self {
        [var.value, var.increment]
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PairComponent {
    Int(i64),
    Text(String),
}

impl PairComponent {
    fn into_int(self) -> Result<i64, String> {
        match self {
            PairComponent::Int(n) => Ok(n),
            PairComponent::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| format!("'{}' is not an integer", s)),
        }
    }
}

impl TryFrom<[PairComponent; 2]> for Variable {
    type Error = String;

    fn try_from([value, increment]: [PairComponent; 2]) -> Result<Self, Self::Error> {
        Ok(Self::new(value.into_int()?, increment.into_int()?))
    }
}

/// Named set of path variables with deterministic iteration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableSet {
    vars: BTreeMap<String, Variable>,
}

impl VariableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, var: Variable) -> Option<Variable> {
        self.vars.insert(name.into(), var)
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, var: Variable) -> Self {
        self.insert(name, var);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.vars.get(name)
    }

    /// Current value of a variable, if declared
    pub fn value(&self, name: &str) -> Option<i64> {
        self.vars.get(name).map(|v| v.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Declares any missing calendar variable from `now` with increment 0
    pub fn fill_calendar_defaults(&mut self, now: DateTime<Utc>) {
        let defaults = [
            (YEAR, i64::from(now.year())),
            (MONTH, i64::from(now.month())),
            (DAY, i64::from(now.day())),
            (HOUR, i64::from(now.hour())),
        ];
        for (name, value) in defaults {
            self.vars
                .entry(name.to_string())
                .or_insert_with(|| Variable::fixed(value));
        }
    }

    /// Moves every variable forward to the next window
    ///
    /// Calendar variables are dispatched by name and advanced as a single
    /// timestamp (years, then months, then days, then hours). All other
    /// variables take a flat increment. When the calendar fields do not form
    /// a usable date, they fall back to flat increments as well.
    pub fn advance(&mut self) {
        let mut shift = CalendarShift::default();
        for (name, var) in self.vars.iter_mut() {
            match name.as_str() {
                YEAR => shift.years = var.increment,
                MONTH => shift.months = var.increment,
                DAY => shift.days = var.increment,
                HOUR => shift.hours = var.increment,
                _ => var.advance(),
            }
        }

        match self.calendar_time().and_then(|t| shift.apply(t)) {
            Some(next) => {
                self.set_value(YEAR, i64::from(next.year()));
                self.set_value(MONTH, i64::from(next.month()));
                self.set_value(DAY, i64::from(next.day()));
                self.set_value(HOUR, i64::from(next.hour()));
            }
            None => {
                for name in CALENDAR_VARIABLES {
                    if let Some(var) = self.vars.get_mut(name) {
                        var.advance();
                    }
                }
            }
        }
    }

    fn set_value(&mut self, name: &str, value: i64) {
        if let Some(var) = self.vars.get_mut(name) {
            var.value = value;
        }
    }

    /// The timestamp described by the calendar variables, day clamped to the
    /// length of the month
    fn calendar_time(&self) -> Option<NaiveDateTime> {
        let year = i32::try_from(self.value(YEAR)?).ok()?;
        let month = u32::try_from(self.value(MONTH)?).ok()?;
        let day = u32::try_from(self.value(DAY)?).ok()?;
        let hour = u32::try_from(self.value(HOUR)?).ok()?;

        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let last_day = first.checked_add_months(Months::new(1))?.pred_opt()?.day();
        first
            .with_day(day.clamp(1, last_day))?
            .and_hms_opt(hour, 0, 0)
    }
}

impl<K: Into<String>> FromIterator<(K, Variable)> for VariableSet {
    fn from_iter<I: IntoIterator<Item = (K, Variable)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[derive(Debug, Default)]
struct CalendarShift {
    years: i64,
    months: i64,
    days: i64,
    hours: i64,
}

impl CalendarShift {
    fn apply(&self, start: NaiveDateTime) -> Option<NaiveDateTime> {
        let total_months = self.years.checked_mul(12)?.checked_add(self.months)?;
        let months = Months::new(u32::try_from(total_months.unsigned_abs()).ok()?);
        let shifted = if total_months >= 0 {
            start.checked_add_months(months)?
        } else {
            start.checked_sub_months(months)?
        };
        shifted
            .checked_add_signed(TimeDelta::try_days(self.days)?)?
            .checked_add_signed(TimeDelta::try_hours(self.hours)?)
    }
}
