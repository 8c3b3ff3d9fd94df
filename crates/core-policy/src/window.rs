//! Maintenance window policy
//!
//! The window is stored as a cron expression in the minute-resolution 5-field
//! grammar: minute, hour, day-of-month, month, day-of-week. An empty cron
//! means the window is unset (anytime).

use crate::error::{PolicyError, Result};
use crate::policy::PolicyType;
use croner::Cron;
use serde::{Deserialize, Serialize};

/// Number of fields in a window cron expression
pub const WINDOW_CRON_FIELDS: usize = 5;

/// Whether the window allows or denies changes; stored as an integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum WindowType {
    Allow,
    Deny,
    #[default]
    Unknown,
}

impl From<WindowType> for i64 {
    fn from(value: WindowType) -> Self {
        match value {
            WindowType::Allow => 0,
            WindowType::Deny => 1,
            WindowType::Unknown => 2,
        }
    }
}

impl TryFrom<i64> for WindowType {
    type Error = PolicyError;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            0 => Ok(WindowType::Allow),
            1 => Ok(WindowType::Deny),
            2 => Ok(WindowType::Unknown),
            other => Err(PolicyError::InvalidValue {
                field: "window type",
                value: other.to_string(),
            }),
        }
    }
}

/// Policy configuration for the maintenance window
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowPolicy {
    pub window_type: WindowType,

    #[serde(default)]
    pub window_cron: String,
}

impl WindowPolicy {
    pub fn new(window_type: WindowType, window_cron: impl Into<String>) -> Self {
        Self {
            window_type,
            window_cron: window_cron.into(),
        }
    }

    /// An unset cron places no restriction on when changes run
    pub fn is_anytime(&self) -> bool {
        self.window_cron.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        validate_window_cron(&self.window_cron)
    }

    /// Parsed schedule, or `None` when the window is unset
    pub fn schedule(&self) -> Result<Option<Cron>> {
        if self.is_anytime() {
            return Ok(None);
        }
        parse_window_cron(&self.window_cron).map(Some)
    }

    pub(crate) fn decode(payload: &str) -> Result<Self> {
        // A missing windowType decodes as 0 (allow), matching how payloads
        // written before the field existed were read.
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Raw {
            #[serde(default)]
            window_type: i64,
            #[serde(default)]
            window_cron: String,
        }

        let raw: Raw = serde_json::from_str(payload).map_err(|source| PolicyError::Malformed {
            policy_type: PolicyType::Window,
            payload: payload.to_string(),
            source,
        })?;

        Ok(Self {
            window_type: WindowType::try_from(raw.window_type)?,
            window_cron: raw.window_cron,
        })
    }
}

/// Check a window cron expression; the empty string is accepted as "anytime"
pub fn validate_window_cron(cron: &str) -> Result<()> {
    if cron.is_empty() {
        return Ok(());
    }
    parse_window_cron(cron).map(|_| ())
}

fn parse_window_cron(cron: &str) -> Result<Cron> {
    let fields = cron.split_whitespace().count();
    if fields != WINDOW_CRON_FIELDS {
        return Err(PolicyError::InvalidCron {
            cron: cron.to_string(),
            reason: format!("expected {} fields, found {}", WINDOW_CRON_FIELDS, fields),
        });
    }

    for (position, field) in cron.split_whitespace().enumerate() {
        check_window_field(position, field).map_err(|reason| PolicyError::InvalidCron {
            cron: cron.to_string(),
            reason,
        })?;
    }

    Cron::new(cron).parse().map_err(|e| PolicyError::InvalidCron {
        cron: cron.to_string(),
        reason: e.to_string(),
    })
}

const MONTH_NAMES: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];
const DAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];
const MONTH_FIELD: usize = 3;
const DAY_OF_WEEK_FIELD: usize = 4;

/// Restrict a field to lists, ranges and steps over numbers, names, `*` and `?`
///
/// The `L`, `W` and `#` extensions are not part of the window grammar, and
/// day-of-week runs 0-6 with no `7` alias for Sunday.
fn check_window_field(position: usize, field: &str) -> std::result::Result<(), String> {
    for item in field.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => (range, Some(step)),
            None => (item, None),
        };

        if let Some(step) = step {
            if step.is_empty() || !step.bytes().all(|b| b.is_ascii_digit()) {
                return Err(format!("invalid step {:?} in field {:?}", step, field));
            }
        }

        for bound in range.split('-') {
            if !is_window_atom(position, bound) {
                return Err(format!("invalid value {:?} in field {:?}", bound, field));
            }
        }
    }
    Ok(())
}

fn is_window_atom(position: usize, atom: &str) -> bool {
    match atom {
        "*" | "?" => true,
        "" => false,
        digits if digits.bytes().all(|b| b.is_ascii_digit()) => {
            position != DAY_OF_WEEK_FIELD || digits.parse::<u32>().is_ok_and(|day| day <= 6)
        }
        name => {
            let name = name.to_ascii_uppercase();
            match position {
                MONTH_FIELD => MONTH_NAMES.contains(&name.as_str()),
                DAY_OF_WEEK_FIELD => DAY_NAMES.contains(&name.as_str()),
                _ => false,
            }
        }
    }
}
