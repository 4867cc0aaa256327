// src/trigger/schedule.rs

//! Schedule expressions understood by [`super::CronTrigger`].
//!
//! Two forms are accepted:
//!
//! - cron with a leading seconds field, e.g. `*/5 * * * * *` (parsed by the
//!   `cron` crate, which also accepts shorthands like `@hourly`);
//! - `@every <duration>`, e.g. `@every 500ms` or `@every 2m`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule as CronSchedule;

use crate::errors::{GracecronError, Result};
use crate::types::parse_duration;

const EVERY_PREFIX: &str = "@every";

#[derive(Debug, Clone)]
enum Kind {
    Cron(CronSchedule),
    Every(Duration),
}

/// When a schedule fires next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Firing {
    /// Time to sleep from the `now` it was computed for.
    pub delay: Duration,
    /// The cron slot being waited for; `None` for fixed intervals.
    pub slot: Option<DateTime<Utc>>,
}

/// A parsed schedule expression.
#[derive(Debug, Clone)]
pub struct Schedule {
    expr: String,
    kind: Kind,
}

impl Schedule {
    pub fn parse(expr: &str) -> Result<Self> {
        let trimmed = expr.trim();
        let parse_err = |reason: String| GracecronError::ScheduleParse {
            schedule: expr.to_string(),
            reason,
        };

        let kind = if let Some(rest) = trimmed.strip_prefix(EVERY_PREFIX) {
            let interval = parse_duration(rest).map_err(parse_err)?;
            if interval.is_zero() {
                return Err(parse_err("interval must be greater than zero".to_string()));
            }
            Kind::Every(interval)
        } else {
            let schedule =
                CronSchedule::from_str(trimmed).map_err(|e| parse_err(e.to_string()))?;
            Kind::Cron(schedule)
        };

        Ok(Self {
            expr: trimmed.to_string(),
            kind,
        })
    }

    /// Next firing as seen from `now`.
    ///
    /// For cron schedules the returned slot is strictly later than
    /// `last_slot`, even when the wall clock reads earlier than that slot.
    /// `None` means the schedule will never fire again.
    pub fn next_firing(
        &self,
        now: DateTime<Utc>,
        last_slot: Option<DateTime<Utc>>,
    ) -> Option<Firing> {
        match &self.kind {
            Kind::Every(interval) => Some(Firing {
                delay: *interval,
                slot: None,
            }),
            Kind::Cron(schedule) => {
                let from = last_slot.map_or(now, |last| last.max(now));
                schedule.after(&from).next().map(|next| Firing {
                    delay: (next - now).to_std().unwrap_or(Duration::ZERO),
                    slot: Some(next),
                })
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.expr
    }
}

impl FromStr for Schedule {
    type Err = GracecronError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}
