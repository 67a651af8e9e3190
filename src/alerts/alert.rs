//! Alerts produced by the scheduler.
//!
//! This module provides the [`DueAlert`] struct describing one spoken alert
//! for one event occurrence.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};

use crate::{alerts::duration::format_time_remaining, events::EventKind};

/// An alert the scheduler decided to fire.
///
/// # Examples
///
/// ```no_run
/// for alert in scheduler.evaluate(Utc::now()) {
///     println!("{}", alert.utterance());
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DueAlert {
    /// Kind of the event the alert is about.
    pub kind: EventKind,
    /// Spoken text, followed by the remaining time when uttered.
    pub text: String,
    /// Time of the event occurrence.
    pub event_time: DateTime<Utc>,
    /// Time at which the alert was meant to fire, `event_time - lead_time`.
    pub alert_time: DateTime<Utc>,
    /// Lead time the alert was selected for.
    pub lead_time: TimeDelta,
    /// Time left before the event when the alert was evaluated.
    pub time_remaining: TimeDelta,
}

impl DueAlert {
    /// Full sentence to synthesize, e.g.
    /// `"Legions are gathering in Scosglen Deep Forest in 3 minutes 30 seconds"`.
    pub fn utterance(&self) -> String {
        format!("{} {}", self.text, format_time_remaining(self.time_remaining))
    }
}

impl fmt::Display for DueAlert {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "kind={}, event_time={}, alert_time={}, lead_time={}s, remaining={}s",
            self.kind,
            self.event_time,
            self.alert_time,
            self.lead_time.num_seconds(),
            self.time_remaining.num_seconds()
        )
    }
}
