//! Alert scheduling for the Diablo IV world events.
//!
//! This module provides the [`AlertScheduler`], the decision engine turning
//! the latest [`EventSnapshot`] into the alerts to speak now.
//!
//! # Deduplication
//!
//! The scheduler remembers, per event kind, the instant of its last
//! evaluation. An alert time at or before that instant was already inside an
//! evaluated window and is consumed. Evaluations are expected every few
//! seconds, so each window `(last evaluation, now]` is small and every lead
//! time falls into exactly one of them.
//!
//! When the API reports a different occurrence for a kind (its timestamp or
//! expected time changed), the kind's last evaluation is forgotten and its
//! lead times become available again.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, info, warn};

use crate::{
    alerts::alert::DueAlert,
    events::{EventKind, EventSnapshot},
};

/// Lead times of every event kind, sorted from the smallest to the largest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeadTimes {
    boss: Vec<TimeDelta>,
    legion: Vec<TimeDelta>,
    helltide: Vec<TimeDelta>,
}

impl LeadTimes {
    /// Creates lead time tables from durations in seconds.
    ///
    /// The tables are sorted and deduplicated, the order in the configuration
    /// does not matter.
    pub fn from_seconds(boss: &[u64], legion: &[u64], helltide: &[u64]) -> Self {
        LeadTimes {
            boss: to_sorted_deltas(boss),
            legion: to_sorted_deltas(legion),
            helltide: to_sorted_deltas(helltide),
        }
    }

    /// Returns the lead times of a kind, smallest first.
    pub fn for_kind(&self, kind: EventKind) -> &[TimeDelta] {
        match kind {
            EventKind::Boss => &self.boss,
            EventKind::Legion => &self.legion,
            EventKind::Helltide => &self.helltide,
        }
    }
}

impl Default for LeadTimes {
    fn default() -> Self {
        LeadTimes::from_seconds(&[3600, 1800, 900, 300, 60], &[210], &[60])
    }
}

fn to_sorted_deltas(seconds: &[u64]) -> Vec<TimeDelta> {
    let mut seconds = seconds.to_vec();
    seconds.sort_unstable();
    seconds.dedup();
    seconds
        .into_iter()
        .filter_map(|s| i64::try_from(s).ok())
        .filter_map(|s| {
            let lead = TimeDelta::try_seconds(s);
            if lead.is_none() {
                warn!("ignoring out of range lead time of {} seconds", s);
            }
            lead
        })
        .collect()
}

/// Decides which event alerts are due.
///
/// The scheduler is a plain state machine without I/O. It is shared between
/// the fetch task, which calls [`AlertScheduler::on_new_snapshot`], and the
/// evaluate task, which calls [`AlertScheduler::evaluate`]. Both must go
/// through the same lock.
///
/// # Examples
///
/// ```no_run
/// let mut scheduler = AlertScheduler::new(LeadTimes::default());
/// scheduler.on_new_snapshot(requester.fetch().await?);
///
/// for alert in scheduler.evaluate(Utc::now()) {
///     dispatcher.dispatch(&alert).await;
/// }
/// ```
pub struct AlertScheduler {
    /// Lead times per kind
    lead_times: LeadTimes,
    /// Latest snapshot, `None` until the first successful fetch
    snapshot: Option<EventSnapshot>,
    /// Last evaluation per kind, a missing entry means "never"
    last_alert_times: HashMap<EventKind, DateTime<Utc>>,
    /// Fire every kind on the next evaluation, set by the first snapshot
    first_alert: bool,
}

impl AlertScheduler {
    /// Creates a scheduler without any snapshot.
    pub fn new(lead_times: LeadTimes) -> Self {
        AlertScheduler {
            lead_times,
            snapshot: None,
            last_alert_times: HashMap::new(),
            first_alert: false,
        }
    }

    /// Returns `true` once a snapshot has been received.
    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Stores a freshly fetched snapshot.
    ///
    /// The very first snapshot arms the forced first alert. Afterwards, every
    /// kind whose occurrence changed gets its schedule reset.
    pub fn on_new_snapshot(&mut self, snapshot: EventSnapshot) {
        match &self.snapshot {
            None => {
                info!("first events snapshot received: {}", snapshot);
                self.first_alert = true;
            }
            Some(previous) => {
                for kind in EventKind::ALL {
                    if previous.event(kind).same_occurrence(&snapshot.event(kind)) {
                        continue;
                    }
                    info!("{} occurrence changed, resetting its alert schedule", kind);
                    self.last_alert_times.remove(&kind);
                }
                debug!("events snapshot updated: {}", snapshot);
            }
        }

        self.snapshot = Some(snapshot);
    }

    /// Returns the alerts to fire at `now`, ordered by alert time.
    ///
    /// At most one alert per kind is returned. Ties on the alert time are
    /// broken by kind: boss, legion, then helltide. Every kind is marked as
    /// evaluated at `now`, whether it fired or not.
    pub fn evaluate(&mut self, now: DateTime<Utc>) -> Vec<DueAlert> {
        let Some(snapshot) = &self.snapshot else {
            warn!("no events snapshot yet, nothing to evaluate");
            return Vec::new();
        };

        let mut candidates: Vec<DueAlert> = EventKind::ALL
            .iter()
            .filter_map(|kind| self.candidate(snapshot, *kind, now))
            .collect();
        candidates.sort_by(|a, b| {
            a.alert_time
                .cmp(&b.alert_time)
                .then_with(|| a.kind.cmp(&b.kind))
        });

        let forced = self.first_alert;
        let due: Vec<DueAlert> = candidates
            .into_iter()
            .filter(|candidate| forced || candidate.alert_time <= now)
            .collect();

        for kind in EventKind::ALL {
            self.last_alert_times.insert(kind, now);
        }
        self.first_alert = false;

        if !due.is_empty() {
            debug!("{} alerts due at {} (forced={})", due.len(), now, forced);
        }

        due
    }

    fn last_alert_time(&self, kind: EventKind) -> DateTime<Utc> {
        self.last_alert_times
            .get(&kind)
            .copied()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Selects the alert candidate of one kind.
    ///
    /// Among the lead times not consumed yet, the smallest one whose alert
    /// time is reached wins. If none is reached, the smallest pending one is
    /// returned so a forced first alert still has a candidate.
    ///
    /// An occurrence already elapsed has no candidate, except on the forced
    /// first pass which announces every kind.
    fn candidate(
        &self,
        snapshot: &EventSnapshot,
        kind: EventKind,
        now: DateTime<Utc>,
    ) -> Option<DueAlert> {
        let event = snapshot.event(kind);
        let event_time = event.event_time(now);

        if event_time < now && !self.first_alert {
            debug!("{} occurrence at {} already elapsed, skipping", kind, event_time);
            return None;
        }

        let last_alert_time = self.last_alert_time(kind);
        let pending: Vec<TimeDelta> = self
            .lead_times
            .for_kind(kind)
            .iter()
            .copied()
            .filter(|lead| event_time - *lead > last_alert_time)
            .collect();

        let lead_time = pending
            .iter()
            .find(|lead| event_time - **lead <= now)
            .or_else(|| pending.first())
            .copied()?;

        Some(DueAlert {
            kind,
            text: event.alert_text(),
            event_time,
            alert_time: event_time - lead_time,
            lead_time,
            time_remaining: event_time - now,
        })
    }
}
