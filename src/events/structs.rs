//! Internal data structures for representing Diablo IV world events.
//!
//! The upstream API reports three recurring events. Each one is kept as its own
//! struct so the payload contract stays visible, and [`GameEvent`] gives the
//! scheduler a single tagged view over them.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use log::warn;

/// Minutes between two Helltide rises.
///
/// The API only reports when the current Helltide started, the next one is
/// derived from this period.
pub const HELLTIDE_REFRESH_MINUTES: i64 = 135;

/// Zone codes used by the API for Helltides, with their spoken names.
const HELLTIDE_ZONE_NAMES: &[(&str, &str)] = &[
    ("frac", "Fractured Peaks"),
    ("scos", "Scosglen"),
    ("step", "Dry Steppes"),
    ("kehj", "Kehjistan"),
    ("hawe", "Hawezar"),
];

/// Name used when a Helltide zone code is not in [`HELLTIDE_ZONE_NAMES`].
const UNKNOWN_HELLTIDE_ZONE: &str = "Sanctuary";

/// The three kinds of recurring events.
///
/// The declaration order is the tie-break order when two alerts are due at
/// the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// World boss spawn
    Boss,
    /// Legion gathering
    Legion,
    /// Helltide rise
    Helltide,
}

impl EventKind {
    /// All kinds, in tie-break order.
    pub const ALL: [EventKind; 3] = [EventKind::Boss, EventKind::Legion, EventKind::Helltide];
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            EventKind::Boss => "boss",
            EventKind::Legion => "legion",
            EventKind::Helltide => "helltide",
        };
        write!(f, "{}", name)
    }
}

/// World boss as reported by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BossEvent {
    /// Name of the last boss
    pub name: String,
    /// Name of the next expected boss
    pub expected_name: String,
    /// Name of the boss after the next one
    pub next_expected_name: String,
    /// Last known spawn, Unix seconds
    pub timestamp: i64,
    /// Next expected spawn, Unix seconds
    pub expected: i64,
    /// Spawn after the next one, Unix seconds
    pub next_expected: i64,
    /// Territory of the spawn
    pub territory: String,
    /// Zone of the spawn
    pub zone: String,
}

/// Legion event as reported by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegionEvent {
    /// Last known gathering, Unix seconds
    pub timestamp: i64,
    /// Next expected gathering, Unix seconds
    pub expected: i64,
    /// Gathering after the next one, Unix seconds
    pub next_expected: i64,
    /// Territory of the gathering
    pub territory: String,
    /// Zone of the gathering
    pub zone: String,
}

/// Helltide as reported by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelltideEvent {
    /// Start of the current or last Helltide, Unix seconds
    pub timestamp: i64,
    /// Zone code, see [`helltide_zone_name`]
    pub zone: String,
    /// Next refresh of the chests, Unix seconds
    pub refresh: i64,
}

/// The triple of events returned by one API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSnapshot {
    pub boss: BossEvent,
    pub legion: LegionEvent,
    pub helltide: HelltideEvent,
}

impl EventSnapshot {
    /// Returns a tagged view of the event of the given kind.
    pub fn event(&self, kind: EventKind) -> GameEvent<'_> {
        match kind {
            EventKind::Boss => GameEvent::Boss(&self.boss),
            EventKind::Legion => GameEvent::Legion(&self.legion),
            EventKind::Helltide => GameEvent::Helltide(&self.helltide),
        }
    }
}

impl fmt::Display for EventSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "boss={}@{}/{}, legion={}/{}, helltide={}@{}",
            self.boss.expected_name,
            self.boss.timestamp,
            self.boss.expected,
            self.legion.timestamp,
            self.legion.expected,
            self.helltide.zone,
            self.helltide.timestamp
        )
    }
}

/// Borrowed view over one event of a snapshot.
///
/// Gives the scheduler uniform access to the event time, the identity of the
/// occurrence and the spoken text, whatever the kind.
#[derive(Debug, Clone, Copy)]
pub enum GameEvent<'a> {
    Boss(&'a BossEvent),
    Legion(&'a LegionEvent),
    Helltide(&'a HelltideEvent),
}

impl GameEvent<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            GameEvent::Boss(_) => EventKind::Boss,
            GameEvent::Legion(_) => EventKind::Legion,
            GameEvent::Helltide(_) => EventKind::Helltide,
        }
    }

    /// Computes when the next occurrence happens, as seen from `now`.
    ///
    /// The reported `timestamp` is used while it is still ahead of `now`. Once
    /// it has elapsed the next occurrence is `expected`, or for Helltides the
    /// timestamp plus [`HELLTIDE_REFRESH_MINUTES`].
    pub fn event_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let (timestamp, next) = match self {
            GameEvent::Boss(boss) => (from_unix(boss.timestamp), from_unix(boss.expected)),
            GameEvent::Legion(legion) => {
                (from_unix(legion.timestamp), from_unix(legion.expected))
            }
            GameEvent::Helltide(helltide) => {
                let timestamp = from_unix(helltide.timestamp);
                (timestamp, timestamp + TimeDelta::minutes(HELLTIDE_REFRESH_MINUTES))
            }
        };

        if timestamp < now { next } else { timestamp }
    }

    /// Returns `true` if both events describe the same occurrence.
    ///
    /// Bosses and Legions are identified by `timestamp` and `expected`,
    /// Helltides by `timestamp` alone.
    pub fn same_occurrence(&self, other: &GameEvent) -> bool {
        match (self, other) {
            (GameEvent::Boss(a), GameEvent::Boss(b)) => {
                a.timestamp == b.timestamp && a.expected == b.expected
            }
            (GameEvent::Legion(a), GameEvent::Legion(b)) => {
                a.timestamp == b.timestamp && a.expected == b.expected
            }
            (GameEvent::Helltide(a), GameEvent::Helltide(b)) => a.timestamp == b.timestamp,
            _ => false,
        }
    }

    /// Spoken text announcing the event, meant to be followed by the
    /// remaining time.
    pub fn alert_text(&self) -> String {
        match self {
            GameEvent::Boss(boss) => format!(
                "{} spawning in {} {} in",
                boss.expected_name, boss.territory, boss.zone
            ),
            GameEvent::Legion(legion) => format!(
                "Legions are gathering in {} {} in",
                legion.territory, legion.zone
            ),
            GameEvent::Helltide(helltide) => format!(
                "The Helltide will rise in {} in",
                helltide_zone_name(&helltide.zone)
            ),
        }
    }
}

/// Translates a Helltide zone code into its spoken name.
///
/// Unknown codes fall back to "Sanctuary".
pub fn helltide_zone_name(code: &str) -> &'static str {
    HELLTIDE_ZONE_NAMES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, name)| *name)
        .unwrap_or(UNKNOWN_HELLTIDE_ZONE)
}

fn from_unix(timestamp: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp, 0).unwrap_or_else(|| {
        warn!("event timestamp {} is out of range, using the epoch", timestamp);
        DateTime::default()
    })
}
