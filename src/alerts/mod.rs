//! Spoken alerts for the Diablo IV world events and elixir reminders.
//!
//! The event alerts go through three stages:
//!
//! - [`AlertScheduler`]: decides which alerts are due from the latest events snapshot
//! - [`AlertDispatcher`]: synthesizes an alert and plays it on every channel with listeners
//! - [`PollLoop`]: periodic tasks fetching the events and evaluating the scheduler
//!
//! The elixir reminders are independent from the events and handled by the
//! [`ElixirAlerter`].
//!
//! # Example Usage
//!
//! ```no_run
//! let scheduler = AlertScheduler::new(LeadTimes::default());
//! let dispatcher = Arc::new(AlertDispatcher::new(player, synthesizer, registry, "en-US", "en-US-Neural2-C"));
//!
//! let poll_loop = Arc::new(PollLoop::new(
//!     requester,
//!     scheduler,
//!     dispatcher,
//!     Duration::from_secs(60),
//!     Duration::from_secs(10),
//! ));
//! let handles = poll_loop.start();
//! ```

mod alert;
mod dispatcher;
mod duration;
mod elixir;
mod poller;
mod scheduler;

pub use crate::alerts::alert::DueAlert;
pub use crate::alerts::dispatcher::{AlertDispatcher, DispatchReport};
pub use crate::alerts::duration::format_time_remaining;
pub use crate::alerts::elixir::{ElixirAlerter, ElixirDecision, ElixirSchedule};
pub use crate::alerts::poller::PollLoop;
pub use crate::alerts::scheduler::{AlertScheduler, LeadTimes};
