//! Periodic tasks driving the event alerts.
//!
//! The [`PollLoop`] runs two independent tasks:
//!
//! 1. **Fetch task**: requests the events every `polling_interval` and feeds
//!    the scheduler. A failed fetch is logged and the previous snapshot kept.
//! 2. **Evaluate task**: waits for the first snapshot, then asks the scheduler
//!    for due alerts every `alert_interval` and dispatches them in order.
//!    A presence change wakes it up early.
//!
//! Both tasks share the scheduler through one mutex. The evaluate task is a
//! single loop awaiting its dispatches, so two evaluations never overlap.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use tokio::{
    sync::{Mutex, Notify, watch},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::{
    alerts::{dispatcher::AlertDispatcher, scheduler::AlertScheduler},
    events::EventRequester,
    tts::SpeechSynthesizer,
    voice::VoiceGateway,
};

/// Event alert tasks and the state they share.
pub struct PollLoop<R, V, S>
where
    R: EventRequester,
    V: VoiceGateway,
    S: SpeechSynthesizer,
{
    requester: Arc<R>,
    scheduler: Arc<Mutex<AlertScheduler>>,
    dispatcher: Arc<AlertDispatcher<V, S>>,
    polling_interval: Duration,
    alert_interval: Duration,
    /// Flips to `true` once the scheduler holds a snapshot
    snapshot_ready: watch::Sender<bool>,
    /// Wakes the evaluate task before its next tick
    presence_changed: Notify,
}

impl<R, V, S> PollLoop<R, V, S>
where
    R: EventRequester + 'static,
    V: VoiceGateway + 'static,
    S: SpeechSynthesizer + 'static,
{
    /// Create a new [PollLoop].
    ///
    /// # Arguments
    ///
    /// * `requester` - Client of the events API.
    /// * `scheduler` - Alert scheduler, shared by both tasks.
    /// * `dispatcher` - Speaks the due alerts.
    /// * `polling_interval` - Period of the fetch task.
    /// * `alert_interval` - Period of the evaluate task.
    pub fn new(
        requester: Arc<R>,
        scheduler: AlertScheduler,
        dispatcher: Arc<AlertDispatcher<V, S>>,
        polling_interval: Duration,
        alert_interval: Duration,
    ) -> Self {
        let (snapshot_ready, _) = watch::channel(false);

        PollLoop {
            requester,
            scheduler: Arc::new(Mutex::new(scheduler)),
            dispatcher,
            polling_interval,
            alert_interval,
            snapshot_ready,
            presence_changed: Notify::new(),
        }
    }

    /// Spawns the fetch and evaluate tasks.
    ///
    /// # Returns
    ///
    /// The handles of both tasks, aborted on shutdown.
    pub fn start(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        let fetcher = Arc::clone(&self);
        let fetch_task = tokio::spawn(async move {
            info!(
                "fetching events every {} seconds",
                fetcher.polling_interval.as_secs()
            );
            let mut interval = time::interval(fetcher.polling_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                fetcher.fetch_events().await;
            }
        });

        let evaluator = Arc::clone(&self);
        let evaluate_task = tokio::spawn(async move {
            let mut ready = evaluator.snapshot_ready.subscribe();
            if ready.wait_for(|ready| *ready).await.is_err() {
                return;
            }

            info!(
                "evaluating alerts every {} seconds",
                evaluator.alert_interval.as_secs()
            );
            let mut interval = time::interval(evaluator.alert_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = evaluator.presence_changed.notified() => {
                        debug!("presence changed, evaluating alerts early");
                    }
                }
                evaluator.evaluate_alerts(Utc::now()).await;
            }
        });

        vec![fetch_task, evaluate_task]
    }

    /// Requests the events and hands the snapshot to the scheduler.
    ///
    /// # Returns
    ///
    /// `true` if a snapshot was received.
    pub async fn fetch_events(&self) -> bool {
        match self.requester.fetch().await {
            Ok(snapshot) => {
                self.scheduler.lock().await.on_new_snapshot(snapshot);
                self.snapshot_ready.send_replace(true);
                true
            }
            Err(e) => {
                warn!("failed to fetch events, keeping previous snapshot: {}", e);
                false
            }
        }
    }

    /// Evaluates the scheduler at `now` and dispatches the due alerts one by
    /// one, in scheduler order.
    ///
    /// # Returns
    ///
    /// The number of alerts the scheduler reported due.
    pub async fn evaluate_alerts(&self, now: DateTime<Utc>) -> usize {
        // the scheduler lock is released before any dispatch
        let alerts = self.scheduler.lock().await.evaluate(now);

        for alert in &alerts {
            info!("alert due: {}", alert);
            if let Err(e) = self.dispatcher.dispatch(alert).await {
                error!("{} alert abandoned: {}", alert.kind, e);
            }
        }

        alerts.len()
    }

    /// Wakes the evaluate task for an immediate evaluation.
    pub fn notify_presence_change(&self) {
        self.presence_changed.notify_one();
    }
}
