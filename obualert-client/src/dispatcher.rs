//! Dispatcher
//!
//! The single serialized context. It owns the [`AlertEngine`], receives
//! events from the connection worker in arrival order, sleeps until the
//! pending expiry deadline and forwards the resulting actions to the
//! [`AlertListener`]. Nothing else touches alert state.

use std::sync::Arc;

use obualert_core::arbitration::{Action, AlertEngine, Outcome};
use obualert_core::state::ActiveAlertSnapshot;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::connection::{ConnectionStatus, Event};
use crate::surface::AlertListener;

pub struct Dispatcher {
    engine: AlertEngine,
    events: mpsc::UnboundedReceiver<Event>,
    listener: Arc<dyn AlertListener>,
    active: watch::Sender<Option<ActiveAlertSnapshot>>,
    cancel: CancellationToken,
}

impl Dispatcher {
    pub fn new(
        engine: AlertEngine,
        events: mpsc::UnboundedReceiver<Event>,
        listener: Arc<dyn AlertListener>,
        active: watch::Sender<Option<ActiveAlertSnapshot>>,
        cancel: CancellationToken,
    ) -> Self {
        Dispatcher {
            engine,
            events,
            listener,
            active,
            cancel,
        }
    }

    pub async fn run(mut self) {
        log::debug!("dispatcher: started");
        loop {
            let deadline = self.engine.next_deadline();
            let wake = deadline.map(Instant::from_std).unwrap_or_else(Instant::now);

            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,

                event = self.events.recv() => match event {
                    Some(Event::Notification(notification)) => {
                        let object_id = notification.object_id.clone();
                        let decision = self.engine.process(notification, Instant::now().into_std());
                        log::debug!(
                            "dispatcher: {} -> {:?} via {:?}",
                            object_id,
                            decision.outcome,
                            decision.matched
                        );
                        if decision.outcome != Outcome::Ignored || !decision.actions.is_empty() {
                            self.publish();
                        }
                        self.apply(&decision.actions);
                    }
                    Some(Event::Status(status)) => self.report(status),
                    None => break,
                },

                _ = sleep_until(wake), if deadline.is_some() => {
                    let actions = self.engine.poll_expiry(Instant::now().into_std());
                    log::debug!("dispatcher: expiry fired, {} action(s)", actions.len());
                    self.publish();
                    self.apply(&actions);
                },
            }
        }

        let actions = self.engine.reset();
        self.publish();
        self.apply(&actions);
        log::debug!("dispatcher: stopped");
    }

    fn publish(&self) {
        self.active.send_replace(self.engine.active());
    }

    fn report(&self, status: ConnectionStatus) {
        match status {
            ConnectionStatus::Connecting { attempt } => self.listener.on_connecting(attempt),
            ConnectionStatus::Connected => self.listener.on_connected(),
            ConnectionStatus::Error(reason) => self.listener.on_connection_error(&reason),
        }
    }

    fn apply(&self, actions: &[Action]) {
        for action in actions {
            match action {
                Action::DisplayAlert(cue) => {
                    self.listener
                        .on_display_alert(cue.direction, cue.tier, cue.object_type)
                }
                Action::PlaySound(cue) => self.listener.on_play_sound(cue),
                Action::StopAlert(cue) => self.listener.on_stop_alert(cue.direction),
            }
        }
    }
}
