//! Broadcast hub: the single owner of participant membership and fan-out.
//!
//! Sessions and the reply listener never touch the registry. They submit
//! intents (join, leave, deliver) through a [`HubHandle`], and one task drains
//! all three channels, processing exactly one intent at a time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time;

use super::connection::Connection;
use super::events::OutboundEvent;
use super::registry::{Participant, ParticipantId, Registry};

/// Per-recipient deadline for a single send during fan-out.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(2);

/// Capacity of the join and deliver channels.
const INTENT_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
#[error("hub is not running")]
pub struct HubClosed;

struct JoinIntent {
    participant: Participant,
    registered: oneshot::Sender<()>,
}

/// Cloneable front door to the hub. Store in AppState.
#[derive(Clone)]
pub struct HubHandle {
    join_tx: mpsc::Sender<JoinIntent>,
    // Unbounded so `leave` can be called from `Drop`.
    leave_tx: mpsc::UnboundedSender<ParticipantId>,
    deliver_tx: mpsc::Sender<OutboundEvent>,
    next_id: Arc<AtomicU64>,
}

impl HubHandle {
    /// Register a connection. Resolves once the hub has inserted it and
    /// broadcast the new user list, so anything the caller delivers
    /// afterwards reaches this participant too.
    pub async fn join(
        &self,
        identity: impl Into<String>,
        connection: Box<dyn Connection>,
    ) -> Result<ParticipantId, HubClosed> {
        let id = ParticipantId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (registered, ack) = oneshot::channel();
        let intent = JoinIntent {
            participant: Participant {
                id,
                identity: identity.into(),
                connection,
            },
            registered,
        };
        self.join_tx.send(intent).await.map_err(|_| HubClosed)?;
        ack.await.map_err(|_| HubClosed)?;
        Ok(id)
    }

    /// Ask the hub to drop a participant. Never blocks; unknown ids are a no-op.
    pub fn leave(&self, id: ParticipantId) {
        // The hub being gone means the participant is gone too.
        let _ = self.leave_tx.send(id);
    }

    /// Queue an event for fan-out to every registered participant.
    pub async fn deliver(&self, event: OutboundEvent) -> Result<(), HubClosed> {
        self.deliver_tx.send(event).await.map_err(|_| HubClosed)
    }
}

/// A running hub task plus the means to stop it.
///
/// Dropping the runtime without calling [`HubRuntime::shutdown`] also stops
/// the loop.
pub struct HubRuntime {
    handle: HubHandle,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl HubRuntime {
    pub fn handle(&self) -> HubHandle {
        self.handle.clone()
    }

    /// Stop processing intents, close every registered connection and wait
    /// for the loop to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            tracing::error!(?e, "hub task failed");
        }
    }
}

struct Receivers {
    join: mpsc::Receiver<JoinIntent>,
    leave: mpsc::UnboundedReceiver<ParticipantId>,
    deliver: mpsc::Receiver<OutboundEvent>,
    shutdown: oneshot::Receiver<()>,
}

pub struct Hub {
    registry: Registry,
    send_timeout: Duration,
}

impl Hub {
    /// Start the control loop on the current runtime.
    pub fn spawn(send_timeout: Duration) -> HubRuntime {
        let (join_tx, join) = mpsc::channel(INTENT_CAPACITY);
        let (leave_tx, leave) = mpsc::unbounded_channel();
        let (deliver_tx, deliver) = mpsc::channel(INTENT_CAPACITY);
        let (shutdown_tx, shutdown) = oneshot::channel();

        let hub = Hub {
            registry: Registry::new(),
            send_timeout,
        };
        let task = tokio::spawn(hub.run(Receivers {
            join,
            leave,
            deliver,
            shutdown,
        }));

        HubRuntime {
            handle: HubHandle {
                join_tx,
                leave_tx,
                deliver_tx,
                next_id: Arc::new(AtomicU64::new(0)),
            },
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run(mut self, mut rx: Receivers) {
        tracing::debug!("hub started");
        loop {
            tokio::select! {
                Some(intent) = rx.join.recv() => self.handle_join(intent).await,
                Some(id) = rx.leave.recv() => self.handle_leave(id).await,
                Some(event) = rx.deliver.recv() => self.handle_deliver(event).await,
                _ = &mut rx.shutdown => break,
                else => break,
            }
        }

        // Flush leaves and deliveries submitted before the stop.
        while let Ok(id) = rx.leave.try_recv() {
            self.handle_leave(id).await;
        }
        while let Ok(event) = rx.deliver.try_recv() {
            self.handle_deliver(event).await;
        }

        let participants = self.registry.drain();
        tracing::info!(count = participants.len(), "hub stopping, closing connections");
        for mut participant in participants {
            self.close(&mut participant).await;
        }
    }

    async fn handle_join(&mut self, intent: JoinIntent) {
        let JoinIntent {
            participant,
            registered,
        } = intent;
        tracing::info!(
            participant_id = %participant.id,
            username = %participant.identity,
            "participant joined"
        );
        self.registry.insert(participant);
        self.announce_members().await;
        let _ = registered.send(());
    }

    async fn handle_leave(&mut self, id: ParticipantId) {
        let Some(mut participant) = self.registry.remove(id) else {
            return;
        };
        tracing::info!(
            participant_id = %participant.id,
            username = %participant.identity,
            "participant left"
        );
        self.close(&mut participant).await;
        self.announce_members().await;
    }

    async fn handle_deliver(&mut self, event: OutboundEvent) {
        if self.broadcast(&event).await > 0 {
            self.announce_members().await;
        }
    }

    /// Broadcast the current user list. Repeats while a broadcast drops
    /// participants, so the last list everyone received is accurate.
    async fn announce_members(&mut self) {
        loop {
            let event = OutboundEvent::UserList(self.registry.identities());
            if self.broadcast(&event).await == 0 {
                break;
            }
        }
    }

    /// Send `event` to every participant. Anyone whose send fails or misses
    /// the deadline is removed and closed after the sweep.
    ///
    /// Returns the number of participants dropped.
    async fn broadcast(&mut self, event: &OutboundEvent) -> usize {
        if self.registry.is_empty() {
            return 0;
        }

        let frame = match serde_json::to_string(event) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, kind = event.kind(), "failed to encode event");
                return 0;
            }
        };

        let mut failed = Vec::new();
        for participant in self.registry.iter_mut() {
            match time::timeout(self.send_timeout, participant.connection.send(&frame)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(
                        participant_id = %participant.id,
                        username = %participant.identity,
                        error = %e,
                        "send failed, dropping participant"
                    );
                    failed.push(participant.id);
                }
                Err(_) => {
                    tracing::warn!(
                        participant_id = %participant.id,
                        username = %participant.identity,
                        timeout_ms = self.send_timeout.as_millis() as u64,
                        "send timed out, dropping participant"
                    );
                    failed.push(participant.id);
                }
            }
        }

        for id in &failed {
            if let Some(mut participant) = self.registry.remove(*id) {
                self.close(&mut participant).await;
            }
        }
        failed.len()
    }

    async fn close(&self, participant: &mut Participant) {
        if time::timeout(self.send_timeout, participant.connection.close())
            .await
            .is_err()
        {
            tracing::debug!(participant_id = %participant.id, "close timed out");
        }
    }
}
