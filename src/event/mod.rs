//! Event system for console notifications.
//!
//! Events are published on named channels, one per [`EventKind`]. Callbacks
//! registered with [`EventDispatcher::subscribe`] run synchronously on the
//! publishing thread, in subscription order. Every published event is also
//! broadcast to async [`Subscription`]s.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::Stream;
use tokio::sync::broadcast;

use crate::types::{Address, DeviceIdentity, PlayerStatus, PlayerUpdate};

/// Channels events are published on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A device was discovered or listed.
    DeviceFound,
    /// A device was removed.
    DeviceRemoved,
    /// A device connected or disconnected.
    DeviceConnection,
    /// Player status, title or artist changed.
    PlayerChanged,
    /// Pairing needs a passkey confirmation.
    PasskeyRequested,
    /// Known devices changed and views should re-render.
    RegistryChanged,
    /// The console process exited on its own.
    ConsoleExited,
}

/// Events published by the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Device found, either by discovery or in the paired listing.
    DeviceFound {
        device: DeviceIdentity,
        paired: bool,
    },
    /// Device removed.
    DeviceRemoved { address: Address },
    /// Device connected.
    DeviceConnected { address: Address },
    /// Device disconnected.
    DeviceDisconnected { address: Address },
    /// Player started playing.
    PlayerPlaying,
    /// Player paused.
    PlayerPaused,
    /// Player stopped.
    PlayerStopped,
    /// Track title changed.
    PlayerTitleChanged(String),
    /// Track artist changed.
    PlayerArtistChanged(String),
    /// Passkey confirmation requested.
    PasskeyRequested { code: String },
    /// Known devices changed.
    RegistryChanged,
    /// Console exited unexpectedly.
    ConsoleExited,
}

impl Event {
    /// Returns the channel this event is published on.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::DeviceFound { .. } => EventKind::DeviceFound,
            Self::DeviceRemoved { .. } => EventKind::DeviceRemoved,
            Self::DeviceConnected { .. } | Self::DeviceDisconnected { .. } => {
                EventKind::DeviceConnection
            }
            Self::PlayerPlaying
            | Self::PlayerPaused
            | Self::PlayerStopped
            | Self::PlayerTitleChanged(_)
            | Self::PlayerArtistChanged(_) => EventKind::PlayerChanged,
            Self::PasskeyRequested { .. } => EventKind::PasskeyRequested,
            Self::RegistryChanged => EventKind::RegistryChanged,
            Self::ConsoleExited => EventKind::ConsoleExited,
        }
    }
}

impl From<PlayerUpdate> for Event {
    fn from(update: PlayerUpdate) -> Self {
        match update {
            PlayerUpdate::Status(PlayerStatus::Playing) => Self::PlayerPlaying,
            PlayerUpdate::Status(PlayerStatus::Paused) => Self::PlayerPaused,
            PlayerUpdate::Status(PlayerStatus::Stopped) => Self::PlayerStopped,
            PlayerUpdate::Title(title) => Self::PlayerTitleChanged(title),
            PlayerUpdate::Artist(artist) => Self::PlayerArtistChanged(artist),
        }
    }
}

/// Error returned by a failing subscriber.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result returned by subscriber callbacks.
pub type HandlerResult = Result<(), HandlerError>;

type Handler = Arc<dyn Fn(&Event) -> HandlerResult + Send + Sync>;

/// Identifies a callback registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Registration {
    id: SubscriptionId,
    kind: EventKind,
    handler: Handler,
}

/// An async subscription to every published event.
pub struct Subscription {
    receiver: broadcast::Receiver<Event>,
}

impl Subscription {
    /// Receives the next event.
    ///
    /// Returns `None` once the dispatcher is gone.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("event subscription lagged, {} events skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Converts the subscription into a stream of events.
    pub fn into_stream(self) -> impl Stream<Item = Event> + Send {
        futures::stream::unfold(self, |mut subscription| async move {
            let event = subscription.recv().await?;
            Some((event, subscription))
        })
    }
}

struct EventDispatcherInner {
    registrations: Mutex<Vec<Registration>>,
    next_id: AtomicU64,
    sender: broadcast::Sender<Event>,
}

/// Dispatches events to subscribers.
#[derive(Clone)]
pub struct EventDispatcher {
    inner: Arc<EventDispatcherInner>,
}

impl EventDispatcher {
    /// Creates a new event dispatcher.
    ///
    /// `capacity` bounds the async stream buffer; callbacks are unbounded.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(EventDispatcherInner {
                registrations: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                sender,
            }),
        }
    }

    /// Registers a callback for one event kind.
    ///
    /// Safe to call from inside a callback; the registration takes effect on
    /// the next publish.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) -> HandlerResult + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.registrations().push(Registration {
            id,
            kind,
            handler: Arc::new(handler),
        });
        id
    }

    /// Removes a callback registration.
    ///
    /// Returns false if the id was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registrations = self.registrations();
        let before = registrations.len();
        registrations.retain(|registration| registration.id != id);
        registrations.len() != before
    }

    /// Returns the number of callbacks registered for a kind.
    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.registrations()
            .iter()
            .filter(|registration| registration.kind == kind)
            .count()
    }

    /// Subscribes to the async stream of all events.
    #[must_use]
    pub fn subscribe_all(&self) -> Subscription {
        Subscription {
            receiver: self.inner.sender.subscribe(),
        }
    }

    /// Publishes an event to every callback registered for its kind.
    ///
    /// Callbacks run in subscription order. A failing or panicking callback
    /// is logged and does not stop the others.
    pub fn publish(&self, event: Event) {
        let kind = event.kind();
        let handlers: Vec<(SubscriptionId, Handler)> = self
            .registrations()
            .iter()
            .filter(|registration| registration.kind == kind)
            .map(|registration| (registration.id, Arc::clone(&registration.handler)))
            .collect();

        tracing::debug!("publishing {:?} to {} subscribers", kind, handlers.len());

        for (id, handler) in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!("subscriber {:?} failed on {:?}: {}", id, kind, e);
                }
                Err(_) => {
                    tracing::warn!("subscriber {:?} panicked on {:?}", id, kind);
                }
            }
        }

        // No async receivers is fine.
        let _ = self.inner.sender.send(event);
    }

    fn registrations(&self) -> std::sync::MutexGuard<'_, Vec<Registration>> {
        self.inner
            .registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    fn new_log() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[test]
    fn test_publish_in_subscription_order() {
        let dispatcher = EventDispatcher::new(16);
        let log = new_log();

        for name in ["first", "second", "third"] {
            let log = Arc::clone(&log);
            dispatcher.subscribe(EventKind::RegistryChanged, move |_| {
                log.lock().unwrap().push(name.to_string());
                Ok(())
            });
        }

        dispatcher.publish(Event::RegistryChanged);
        assert_eq!(*log.lock().unwrap(), ["first", "second", "third"]);
    }

    #[test]
    fn test_publish_only_matching_kind() {
        let dispatcher = EventDispatcher::new(16);
        let log = new_log();
        let seen = Arc::clone(&log);
        dispatcher.subscribe(EventKind::PlayerChanged, move |event| {
            seen.lock().unwrap().push(format!("{event:?}"));
            Ok(())
        });

        dispatcher.publish(Event::RegistryChanged);
        dispatcher.publish(Event::PlayerPaused);
        assert_eq!(*log.lock().unwrap(), ["PlayerPaused"]);
    }

    #[test]
    fn test_failing_subscriber_is_isolated() {
        let dispatcher = EventDispatcher::new(16);
        let log = new_log();

        dispatcher.subscribe(EventKind::DeviceRemoved, |_| Err("boom".into()));
        dispatcher.subscribe(EventKind::DeviceRemoved, |_| panic!("subscriber bug"));
        let seen = Arc::clone(&log);
        dispatcher.subscribe(EventKind::DeviceRemoved, move |_| {
            seen.lock().unwrap().push("last".into());
            Ok(())
        });

        let address = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        dispatcher.publish(Event::DeviceRemoved { address });
        assert_eq!(*log.lock().unwrap(), ["last"]);
    }

    #[test]
    fn test_subscribe_inside_callback_applies_next_publish() {
        let dispatcher = EventDispatcher::new(16);
        let log = new_log();

        let inner_dispatcher = dispatcher.clone();
        let inner_log = Arc::clone(&log);
        let outer_id = dispatcher.subscribe(EventKind::RegistryChanged, move |_| {
            let log = Arc::clone(&inner_log);
            inner_dispatcher.subscribe(EventKind::RegistryChanged, move |_| {
                log.lock().unwrap().push("late".into());
                Ok(())
            });
            Ok(())
        });

        dispatcher.publish(Event::RegistryChanged);
        assert!(log.lock().unwrap().is_empty());

        assert!(dispatcher.unsubscribe(outer_id));
        dispatcher.publish(Event::RegistryChanged);
        assert_eq!(*log.lock().unwrap(), ["late"]);
    }

    #[test]
    fn test_unsubscribe_inside_callback_applies_next_publish() {
        let dispatcher = EventDispatcher::new(16);
        let log = new_log();

        let id_slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));
        let remover = dispatcher.clone();
        let slot = Arc::clone(&id_slot);
        dispatcher.subscribe(EventKind::PlayerChanged, move |_| {
            if let Some(id) = slot.lock().unwrap().take() {
                remover.unsubscribe(id);
            }
            Ok(())
        });
        let seen = Arc::clone(&log);
        let victim = dispatcher.subscribe(EventKind::PlayerChanged, move |_| {
            seen.lock().unwrap().push("victim".into());
            Ok(())
        });
        *id_slot.lock().unwrap() = Some(victim);

        dispatcher.publish(Event::PlayerPlaying);
        dispatcher.publish(Event::PlayerPaused);
        assert_eq!(*log.lock().unwrap(), ["victim"]);
        assert_eq!(dispatcher.subscriber_count(EventKind::PlayerChanged), 1);
    }

    #[test]
    fn test_unsubscribe_unknown_id() {
        let dispatcher = EventDispatcher::new(16);
        let id = dispatcher.subscribe(EventKind::ConsoleExited, |_| Ok(()));
        assert!(dispatcher.unsubscribe(id));
        assert!(!dispatcher.unsubscribe(id));
    }

    #[tokio::test]
    async fn test_async_subscription() {
        let dispatcher = EventDispatcher::new(16);
        let mut sub = dispatcher.subscribe_all();

        dispatcher.publish(Event::PlayerTitleChanged("Song A".into()));

        let event = tokio::time::timeout(std::time::Duration::from_millis(100), sub.recv())
            .await
            .unwrap();
        assert_eq!(event, Some(Event::PlayerTitleChanged("Song A".into())));
    }

    #[tokio::test]
    async fn test_subscription_stream_ends_with_dispatcher() {
        let dispatcher = EventDispatcher::new(16);
        let stream = dispatcher.subscribe_all().into_stream();

        dispatcher.publish(Event::PlayerStopped);
        drop(dispatcher);

        let events: Vec<Event> = stream.collect().await;
        assert_eq!(events, vec![Event::PlayerStopped]);
    }

    #[test]
    fn test_player_update_conversion() {
        assert_eq!(
            Event::from(PlayerUpdate::Status(PlayerStatus::Paused)),
            Event::PlayerPaused
        );
        assert_eq!(
            Event::from(PlayerUpdate::Artist("Artist B".into())).kind(),
            EventKind::PlayerChanged
        );
    }
}
