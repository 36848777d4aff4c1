//! Host notification queue
//!
//! Actors never call into the host. They push notifications onto a single
//! queue that the host drains on its own loop, so delivery always happens on
//! the host's context and in the order each actor emitted them.

use crossbeam_channel::{Receiver, Sender};

use super::ActorId;
use crate::sim::Event;

/// A notification together with the actor that raised it
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub source: ActorId,
    pub event: Event,
}

/// Sending half of the host queue, handed to every actor at spawn time
#[derive(Debug, Clone)]
pub struct HostContext {
    tx: Sender<Notification>,
}

impl HostContext {
    pub(crate) fn bind(&self, source: ActorId) -> Notifier {
        Notifier {
            source,
            tx: self.tx.clone(),
        }
    }
}

/// Receiving half of the host queue
#[derive(Debug)]
pub struct Notifications {
    rx: Receiver<Notification>,
}

impl Notifications {
    /// Take every notification queued so far without blocking
    pub fn drain(&self) -> impl Iterator<Item = Notification> + '_ {
        self.rx.try_iter()
    }
}

/// Create the host notification queue
pub fn host_channel() -> (HostContext, Notifications) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (HostContext { tx }, Notifications { rx })
}

/// Per-actor sender that tags every notification with its source
#[derive(Debug, Clone)]
pub struct Notifier {
    source: ActorId,
    tx: Sender<Notification>,
}

impl Notifier {
    pub fn source(&self) -> ActorId {
        self.source
    }

    /// Queue `event` for the host. Dropped silently once the host is gone.
    pub fn notify(&self, event: Event) {
        let notification = Notification {
            source: self.source,
            event,
        };
        if self.tx.send(notification).is_err() {
            log::trace!("{} has no host to notify", self.source);
        }
    }

    /// Host context this notifier delivers to, for spawning related actors
    pub fn host(&self) -> HostContext {
        HostContext {
            tx: self.tx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifications_are_tagged_and_ordered() {
        let (host, notifications) = host_channel();
        let first = host.bind(ActorId(1));
        let second = host.bind(ActorId(2));

        first.notify(Event::Started);
        second.notify(Event::Present);
        first.notify(Event::Present);

        let received: Vec<_> = notifications.drain().collect();
        assert_eq!(received.len(), 3);
        assert_eq!(received[0].source, ActorId(1));
        assert_eq!(received[0].event, Event::Started);
        assert_eq!(received[2].source, ActorId(1));
        assert_eq!(received[2].event, Event::Present);
        assert_eq!(notifications.drain().count(), 0);
    }

    #[test]
    fn test_notify_without_host_is_harmless() {
        let (host, notifications) = host_channel();
        let notifier = host.bind(ActorId(9));
        drop(notifications);
        notifier.notify(Event::Present);
    }
}
