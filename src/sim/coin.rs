//! Coin actor
//!
//! A coin can be captured at most once per run. Capture requests are
//! serialized on the coin itself, so concurrent attempts from overlapping
//! frames cannot both succeed.

use serde::{Deserialize, Serialize};

use super::Event;
use crate::actor::{Actor, ActorId, HostContext, Pending};
use crate::geom::Circle;

/// Whether a coin can still be captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CoinAvailability {
    #[default]
    Free,
    Captured,
}

impl CoinAvailability {
    pub fn can_capture(self) -> bool {
        match self {
            CoinAvailability::Free => true,
            CoinAvailability::Captured => false,
        }
    }

    /// Move to `Captured`. Returns false if the coin was already taken.
    fn capture(&mut self) -> bool {
        if !self.can_capture() {
            return false;
        }
        *self = CoinAvailability::Captured;
        true
    }
}

/// A coin placed on the stage
#[derive(Debug, Clone)]
pub struct Coin {
    position: Circle,
    actor: Actor<CoinAvailability>,
}

impl Coin {
    /// Spawn a free coin. Must be called from within a tokio runtime.
    pub fn spawn(position: Circle, host: &HostContext) -> Self {
        Self {
            position,
            actor: Actor::spawn(CoinAvailability::Free, host),
        }
    }

    /// A fresh, free coin at the same position reporting to the same host
    pub fn reset(&self) -> Self {
        Self::spawn(self.position, &self.actor.notifier().host())
    }

    pub fn id(&self) -> ActorId {
        self.actor.id()
    }

    pub fn position(&self) -> Circle {
        self.position
    }

    /// Availability after the latest completed capture request
    pub fn availability(&self) -> CoinAvailability {
        self.actor.snapshot()
    }

    /// Try to capture the coin. Resolves to true for exactly one caller.
    pub fn capture(&self) -> Pending<bool> {
        self.actor.exclusive(|availability, notifier| {
            let captured = availability.capture();
            if captured {
                notifier.notify(Event::AvailabilityChanged(*availability));
            }
            captured
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::host_channel;
    use glam::DVec2;
    use proptest::prelude::*;

    fn coin(host: &HostContext) -> Coin {
        Coin::spawn(Circle::new(DVec2::new(5.5, 1.5), 0.5), host)
    }

    #[test]
    fn test_availability_capture() {
        let mut availability = CoinAvailability::Free;
        assert!(availability.capture());
        assert_eq!(availability, CoinAvailability::Captured);
        assert!(!availability.capture());
        assert!(!availability.can_capture());
    }

    #[tokio::test]
    async fn test_capture_once() {
        let (host, notifications) = host_channel();
        let coin = coin(&host);
        assert!(coin.availability().can_capture());

        assert_eq!(coin.capture().await, Ok(true));
        assert_eq!(coin.capture().await, Ok(false));
        assert_eq!(coin.availability(), CoinAvailability::Captured);

        // Only the successful capture is announced
        let events: Vec<_> = notifications.drain().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, coin.id());
        assert_eq!(
            events[0].event,
            Event::AvailabilityChanged(CoinAvailability::Captured)
        );
    }

    #[tokio::test]
    async fn test_reset_makes_a_free_copy() {
        let (host, _notifications) = host_channel();
        let original = coin(&host);
        assert_eq!(original.capture().await, Ok(true));

        let fresh = original.reset();
        assert_ne!(fresh.id(), original.id());
        assert_eq!(fresh.position(), original.position());
        assert_eq!(fresh.availability(), CoinAvailability::Free);
        assert_eq!(fresh.capture().await, Ok(true));
    }

    proptest! {
        #[test]
        fn test_concurrent_captures_succeed_once(callers in 1usize..32) {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(4)
                .enable_all()
                .build()
                .unwrap();

            let successes = runtime.block_on(async move {
                let (host, _notifications) = host_channel();
                let coin = coin(&host);
                let attempts: Vec<_> = (0..callers)
                    .map(|_| {
                        let coin = coin.clone();
                        tokio::spawn(async move { coin.capture().await })
                    })
                    .collect();

                let mut successes = 0;
                for attempt in attempts {
                    if attempt.await.unwrap().unwrap() {
                        successes += 1;
                    }
                }
                successes
            });

            prop_assert_eq!(successes, 1);
        }
    }
}
