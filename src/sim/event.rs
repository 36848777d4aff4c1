//! Notifications raised by game entities

use super::character::AnimationState;
use super::coin::CoinAvailability;
use super::stage::LevelState;
use super::state::RunState;
use crate::actor::ActorId;

/// Event delivered to the host through the notification queue
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Manager entered a new run state
    RunStateChanged(RunState),
    /// Player crossed into the next level
    LevelChanged(LevelState),
    /// A new run began
    Started,
    /// A tick finished; the host should redraw
    Present,
    /// Player overlapped a free coin this tick. Raised whether or not the
    /// capture went through.
    CoinCaptured { coin: ActorId },
    AvailabilityChanged(CoinAvailability),
    AnimationChanged(AnimationState),
}
