//! Game simulation
//!
//! Entities and the game manager. Each stateful entity is an actor:
//! - `Coin` and `Character` are driven by the manager's tick and by input
//! - `GameManager` owns the run-state machine and the per-frame update
//! - Stage data is parsed once and shared by every run

pub mod character;
pub mod coin;
pub mod collision;
mod event;
pub mod manager;
pub mod stage;
pub mod state;
pub mod tick;

pub use character::{
    AnimationSequence, AnimationState, Character, CharacterState, GravityDirection, GravityState,
    PositionChange,
};
pub use coin::{Coin, CoinAvailability};
pub use collision::{Resolution, resolve_platforms};
pub use event::Event;
pub use manager::GameManager;
pub use stage::{
    Level, LevelState, Platform, PlatformOrientation, Stage, StageDefinition, StageError,
};
pub use state::{RunCompletion, RunOutcome, RunState};
pub use tick::viewport_follow;
