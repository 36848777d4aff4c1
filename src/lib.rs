//! Gravity Runner - an auto-running platformer where the player flips gravity
//!
//! Core modules:
//! - `actor`: Per-entity serialized state with host notification delivery
//! - `geom`: Axis-aligned rectangles and circles in stage units
//! - `sim`: Entities, stage loading, run-state machine and the frame update
//! - `settings`: Runtime configuration for the host and the update loop

pub mod actor;
pub mod geom;
pub mod settings;
pub mod sim;

pub use actor::{ActorFault, ActorId, HostContext, Notification, Notifications, host_channel};
pub use settings::{LoopDrive, Settings};
pub use sim::{Character, Coin, Event, GameManager, RunState, StageDefinition, StageError};

use glam::DVec2;

/// Game configuration constants
pub mod consts {
    use glam::DVec2;

    /// Largest time step integrated by a single tick (seconds)
    pub const MAX_STEP: f64 = 0.03;
    /// Pause between two ticks of the update loop (milliseconds)
    pub const FRAME_INTERVAL_MS: u64 = 16;

    /// Player collision box (stage units)
    pub const PLAYER_SIZE: DVec2 = DVec2::new(1.0, 1.5);
    /// Horizontal acceleration toward the level's max speed
    pub const X_ACCELERATION: f64 = 5.0;
    /// Magnitude of the vertical gravity acceleration
    pub const GRAVITY: f64 = 5.0;

    /// Max horizontal speed of level 1
    pub const BASE_LEVEL_SPEED: f64 = 4.0;
    /// Each level runs this much faster than the one before it
    pub const LEVEL_SPEED_FACTOR: f64 = 1.2;

    /// Coin radius, coins sit in the middle of their grid cell
    pub const COIN_RADIUS: f64 = 0.5;

    /// Viewport keeps the player between these offsets from its left edge
    pub const VIEW_LEAD_MIN: f64 = 3.0;
    pub const VIEW_LEAD_MAX: f64 = 6.0;
    /// Fraction of the player's horizontal motion the viewport follows
    pub const VIEW_EASING: f64 = 0.75;

    /// Animation frames advanced per unit of horizontal travel
    pub const ANIMATION_RATE: f64 = 10.0;
    /// Frames in the character sprite sheet
    pub const SPRITE_FRAMES: usize = 30;

    /// Tolerance for contact edges and zero-area overlaps
    pub const CONTACT_EPSILON: f64 = 1e-9;
}

/// Compare two stage coordinates within the contact tolerance
#[inline]
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= consts::CONTACT_EPSILON
}

/// Grid cell (column, row) containing a stage point
#[inline]
pub fn cell_of(point: DVec2) -> (i32, i32) {
    (point.x.floor() as i32, point.y.floor() as i32)
}
