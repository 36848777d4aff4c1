//! Player character actor
//!
//! The character owns its position, gravity and animation state. Gravity
//! can only be flipped while standing on a surface; the manager's tick moves
//! the character and tells it whether it ended up grounded.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::Event;
use crate::actor::{Actor, ActorId, HostContext, Pending};
use crate::consts::GRAVITY;
use crate::geom::Rect;

/// Direction gravity pulls the character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GravityDirection {
    Up,
    Down,
}

impl GravityDirection {
    /// Fixed acceleration applied while this direction is active
    pub fn acceleration(self) -> DVec2 {
        match self {
            GravityDirection::Up => DVec2::new(0.0, GRAVITY),
            GravityDirection::Down => DVec2::new(0.0, -GRAVITY),
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            GravityDirection::Up => GravityDirection::Down,
            GravityDirection::Down => GravityDirection::Up,
        }
    }
}

/// Gravity direction plus ground contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GravityState {
    pub direction: GravityDirection,
    /// Touching a surface on the side gravity pulls toward
    pub grounded: bool,
}

impl GravityState {
    /// Fresh gravity state; contact is unknown until the next move
    pub fn new(direction: GravityDirection) -> Self {
        Self {
            direction,
            grounded: false,
        }
    }

    pub fn acceleration(&self) -> DVec2 {
        self.direction.acceleration()
    }
}

/// Sprite sheet sequence the character is animating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimationSequence {
    FallingDown,
    FallingUp,
    Down,
    Up,
}

impl AnimationSequence {
    pub fn index(self) -> usize {
        match self {
            AnimationSequence::FallingDown => 0,
            AnimationSequence::FallingUp => 1,
            AnimationSequence::Down => 2,
            AnimationSequence::Up => 3,
        }
    }
}

/// Key-frame animation state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimationState {
    pub sequence: AnimationSequence,
    /// Continuously advancing key frame
    pub frame: f64,
}

impl AnimationState {
    pub fn new(sequence: AnimationSequence) -> Self {
        Self {
            sequence,
            frame: 0.0,
        }
    }

    /// Same sequence, `delta` frames further
    pub fn advanced(self, delta: f64) -> Self {
        Self {
            sequence: self.sequence,
            frame: self.frame + delta,
        }
    }

    /// Sprite to draw from a sheet of `frames` images
    pub fn sprite_index(&self, frames: usize) -> usize {
        if frames == 0 {
            return 0;
        }
        (self.frame.max(0.0) as usize) % frames
    }
}

/// Displacement applied to the character by one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionChange {
    pub delta: DVec2,
    pub grounded: bool,
}

/// Everything the character actor owns
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterState {
    pub position: Rect,
    pub gravity: GravityState,
    pub animation: AnimationState,
}

impl CharacterState {
    /// New character standing at `corner`, pulled down, not yet grounded
    pub fn new(corner: DVec2, size: DVec2) -> Self {
        Self {
            position: Rect::new(corner, size),
            gravity: GravityState::new(GravityDirection::Down),
            animation: AnimationState::new(AnimationSequence::Down),
        }
    }

    /// Flip gravity if grounded. The character leaves the ground and starts
    /// the falling sequence matching the new direction.
    pub fn flip_gravity(&mut self) -> bool {
        if !self.gravity.grounded {
            return false;
        }

        let direction = self.gravity.direction.flipped();
        self.gravity = GravityState::new(direction);
        self.animation = AnimationState::new(match direction {
            GravityDirection::Down => AnimationSequence::FallingDown,
            GravityDirection::Up => AnimationSequence::FallingUp,
        });
        true
    }

    pub fn apply(&mut self, change: PositionChange) {
        self.position = self.position.translated(change.delta);
        self.gravity.grounded = change.grounded;
    }
}

/// The player character
#[derive(Debug, Clone)]
pub struct Character {
    actor: Actor<CharacterState>,
}

impl Character {
    /// Spawn a character actor. Must be called from within a tokio runtime.
    pub fn spawn(corner: DVec2, size: DVec2, host: &HostContext) -> Self {
        Self {
            actor: Actor::spawn(CharacterState::new(corner, size), host),
        }
    }

    pub fn id(&self) -> ActorId {
        self.actor.id()
    }

    /// State after the latest completed operation
    pub fn state(&self) -> CharacterState {
        self.actor.snapshot()
    }

    pub fn position(&self) -> Rect {
        self.actor.read(|state| state.position)
    }

    pub fn gravity(&self) -> GravityState {
        self.actor.read(|state| state.gravity)
    }

    pub fn animation(&self) -> AnimationState {
        self.actor.read(|state| state.animation)
    }

    /// Try to flip gravity. Resolves to false while airborne.
    pub fn gravity_flip(&self) -> Pending<bool> {
        self.actor.exclusive(|state, _| {
            let flipped = state.flip_gravity();
            if flipped {
                log::debug!("Gravity flipped {:?}", state.gravity.direction);
            }
            flipped
        })
    }

    /// Move the character and record whether it is grounded
    pub fn advance_position(&self, change: PositionChange) -> Pending<()> {
        self.actor.exclusive(move |state, _| state.apply(change))
    }

    /// Advance the animation key frame
    pub fn advance_animation(&self, delta: f64) -> Pending<()> {
        self.actor.exclusive(move |state, notifier| {
            state.animation = state.animation.advanced(delta);
            notifier.notify(Event::AnimationChanged(state.animation));
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::host_channel;
    use crate::consts::PLAYER_SIZE;
    use proptest::prelude::*;

    #[test]
    fn test_new_character_defaults() {
        let state = CharacterState::new(DVec2::new(1.0, 1.0), PLAYER_SIZE);
        assert_eq!(state.position, Rect::from_xywh(1.0, 1.0, 1.0, 1.5));
        assert_eq!(state.gravity.direction, GravityDirection::Down);
        assert!(!state.gravity.grounded);
        assert_eq!(state.animation.sequence, AnimationSequence::Down);
        assert_eq!(state.animation.sequence.index(), 2);
        assert_eq!(state.gravity.acceleration(), DVec2::new(0.0, -GRAVITY));
    }

    #[test]
    fn test_flip_requires_ground() {
        let mut state = CharacterState::new(DVec2::ZERO, PLAYER_SIZE);
        assert!(!state.flip_gravity());
        assert_eq!(state.gravity.direction, GravityDirection::Down);

        state.apply(PositionChange {
            delta: DVec2::ZERO,
            grounded: true,
        });
        assert!(state.flip_gravity());
        assert_eq!(state.gravity.direction, GravityDirection::Up);
        assert_eq!(state.animation, AnimationState::new(AnimationSequence::FallingUp));

        // Flipping leaves the ground, so a second flip must wait for a landing
        assert!(!state.gravity.grounded);
        assert!(!state.flip_gravity());

        state.apply(PositionChange {
            delta: DVec2::ZERO,
            grounded: true,
        });
        assert!(state.flip_gravity());
        assert_eq!(state.gravity.direction, GravityDirection::Down);
        assert_eq!(state.animation.sequence, AnimationSequence::FallingDown);
    }

    #[test]
    fn test_sprite_index_wraps() {
        let animation = AnimationState::new(AnimationSequence::Down).advanced(61.7);
        assert_eq!(animation.sprite_index(30), 1);
        assert_eq!(animation.sprite_index(0), 0);
    }

    #[tokio::test]
    async fn test_actor_operations() {
        let (host, notifications) = host_channel();
        let character = Character::spawn(DVec2::new(2.0, 1.0), PLAYER_SIZE, &host);

        assert_eq!(character.gravity_flip().await, Ok(false));

        character
            .advance_position(PositionChange {
                delta: DVec2::new(0.5, -0.25),
                grounded: true,
            })
            .await
            .unwrap();
        assert_eq!(character.position().corner, DVec2::new(2.5, 0.75));
        assert!(character.gravity().grounded);

        assert_eq!(character.gravity_flip().await, Ok(true));
        assert_eq!(character.gravity().direction, GravityDirection::Up);

        character.advance_animation(2.5).await.unwrap();
        let animation = character.animation();
        assert_eq!(animation.frame, 2.5);
        assert_eq!(animation.sequence, AnimationSequence::FallingUp);

        let events: Vec<_> = notifications.drain().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, Event::AnimationChanged(animation));
    }

    proptest! {
        #[test]
        fn test_flip_outcome_matches_ground_contact(
            moves in prop::collection::vec((any::<bool>(), any::<bool>()), 1..40)
        ) {
            let mut state = CharacterState::new(DVec2::ZERO, PLAYER_SIZE);
            for (grounded, flip) in moves {
                state.apply(PositionChange { delta: DVec2::X, grounded });
                if flip {
                    let before = state.gravity;
                    let flipped = state.flip_gravity();
                    prop_assert_eq!(flipped, before.grounded);
                    if flipped {
                        prop_assert_eq!(state.gravity.direction, before.direction.flipped());
                    } else {
                        prop_assert_eq!(state.gravity, before);
                    }
                }
            }
        }
    }
}
