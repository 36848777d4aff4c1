//! Per-frame simulation tick
//!
//! One tick integrates the player's velocity, resolves platform contacts,
//! claims overlapped coins, scrolls the viewport and checks for level
//! changes and death. The tick runs on the manager actor and joins the coin
//! and character operations it schedules.

use super::Event;
use super::character::PositionChange;
use super::collision::resolve_platforms;
use super::state::{ManagerState, RunState};
use crate::actor::{Joined, Notifier};
use crate::consts::{ANIMATION_RATE, VIEW_EASING, VIEW_LEAD_MAX, VIEW_LEAD_MIN};

/// Advance the game by `dt` seconds. Returns the run state after the tick.
pub fn tick(state: &mut ManagerState, dt: f64, notifier: &Notifier) -> Joined<RunState> {
    if state.run_state != RunState::Running {
        return Joined::ready(state.run_state);
    }
    let Some(player) = state.player.clone() else {
        return Joined::ready(state.run_state);
    };
    let character = player.state();
    let gravity = character.gravity.direction;

    state.velocity.x = state
        .level
        .max_x_speed
        .min(state.velocity.x + state.x_acceleration * dt);
    state.velocity.y += gravity.acceleration().y * dt;

    let p0 = character.position.corner;
    let resolution = resolve_platforms(
        &state.stage.platforms,
        character.position,
        state.velocity * dt,
        gravity,
    );
    if resolution.grounded {
        state.velocity.y = 0.0;
    }
    let dp = resolution.displacement;
    let p1 = p0 + dp;
    let player_rect = character.position.translated(dp);

    let mut captures = Vec::new();
    for coin in state.stage.coins.iter() {
        if coin.availability().can_capture()
            && player_rect.intersects(&coin.position().collision_region())
        {
            captures.push(coin.capture());
            notifier.notify(Event::CoinCaptured { coin: coin.id() });
        }
    }

    let viewport = &mut state.stage.viewport;
    viewport.corner.x = viewport_follow(viewport.left(), dp.x, p1.x);

    let advance = player.advance_position(PositionChange {
        delta: dp,
        grounded: resolution.grounded,
    });

    if let Some(next) = state.stage.next_level(&state.level) {
        if p1.x > next.start_x {
            state.level = (&next).into();
            notifier.notify(Event::LevelChanged(state.level));
            log::info!(
                "Level {} reached, max speed {:.2}",
                next.number,
                next.max_x_speed
            );
        }
    }

    if !player_rect.intersects(&state.stage.bounds) {
        state.game_over(notifier);
    }

    // Animation is cosmetic; the tick does not wait for it
    drop(player.advance_animation(dp.x * ANIMATION_RATE));

    let mut joined = Joined::ready(state.run_state);
    for capture in captures {
        joined.join(capture);
    }
    joined.join(advance);
    joined
}

/// New viewport left edge: eases after the player while keeping it between
/// `VIEW_LEAD_MIN` and `VIEW_LEAD_MAX` units from the edge
pub fn viewport_follow(view_x: f64, dx: f64, player_x: f64) -> f64 {
    (player_x - VIEW_LEAD_MAX).max((player_x - VIEW_LEAD_MIN).min(view_x + dx * VIEW_EASING))
}
