//! Collision response between the player and platforms
//!
//! Platforms are resolved one at a time in stage order. Each platform can
//! land the player (vertical push back toward the side gravity pulls from)
//! and then block it horizontally. The player only ever moves right, so a
//! horizontal block always pushes left.

use glam::DVec2;

use super::character::GravityDirection;
use super::stage::Platform;
use crate::approx_eq;
use crate::consts::CONTACT_EPSILON;
use crate::geom::Rect;

/// Displacement left after resolving every platform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub displacement: DVec2,
    /// Landed on a platform on the gravity side
    pub grounded: bool,
}

/// Overlap of `a` and `b`, ignoring overlaps that merely touch
fn overlap(a: &Rect, b: &Rect) -> Option<Rect> {
    a.intersection(b).filter(|hit| hit.has_area(CONTACT_EPSILON))
}

/// Adjust the tentative displacement `dp` of `player` so it does not sink
/// into any platform.
pub fn resolve_platforms(
    platforms: &[Platform],
    player: Rect,
    dp: DVec2,
    gravity: GravityDirection,
) -> Resolution {
    let mut dp = dp;
    let mut grounded = false;

    for platform in platforms {
        let region = &platform.region;
        let mut hit = overlap(&player.translated(dp), region);

        if let Some(landing) = hit {
            // Landing requires entering through the platform face gravity
            // pulls toward, and a contact wider than it is deep
            let through_face = match gravity {
                GravityDirection::Up => approx_eq(landing.bottom(), region.bottom()),
                GravityDirection::Down => approx_eq(landing.top(), region.top()),
            };
            if through_face && landing.height() < landing.width() {
                let push = landing.height().min(dp.y.abs());
                match gravity {
                    GravityDirection::Up => dp.y -= push,
                    GravityDirection::Down => dp.y += push,
                }
                grounded = true;
                hit = overlap(&player.translated(dp), region);
            }
        }

        if let Some(block) = hit {
            if !approx_eq(block.right(), region.right()) {
                dp.x -= block.width().min(dp.x.abs());
            }
        }
    }

    Resolution {
        displacement: dp,
        grounded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::PLAYER_SIZE;
    use crate::sim::stage::PlatformOrientation;

    fn platform(x: f64, y: f64, w: f64, h: f64) -> Platform {
        Platform {
            orientation: PlatformOrientation::Inner,
            region: Rect::from_xywh(x, y, w, h),
        }
    }

    #[test]
    fn test_free_fall_is_unchanged() {
        let floor = [platform(0.0, 0.0, 10.0, 1.0)];
        let player = Rect::new(DVec2::new(1.0, 3.0), PLAYER_SIZE);
        let dp = DVec2::new(0.12, -0.1);
        let resolution = resolve_platforms(&floor, player, dp, GravityDirection::Down);
        assert_eq!(resolution.displacement, dp);
        assert!(!resolution.grounded);
    }

    #[test]
    fn test_lands_on_floor_with_gravity_down() {
        let floor = [platform(0.0, 0.0, 10.0, 1.0)];
        let player = Rect::new(DVec2::new(1.0, 1.0), PLAYER_SIZE);
        let resolution = resolve_platforms(
            &floor,
            player,
            DVec2::new(0.12, -0.0045),
            GravityDirection::Down,
        );
        assert!(resolution.grounded);
        assert!((resolution.displacement.x - 0.12).abs() < 1e-12);
        assert!(resolution.displacement.y.abs() < 1e-9);
    }

    #[test]
    fn test_lands_on_ceiling_with_gravity_up() {
        let ceiling = [platform(0.0, 4.0, 10.0, 1.0)];
        let player = Rect::new(DVec2::new(1.0, 2.45), PLAYER_SIZE);
        let resolution =
            resolve_platforms(&ceiling, player, DVec2::new(0.1, 0.1), GravityDirection::Up);
        assert!(resolution.grounded);
        assert!((resolution.displacement.y - 0.05).abs() < 1e-9);
        assert!((resolution.displacement.x - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_ceiling_does_not_ground_with_gravity_down() {
        let ceiling = [platform(0.0, 4.0, 10.0, 1.0)];
        let player = Rect::new(DVec2::new(1.0, 2.45), PLAYER_SIZE);
        let resolution =
            resolve_platforms(&ceiling, player, DVec2::new(0.1, 0.1), GravityDirection::Down);
        assert!(!resolution.grounded);
    }

    #[test]
    fn test_wall_blocks_forward_motion() {
        // Tall block directly ahead of a grounded player
        let platforms = [platform(0.0, 0.0, 10.0, 1.0), platform(3.0, 1.0, 1.0, 3.0)];
        let player = Rect::new(DVec2::new(1.95, 1.0), PLAYER_SIZE);
        let resolution = resolve_platforms(
            &platforms,
            player,
            DVec2::new(0.12, 0.0),
            GravityDirection::Down,
        );
        // Player right edge stops flush with the wall
        let right = player.right() + resolution.displacement.x;
        assert!((right - 3.0).abs() < 1e-9);
        assert!(resolution.displacement.y.abs() < 1e-12);
    }

    #[test]
    fn test_deep_side_contact_does_not_land() {
        // Falling into the side of a block: overlap taller than wide
        let block = [platform(2.0, 0.0, 2.0, 3.0)];
        let player = Rect::new(DVec2::new(0.95, 1.6), PLAYER_SIZE);
        let resolution =
            resolve_platforms(&block, player, DVec2::new(0.1, -0.1), GravityDirection::Down);
        assert!(!resolution.grounded);
        let right = player.right() + resolution.displacement.x;
        assert!((right - 2.0).abs() < 1e-9);
        assert!((resolution.displacement.y + 0.1).abs() < 1e-12);
    }
}
