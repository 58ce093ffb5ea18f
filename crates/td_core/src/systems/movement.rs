//! Movement system: walks enemies along the path and homes projectiles.

use crate::components::{
    Enemy, EnemyTag, Health, PathFollowing, Position, Projectile, ProjectileTag, Velocity,
};
use crate::data::Rules;
use crate::events::GameEvent;
use crate::math::{squared, Fixed, Vec2Fixed};
use crate::path::Path;
use crate::world::{EntityId, World};

/// Lives an escaping enemy costs each player.
pub const LIVES_PER_ESCAPE: u32 = 1;

/// Advance every enemy and projectile by `dt`.
///
/// Enemies that reach the final waypoint are destroyed and returned; the
/// caller applies the life loss.
pub fn run(
    world: &mut World,
    path: &Path,
    rules: &Rules,
    dt: Fixed,
    events: &mut Vec<GameEvent>,
) -> Vec<EntityId> {
    let escaped = move_enemies(world, path, rules, dt, events);
    move_projectiles(world, dt);
    escaped
}

fn move_enemies(
    world: &mut World,
    path: &Path,
    rules: &Rules,
    dt: Fixed,
    events: &mut Vec<GameEvent>,
) -> Vec<EntityId> {
    let threshold_sq = squared(rules.waypoint_threshold);
    let mut escaped = Vec::new();

    for id in world.query_ids::<(EnemyTag, Enemy, PathFollowing)>() {
        let (Some(enemy), Some(follow)) = (
            world.get::<Enemy>(id).copied(),
            world.get::<PathFollowing>(id).copied(),
        ) else {
            continue;
        };

        let mut index = follow.waypoint_index;
        let (Some(length), Some(next)) = (path.segment_length(index), path.waypoint(index + 1))
        else {
            // Already standing on the last waypoint.
            escaped.push(id);
            continue;
        };

        let mut progress = follow
            .progress
            .saturating_add(enemy.speed.saturating_mul(dt).saturating_div(length))
            .min(Fixed::ONE);
        let mut position = path.point_at(index, progress);

        if position.distance_squared(next) < threshold_sq {
            index += 1;
            progress = Fixed::ZERO;
            position = next;
        }

        if path.is_last(index) {
            escaped.push(id);
            continue;
        }

        let heading = match path.waypoint(index + 1) {
            Some(target) => (target - position).normalize().scale(enemy.speed),
            None => Vec2Fixed::ZERO,
        };

        if let Some(pos) = world.get_mut::<Position>(id) {
            pos.value = position;
        }
        if let Some(velocity) = world.get_mut::<Velocity>(id) {
            velocity.value = heading;
        }
        if let Some(follow) = world.get_mut::<PathFollowing>(id) {
            follow.waypoint_index = index;
            follow.progress = progress;
        }

        events.push(GameEvent::EnemyPositionUpdated {
            id,
            position,
            waypoint_index: index,
            progress,
            health: world.get::<Health>(id).map_or(0, |h| h.current),
        });
    }

    for &id in &escaped {
        world.destroy(id);
        events.push(GameEvent::EnemyEscaped {
            id,
            lives_lost: LIVES_PER_ESCAPE,
        });
    }

    escaped
}

fn move_projectiles(world: &mut World, dt: Fixed) {
    for id in world.query_ids::<(ProjectileTag, Projectile, Position)>() {
        let Some(projectile) = world.get::<Projectile>(id).copied() else {
            continue;
        };

        let Some(target) = world.get::<Position>(projectile.target).map(|p| p.value) else {
            world.destroy(id);
            continue;
        };

        if let Some(pos) = world.get_mut::<Position>(id) {
            pos.value = pos.value.move_towards(target, projectile.speed.saturating_mul(dt));
        }
    }
}
