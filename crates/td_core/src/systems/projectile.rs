//! Projectile resolution: detects hits and applies damage.

use crate::components::{Enemy, EnemyTag, Health, Position, Projectile, ProjectileTag, Tower};
use crate::data::Rules;
use crate::events::GameEvent;
use crate::math::{squared, Fixed, Vec2Fixed};
use crate::world::{EntityId, World};

/// Resolve every projectile that reached its target.
///
/// Damage is reduced by the target's armor and clamps health at zero.
/// Splash applies the same treatment to every other enemy within the
/// radius of the impact. Dead enemies stay in the world for the health
/// system to collect.
pub fn run(world: &mut World, rules: &Rules, events: &mut Vec<GameEvent>) {
    let hit_sq = squared(rules.hit_threshold);

    for id in world.query_ids::<(ProjectileTag, Projectile, Position)>() {
        let (Some(projectile), Some(position)) = (
            world.get::<Projectile>(id).copied(),
            world.get::<Position>(id).map(|p| p.value),
        ) else {
            continue;
        };

        let Some(target_position) = world.get::<Position>(projectile.target).map(|p| p.value)
        else {
            world.destroy(id);
            continue;
        };

        if position.distance_squared(target_position) >= hit_sq {
            continue;
        }

        let mut dealt = strike(world, projectile.target, projectile, events);

        if projectile.splash_radius > Fixed::ZERO {
            for victim in splash_victims(world, projectile, target_position) {
                dealt = dealt.saturating_add(strike(world, victim, projectile, events));
            }
        }

        if let Some(tower) = world.get_mut::<Tower>(projectile.source) {
            tower.experience = tower.experience.saturating_add(u64::from(dealt));
        }

        world.destroy(id);
    }
}

fn splash_victims(world: &World, projectile: Projectile, impact: Vec2Fixed) -> Vec<EntityId> {
    let radius_sq = squared(projectile.splash_radius);
    world
        .query::<(EnemyTag, Position, Health)>()
        .filter(|(id, (_, position, health))| {
            *id != projectile.target
                && !health.is_dead()
                && position.value.distance_squared(impact) <= radius_sq
        })
        .map(|(id, _)| id)
        .collect()
}

/// Apply one projectile's damage to `victim`. Returns the damage taken.
fn strike(
    world: &mut World,
    victim: EntityId,
    projectile: Projectile,
    events: &mut Vec<GameEvent>,
) -> u32 {
    let mitigated = world
        .get::<Enemy>(victim)
        .map_or(projectile.damage, |enemy| enemy.mitigate(projectile.damage));

    let Some(health) = world.get_mut::<Health>(victim) else {
        return 0;
    };
    let taken = health.apply_damage(mitigated);
    let remaining = health.current;

    events.push(GameEvent::EnemyDamaged {
        id: victim,
        source: projectile.source,
        damage: taken,
        health: remaining,
    });
    taken
}
