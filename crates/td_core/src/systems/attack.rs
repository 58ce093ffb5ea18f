//! Attack system: fires projectiles from towers whose cooldown has elapsed.

use crate::components::{Attack, Position, Projectile, ProjectileTag, Targeting, TowerTag};
use crate::data::Rules;
use crate::events::GameEvent;
use crate::math::Fixed;
use crate::world::World;

/// Fire every ready tower at its current target.
///
/// Range is not rechecked; targeting already pruned this tick. A target
/// without a position is skipped silently.
pub fn run(world: &mut World, rules: &Rules, now: Fixed, events: &mut Vec<GameEvent>) {
    for tower in world.query_ids::<(TowerTag, Position, Targeting, Attack)>() {
        let Some(target) = world.get::<Targeting>(tower).and_then(|t| t.current_target) else {
            continue;
        };
        let Some(target_position) = world.get::<Position>(target).map(|p| p.value) else {
            continue;
        };
        let (Some(origin), Some(attack)) = (
            world.get::<Position>(tower).map(|p| p.value),
            world.get::<Attack>(tower).copied(),
        ) else {
            continue;
        };

        if !attack.is_ready(now) {
            continue;
        }

        let projectile = world.spawn((
            Position::new(origin),
            Projectile {
                source: tower,
                target,
                damage: attack.damage,
                speed: attack
                    .projectile_speed
                    .unwrap_or(rules.default_projectile_speed),
                piercing: attack.piercing,
                splash_radius: attack.splash_radius,
            },
            ProjectileTag,
        ));

        if let Some(attack) = world.get_mut::<Attack>(tower) {
            attack.last_attack_time = Some(now);
        }

        events.push(GameEvent::ProjectileCreated {
            id: projectile,
            source: tower,
            target,
            position: origin,
            target_position,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::TargetPriority;
    use crate::math::Vec2Fixed;
    use crate::world::EntityId;

    fn armed_tower(world: &mut World, target: Option<EntityId>, speed: Option<Fixed>) -> EntityId {
        world.spawn((
            Position::default(),
            Targeting {
                range: Fixed::from_num(10),
                priority: TargetPriority::First,
                current_target: target,
            },
            Attack {
                damage: 30,
                attack_speed: Fixed::from_num(2),
                last_attack_time: None,
                projectile_speed: speed,
                piercing: false,
                splash_radius: Fixed::ZERO,
            },
            TowerTag,
        ))
    }

    #[test]
    fn test_fires_and_respects_cooldown() {
        let mut world = World::new();
        let target = world.spawn((Position::new(Vec2Fixed::from_ints(5, 0)),));
        let tower = armed_tower(&mut world, Some(target), None);
        let rules = Rules::default();
        let mut events = Vec::new();

        run(&mut world, &rules, Fixed::ZERO, &mut events);
        assert_eq!(events.len(), 1);
        let GameEvent::ProjectileCreated { id, source, .. } = events[0] else {
            panic!("expected a projectile");
        };
        assert_eq!(source, tower);
        let projectile = world.get::<Projectile>(id).unwrap();
        assert_eq!(projectile.damage, 30);
        assert_eq!(projectile.speed, rules.default_projectile_speed);

        run(&mut world, &rules, Fixed::from_num(0.25), &mut events);
        assert_eq!(events.len(), 1);

        run(&mut world, &rules, Fixed::from_num(0.5), &mut events);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_skips_missing_target() {
        let mut world = World::new();
        armed_tower(&mut world, Some(EntityId(500)), Some(Fixed::from_num(40)));
        armed_tower(&mut world, None, None);
        let mut events = Vec::new();

        run(&mut world, &Rules::default(), Fixed::ZERO, &mut events);
        assert!(events.is_empty());
        assert_eq!(world.count::<Projectile>(), 0);
    }
}
