//! Targeting system: picks each tower's preferred enemy in range.

use crate::components::{
    EnemyTag, Health, PathFollowing, Position, TargetPriority, Targeting, TowerTag,
};
use crate::math::{squared, Fixed, Vec2Fixed};
use crate::world::{EntityId, World};

#[derive(Clone, Copy)]
struct Candidate {
    id: EntityId,
    position: Vec2Fixed,
    along_path: Fixed,
    health: u32,
}

/// Ordering key for a candidate; lower is better.
///
/// Health stays an integer so any `u32` compares exactly.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Score {
    Measure(Fixed),
    Health(i64),
}

fn score(priority: TargetPriority, candidate: &Candidate, distance_sq: Fixed) -> Score {
    match priority {
        TargetPriority::Closest => Score::Measure(distance_sq),
        TargetPriority::First => Score::Measure(-candidate.along_path),
        TargetPriority::Last => Score::Measure(candidate.along_path),
        TargetPriority::Strongest => Score::Health(-i64::from(candidate.health)),
        TargetPriority::Weakest => Score::Health(i64::from(candidate.health)),
    }
}

/// Refresh `Targeting::current_target` on every tower.
///
/// Range is inclusive. Ties keep the lowest entity id.
pub fn run(world: &mut World) {
    let candidates: Vec<Candidate> = world
        .query::<(EnemyTag, Position, PathFollowing, Health)>()
        .map(|(id, (_, position, follow, health))| Candidate {
            id,
            position: position.value,
            along_path: follow.distance_along(),
            health: health.current,
        })
        .collect();

    for tower in world.query_ids::<(TowerTag, Position, Targeting)>() {
        let (Some(origin), Some(targeting)) = (
            world.get::<Position>(tower).map(|p| p.value),
            world.get::<Targeting>(tower).copied(),
        ) else {
            continue;
        };

        let range_sq = squared(targeting.range);
        let mut best: Option<(Score, EntityId)> = None;

        for candidate in &candidates {
            let distance_sq = origin.distance_squared(candidate.position);
            if distance_sq > range_sq {
                continue;
            }

            let value = score(targeting.priority, candidate, distance_sq);
            if best.map_or(true, |(best_value, _)| value < best_value) {
                best = Some((value, candidate.id));
            }
        }

        if let Some(targeting) = world.get_mut::<Targeting>(tower) {
            targeting.current_target = best.map(|(_, id)| id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tower(world: &mut World, priority: TargetPriority, range: i32) -> EntityId {
        world.spawn((
            Position::default(),
            Targeting {
                range: Fixed::from_num(range),
                priority,
                current_target: None,
            },
            TowerTag,
        ))
    }

    fn enemy(world: &mut World, x: i32, index: usize, health: u32) -> EntityId {
        world.spawn((
            Position::new(Vec2Fixed::from_ints(x, 0)),
            PathFollowing {
                waypoint_index: index,
                progress: Fixed::ZERO,
            },
            Health {
                current: health,
                maximum: 100,
            },
            EnemyTag,
        ))
    }

    fn target_of(world: &World, tower: EntityId) -> Option<EntityId> {
        world.get::<Targeting>(tower).unwrap().current_target
    }

    #[test]
    fn test_priorities() {
        let mut world = World::new();
        let near_weak_behind = enemy(&mut world, 2, 1, 30);
        let far_strong_ahead = enemy(&mut world, 8, 3, 90);
        let _mid = enemy(&mut world, 5, 2, 60);

        let first = tower(&mut world, TargetPriority::First, 10);
        let last = tower(&mut world, TargetPriority::Last, 10);
        let closest = tower(&mut world, TargetPriority::Closest, 10);
        let strongest = tower(&mut world, TargetPriority::Strongest, 10);
        let weakest = tower(&mut world, TargetPriority::Weakest, 10);

        run(&mut world);

        assert_eq!(target_of(&world, first), Some(far_strong_ahead));
        assert_eq!(target_of(&world, last), Some(near_weak_behind));
        assert_eq!(target_of(&world, closest), Some(near_weak_behind));
        assert_eq!(target_of(&world, strongest), Some(far_strong_ahead));
        assert_eq!(target_of(&world, weakest), Some(near_weak_behind));
    }

    #[test]
    fn test_range_is_inclusive() {
        let mut world = World::new();
        let edge = enemy(&mut world, 10, 0, 100);
        let _outside = enemy(&mut world, 11, 5, 100);
        let t = tower(&mut world, TargetPriority::First, 10);

        run(&mut world);
        assert_eq!(target_of(&world, t), Some(edge));
    }

    #[test]
    fn test_ties_keep_lowest_id() {
        let mut world = World::new();
        let a = enemy(&mut world, 3, 1, 50);
        let _b = enemy(&mut world, -3, 1, 50);
        let t = tower(&mut world, TargetPriority::Closest, 10);

        run(&mut world);
        assert_eq!(target_of(&world, t), Some(a));
    }

    #[test]
    fn test_clears_target_when_nothing_in_range() {
        let mut world = World::new();
        let e = enemy(&mut world, 3, 0, 50);
        let t = tower(&mut world, TargetPriority::First, 10);
        run(&mut world);
        assert_eq!(target_of(&world, t), Some(e));

        world.destroy(e);
        run(&mut world);
        assert_eq!(target_of(&world, t), None);
    }

    #[test]
    fn test_health_priorities_beyond_fixed_range() {
        let mut world = World::new();
        let giant = enemy(&mut world, 2, 0, u32::MAX);
        let large = enemy(&mut world, 4, 0, 3_000_000_000);
        let strongest = tower(&mut world, TargetPriority::Strongest, 10);
        let weakest = tower(&mut world, TargetPriority::Weakest, 10);

        run(&mut world);
        assert_eq!(target_of(&world, strongest), Some(giant));
        assert_eq!(target_of(&world, weakest), Some(large));
    }

    #[test]
    fn test_huge_range_still_targets() {
        let mut world = World::new();
        let e = enemy(&mut world, 40_000, 0, 10);
        let t = tower(&mut world, TargetPriority::Closest, 60_000);

        run(&mut world);
        assert_eq!(target_of(&world, t), Some(e));
    }
}
