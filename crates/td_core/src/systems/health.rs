//! Health system: removes dead enemies.

use crate::components::{Enemy, EnemyTag, Health};
use crate::events::GameEvent;
use crate::world::{EntityId, World};

/// An enemy killed this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Defeat {
    /// Destroyed enemy.
    pub id: EntityId,
    /// Gold owed to each player.
    pub reward: u32,
}

/// Destroy every enemy at zero health and report the rewards owed.
pub fn run(world: &mut World, events: &mut Vec<GameEvent>) -> Vec<Defeat> {
    let defeats: Vec<Defeat> = world
        .query::<(EnemyTag, Enemy, Health)>()
        .filter(|(_, (_, _, health))| health.is_dead())
        .map(|(id, (_, enemy, _))| Defeat {
            id,
            reward: enemy.reward,
        })
        .collect();

    for defeat in &defeats {
        world.destroy(defeat.id);
        events.push(GameEvent::EnemyDefeated {
            id: defeat.id,
            gold_reward: defeat.reward,
        });
    }

    defeats
}
