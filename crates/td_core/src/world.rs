//! Typed entity/component store.
//!
//! Each component type lives in its own `BTreeMap<EntityId, T>`, looked up
//! by `TypeId`. Keying by entity id gives every query a deterministic
//! ascending-id iteration order, which the rest of the simulation relies on
//! for reproducible ticks.
//!
//! Queries borrow the world immutably. Systems that need to write while
//! scanning collect ids with [`World::query_ids`] first and then revisit
//! each entity through [`World::get_mut`], so an entity created mid-pass is
//! never visited by that pass.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Unique identifier for entities.
///
/// Ids are allocated monotonically and never reused within a session, so a
/// stale id held by a projectile or a tower can only ever fail to resolve;
/// it can never silently point at a newer entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Marker trait for data that can be attached to an entity.
pub trait Component: Any + Send + Sync {
    /// Whether this component is one of the mutually exclusive type tags.
    ///
    /// An entity carries at most one exclusive tag.
    const EXCLUSIVE_TAG: bool = false;
}

/// Type-erased view of one component column.
trait ComponentColumn: Send + Sync {
    fn remove_entity(&mut self, id: EntityId) -> bool;
    fn clear(&mut self);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct Column<T>(BTreeMap<EntityId, T>);

impl<T: Component> ComponentColumn for Column<T> {
    fn remove_entity(&mut self, id: EntityId) -> bool {
        self.0.remove(&id).is_some()
    }

    fn clear(&mut self) {
        self.0.clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// The entity/component store.
pub struct World {
    next_id: u64,
    entities: BTreeSet<EntityId>,
    columns: HashMap<TypeId, Box<dyn ComponentColumn>>,
    exclusive_tags: HashMap<EntityId, TypeId>,
}

impl World {
    /// Create an empty world. The first entity gets id 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            entities: BTreeSet::new(),
            columns: HashMap::new(),
            exclusive_tags: HashMap::new(),
        }
    }

    /// Allocate a new entity with no components.
    pub fn create(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.entities.insert(id);
        id
    }

    /// Allocate a new entity carrying every component in `bundle`.
    pub fn spawn<B: Bundle>(&mut self, bundle: B) -> EntityId {
        let id = self.create();
        bundle.insert_into(self, id);
        id
    }

    /// Destroy an entity and every component attached to it.
    ///
    /// Destroying an id that is already gone is a no-op. Returns whether the
    /// entity existed.
    pub fn destroy(&mut self, id: EntityId) -> bool {
        if !self.entities.remove(&id) {
            return false;
        }
        for column in self.columns.values_mut() {
            column.remove_entity(id);
        }
        self.exclusive_tags.remove(&id);
        true
    }

    /// Check if an entity exists.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains(&id)
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the world has no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All live entity ids in ascending order.
    pub fn entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.iter().copied()
    }

    /// Attach (or replace) a component.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidEntity`] if the entity does not exist, or
    /// [`GameError::ConflictingTag`] if `T` is an exclusive tag and the
    /// entity already carries a different one.
    pub fn set<T: Component>(&mut self, id: EntityId, value: T) -> Result<()> {
        if !self.contains(id) {
            return Err(GameError::InvalidEntity(id));
        }

        if T::EXCLUSIVE_TAG {
            if let Some(existing) = self.exclusive_tags.get(&id) {
                if *existing != TypeId::of::<T>() {
                    return Err(GameError::ConflictingTag(id));
                }
            }
        }

        self.insert(id, value);
        Ok(())
    }

    fn insert<T: Component>(&mut self, id: EntityId, value: T) {
        if T::EXCLUSIVE_TAG {
            let previous = self.exclusive_tags.insert(id, TypeId::of::<T>());
            debug_assert!(
                previous.map_or(true, |tag| tag == TypeId::of::<T>()),
                "entity {id} given two type tags"
            );
        }
        self.column_mut::<T>().0.insert(id, value);
    }

    /// Get a component.
    #[must_use]
    pub fn get<T: Component>(&self, id: EntityId) -> Option<&T> {
        self.column::<T>()?.0.get(&id)
    }

    /// Get a mutable reference to a component.
    pub fn get_mut<T: Component>(&mut self, id: EntityId) -> Option<&mut T> {
        self.columns
            .get_mut(&TypeId::of::<T>())?
            .as_any_mut()
            .downcast_mut::<Column<T>>()?
            .0
            .get_mut(&id)
    }

    /// Check whether an entity carries a component.
    #[must_use]
    pub fn has<T: Component>(&self, id: EntityId) -> bool {
        self.get::<T>(id).is_some()
    }

    /// Detach a component, returning it.
    pub fn remove<T: Component>(&mut self, id: EntityId) -> Option<T> {
        let removed = self
            .columns
            .get_mut(&TypeId::of::<T>())?
            .as_any_mut()
            .downcast_mut::<Column<T>>()?
            .0
            .remove(&id);

        if removed.is_some() && T::EXCLUSIVE_TAG {
            self.exclusive_tags.remove(&id);
        }
        removed
    }

    /// Number of entities carrying component `T`.
    #[must_use]
    pub fn count<T: Component>(&self) -> usize {
        self.column::<T>().map_or(0, |column| column.0.len())
    }

    /// Lazily iterate over entities holding every component in `Q`.
    ///
    /// Entities are yielded in ascending id order, each at most once.
    pub fn query<Q: Query>(&self) -> impl Iterator<Item = (EntityId, Q::Item<'_>)> + '_ {
        self.entities
            .iter()
            .filter_map(move |&id| Q::fetch(self, id).map(|item| (id, item)))
    }

    /// Collect the ids matching `Q`, for passes that mutate as they go.
    #[must_use]
    pub fn query_ids<Q: Query>(&self) -> Vec<EntityId> {
        self.query::<Q>().map(|(id, _)| id).collect()
    }

    /// Remove every entity and component. Entity ids keep counting up.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.exclusive_tags.clear();
        for column in self.columns.values_mut() {
            column.clear();
        }
    }

    fn column<T: Component>(&self) -> Option<&Column<T>> {
        self.columns
            .get(&TypeId::of::<T>())?
            .as_any()
            .downcast_ref::<Column<T>>()
    }

    fn column_mut<T: Component>(&mut self) -> &mut Column<T> {
        let column = self
            .columns
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Column::<T>(BTreeMap::new())));

        // Columns are only ever inserted under their own TypeId, just above.
        match column.as_any_mut().downcast_mut::<Column<T>>() {
            Some(column) => column,
            None => unreachable!("component column registered under a foreign TypeId"),
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.entities.len())
            .field("component_types", &self.columns.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

/// A set of components inserted together by [`World::spawn`].
///
/// Implemented for tuples of up to eight [`Component`] values. A bundle must
/// not contain two exclusive tags.
pub trait Bundle {
    /// Attach every component to `id`.
    fn insert_into(self, world: &mut World, id: EntityId);
}

macro_rules! impl_bundle {
    ($($name:ident),+) => {
        impl<$($name: Component),+> Bundle for ($($name,)+) {
            #[allow(non_snake_case)]
            fn insert_into(self, world: &mut World, id: EntityId) {
                let ($($name,)+) = self;
                $(world.insert(id, $name);)+
            }
        }
    };
}

impl_bundle!(A);
impl_bundle!(A, B);
impl_bundle!(A, B, C);
impl_bundle!(A, B, C, D);
impl_bundle!(A, B, C, D, E);
impl_bundle!(A, B, C, D, E, F);
impl_bundle!(A, B, C, D, E, F, G);
impl_bundle!(A, B, C, D, E, F, G, H);

/// A set of component types that can be fetched together.
///
/// Implemented for tuples of up to five [`Component`] types.
pub trait Query {
    /// References yielded for one matching entity.
    type Item<'w>;

    /// Fetch the components of `id`, or `None` if any is missing.
    fn fetch(world: &World, id: EntityId) -> Option<Self::Item<'_>>;
}

macro_rules! impl_query {
    ($($name:ident),+) => {
        impl<$($name: Component),+> Query for ($($name,)+) {
            type Item<'w> = ($(&'w $name,)+);

            fn fetch(world: &World, id: EntityId) -> Option<Self::Item<'_>> {
                Some(($(world.get::<$name>(id)?,)+))
            }
        }
    };
}

impl_query!(A);
impl_query!(A, B);
impl_query!(A, B, C);
impl_query!(A, B, C, D);
impl_query!(A, B, C, D, E);
