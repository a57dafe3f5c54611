//! The room catalog: a read-only input the core never mutates.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::requirements::SeatingLayout;

/// A bookable resource as a capability set. The Availability Evaluator and
/// Conflict Resolver only ever see this interface, so other resource kinds
/// (terraces, equipment bundles) can slot in without touching them.
pub trait Bookable {
    /// Stable identifier of the resource.
    fn id(&self) -> &str;

    /// Seats available under the given layout; `None` if the layout is not
    /// supported at all.
    fn capacity_for(&self, layout: SeatingLayout) -> Option<u32>;

    /// Features/products the resource provides.
    fn feature_set(&self) -> &BTreeSet<String>;
}

/// A physical room in the venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Room name; unique within the catalog.
    pub name: String,

    /// Capacity per supported seating layout.
    pub capacities: BTreeMap<SeatingLayout, u32>,

    /// Features the room provides.
    pub features: BTreeSet<String>,
}

impl Room {
    /// Construct a room from its capability set.
    pub fn new<I, S>(name: impl Into<String>, capacities: BTreeMap<SeatingLayout, u32>, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            capacities,
            features: features.into_iter().map(Into::into).collect(),
        }
    }
}

impl Bookable for Room {
    fn id(&self) -> &str {
        &self.name
    }

    fn capacity_for(&self, layout: SeatingLayout) -> Option<u32> {
        self.capacities.get(&layout).copied()
    }

    fn feature_set(&self) -> &BTreeSet<String> {
        &self.features
    }
}

/// The venue's room inventory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoomCatalog {
    rooms: Vec<Room>,
}

impl RoomCatalog {
    /// Build a catalog from a list of rooms.
    pub fn new(rooms: Vec<Room>) -> Self {
        Self { rooms }
    }

    /// All rooms, in catalog order.
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    /// Look up a room by name.
    pub fn get(&self, name: &str) -> Option<&Room> {
        self.rooms.iter().find(|r| r.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn salon() -> Room {
        let mut capacities = BTreeMap::new();
        capacities.insert(SeatingLayout::Banquet, 40);
        capacities.insert(SeatingLayout::Theater, 60);
        Room::new("Salon A", capacities, ["projector", "stage"])
    }

    #[test]
    fn test_capacity_per_layout() {
        let room = salon();
        assert_eq!(room.capacity_for(SeatingLayout::Banquet), Some(40));
        assert_eq!(room.capacity_for(SeatingLayout::Theater), Some(60));
        assert_eq!(room.capacity_for(SeatingLayout::UShape), None);
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = RoomCatalog::new(vec![salon()]);
        assert!(catalog.get("Salon A").is_some());
        assert!(catalog.get("Salon Z").is_none());
        assert_eq!(catalog.rooms().len(), 1);
    }
}
