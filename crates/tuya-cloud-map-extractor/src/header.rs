//! Map header returned by the cloud

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A named region of the map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    #[serde(rename = "ID")]
    pub id: i64,
    pub name: String,
}

impl Room {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Header of a vacuum map
///
/// Only the room list drives the config flow. Everything else the cloud
/// sends is kept as-is in `attributes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapHeader {
    /// Rooms in display order; absent on roomless maps
    #[serde(rename = "roominfo", default, skip_serializing_if = "Option::is_none")]
    room_info: Option<Vec<Room>>,

    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl MapHeader {
    /// Header of a map without named rooms
    pub fn roomless() -> Self {
        Self::default()
    }

    /// Header of a map with the given rooms
    pub fn with_rooms(rooms: Vec<Room>) -> Self {
        Self {
            room_info: Some(rooms),
            attributes: Map::new(),
        }
    }

    /// Rooms in display order, or `None` for a roomless map.
    ///
    /// An empty room list counts as roomless.
    pub fn rooms(&self) -> Option<&[Room]> {
        self.room_info.as_deref().filter(|rooms| !rooms.is_empty())
    }

    pub fn is_roomless(&self) -> bool {
        self.rooms().is_none()
    }
}
