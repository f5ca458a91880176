//! Building the persisted record from the flow's answers

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

use crate::answers::AnswerSet;
use crate::color::Rgb;
use crate::config::ColorDefaults;
use crate::consts::{room_color_key, CONF_BG_COLOR, CONF_INSIDE_COLOR, CONF_WALL_COLOR};
use crate::header::MapHeader;
use crate::server::ServerRegion;

/// A position in the persisted color map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSlot {
    Background,
    Wall,
    /// Whole floor of a roomless map
    Inside,
    Room(i64),
}

impl ColorSlot {
    pub fn key(self) -> String {
        match self {
            ColorSlot::Background => CONF_BG_COLOR.to_string(),
            ColorSlot::Wall => CONF_WALL_COLOR.to_string(),
            ColorSlot::Inside => CONF_INSIDE_COLOR.to_string(),
            ColorSlot::Room(id) => room_color_key(id),
        }
    }
}

impl fmt::Display for ColorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Data stored in the config entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapEntryData {
    pub server: ServerRegion,
    pub client_id: String,
    pub client_secret: String,
    pub device_id: String,
    /// Slot key -> color, rooms (or inside) first, then background and wall
    pub colors: IndexMap<String, Rgb>,
}

impl MapEntryData {
    pub fn color(&self, slot: ColorSlot) -> Option<Rgb> {
        self.colors.get(&slot.key()).copied()
    }
}

/// A finished flow: entry title plus entry data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapRecord {
    pub title: String,
    pub data: MapEntryData,
}

impl MapRecord {
    /// Split into the title and JSON data a config entry is created from.
    /// The color slot order carries over into the JSON object.
    pub fn into_entry(self) -> Result<(String, Map<String, Value>), serde_json::Error> {
        let data = serde_json::from_value(serde_json::to_value(&self.data)?)?;
        Ok((self.title, data))
    }
}

/// Merge the answers with `defaults` into the record to persist.
///
/// Colors the user was never asked about take the deployment defaults.
/// If the room step ran, rooms it has no color for take `defaults.unset`.
/// Only rooms listed in `header` get a slot.
pub fn assemble(answers: &AnswerSet, header: &MapHeader, defaults: &ColorDefaults) -> MapRecord {
    let chosen = &answers.colors;
    let mut colors = IndexMap::new();

    match header.rooms() {
        Some(rooms) => {
            for room in rooms {
                let color = match &chosen.rooms {
                    Some(answered) => answered
                        .get(&room.id)
                        .and_then(|answer| answer.color)
                        .unwrap_or(defaults.unset),
                    None => defaults.room,
                };
                colors.insert(ColorSlot::Room(room.id).key(), color);
            }
        }
        None => {
            colors.insert(
                ColorSlot::Inside.key(),
                chosen.inside.unwrap_or(defaults.room),
            );
        }
    }

    colors.insert(
        ColorSlot::Background.key(),
        chosen.background.unwrap_or(defaults.background),
    );
    colors.insert(
        ColorSlot::Wall.key(),
        chosen.wall.unwrap_or(defaults.wall),
    );

    debug!(
        "Assembled {} color slots for device {}",
        colors.len(),
        answers.identity.device_id
    );

    let identity = &answers.identity;
    MapRecord {
        title: identity.name.clone(),
        data: MapEntryData {
            server: identity.server,
            client_id: identity.client_id.clone(),
            client_secret: identity.client_secret.clone(),
            device_id: identity.device_id.clone(),
            colors,
        },
    }
}
