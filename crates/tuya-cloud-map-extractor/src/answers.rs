//! Answers collected across the config flow
//!
//! Each step hands back a new [`AnswerSet`] instead of mutating a shared
//! one, so a rejected submission can never leave half an update behind.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::server::ServerRegion;

/// Who the map belongs to and how to reach it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Display name; becomes the entry title
    pub name: String,
    pub server: ServerRegion,
    pub client_id: String,
    pub client_secret: String,
    pub device_id: String,
}

/// Answers for one room on the room color form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomAnswer {
    pub name: String,
    /// `None` when the user left the color blank
    pub color: Option<Rgb>,
}

/// Colors the user chose. `None` means the question was never answered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorAnswers {
    pub background: Option<Rgb>,
    pub wall: Option<Rgb>,
    /// Only asked for roomless maps
    pub inside: Option<Rgb>,
    /// Room id -> answer, in form order.
    ///
    /// `Some` exactly when the room color step ran.
    pub rooms: Option<IndexMap<i64, RoomAnswer>>,
}

impl ColorAnswers {
    pub fn room_step_ran(&self) -> bool {
        self.rooms.is_some()
    }
}

/// Everything answered so far in one flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSet {
    pub identity: DeviceIdentity,
    pub colors: ColorAnswers,
}

impl AnswerSet {
    /// Answers right after the identity step
    pub fn new(identity: DeviceIdentity) -> Self {
        Self {
            identity,
            colors: ColorAnswers::default(),
        }
    }

    /// Record the color step: background, wall and (roomless maps) inside
    pub fn with_base_colors(&self, background: Rgb, wall: Rgb, inside: Option<Rgb>) -> Self {
        Self {
            identity: self.identity.clone(),
            colors: ColorAnswers {
                background: Some(background),
                wall: Some(wall),
                inside,
                rooms: self.colors.rooms.clone(),
            },
        }
    }

    /// Record the room color step
    pub fn with_rooms(&self, rooms: IndexMap<i64, RoomAnswer>) -> Self {
        Self {
            identity: self.identity.clone(),
            colors: ColorAnswers {
                rooms: Some(rooms),
                ..self.colors.clone()
            },
        }
    }
}
