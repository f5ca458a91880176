//! Tuya Cloud Map Extractor
//!
//! Config flow for an integration that renders a robot vacuum's map from
//! the Tuya cloud. The flow checks the user's cloud credentials by
//! fetching the map header, then asks for display colors. Which color
//! questions are asked depends on that header: maps with named rooms get
//! one color per room, roomless maps get a single "inside" color.
//!
//! # Key Types
//!
//! - [`TuyaMapConfigFlow`] - The multi-step setup wizard
//! - [`assemble`] - Merges answers and defaults into the persisted record
//! - [`MapFetcher`] - The blocking cloud call the first step validates with
//! - [`MapExtractorConfig`] - Form defaults and color defaults

pub mod answers;
pub mod client;
pub mod color;
pub mod config;
pub mod config_flow;
pub mod consts;
pub mod entry_data;
pub mod header;
pub mod server;

pub use answers::{AnswerSet, ColorAnswers, DeviceIdentity, RoomAnswer};
pub use client::{fetch_map_header, FetchError, MapFetcher, MapImage};
pub use color::Rgb;
pub use config::{ColorDefaults, ConfigError, ConfigResult, MapExtractorConfig};
pub use config_flow::{flow_factory, TuyaMapConfigFlow};
pub use consts::DOMAIN;
pub use entry_data::{assemble, ColorSlot, MapEntryData, MapRecord};
pub use header::{MapHeader, Room};
pub use server::ServerRegion;
