//! Integration constants: domain, form field names, step ids

/// Integration domain
pub const DOMAIN: &str = "tuya_cloud_map_extractor";

// Identity step
pub const CONF_NAME: &str = "name";
pub const CONF_SERVER: &str = "server";
pub const CONF_CLIENT_ID: &str = "client_id";
pub const CONF_CLIENT_SECRET: &str = "client_secret";
pub const CONF_DEVICE_ID: &str = "device_id";
/// "Configure colors" flag on the identity step; also the record's nested color map key
pub const CONF_COLORS: &str = "colors";

// Color step
pub const CONF_BG_COLOR: &str = "background";
pub const CONF_WALL_COLOR: &str = "wall";
pub const CONF_INSIDE_COLOR: &str = "inside";
pub const CONF_ROOM_COLORS: &str = "room_colors";

// Room step, suffixed with the room id
pub const CONF_ROOM_COLOR: &str = "room_color_";
pub const CONF_ROOM_NAME: &str = "room_name_";

/// Error key used when the failure is not tied to a field
pub const ERROR_BASE: &str = "base";
pub const ERROR_UNKNOWN: &str = "unknown";

pub const STEP_USER: &str = "user";
pub const STEP_COLOR_CONF: &str = "colorconf";
pub const STEP_ROOM_COLORS: &str = "room_colors";

pub const DEFAULT_NAME: &str = "Vacuum map";

pub fn room_color_key(room_id: i64) -> String {
    format!("{}{}", CONF_ROOM_COLOR, room_id)
}

pub fn room_name_key(room_id: i64) -> String {
    format!("{}{}", CONF_ROOM_NAME, room_id)
}
