//! Config flow for the Tuya cloud map
//!
//! ```text
//! user ──(colors off)──────────────────────────────> entry
//!   │
//!   └─(colors on)─> colorconf ──(roomless or room colors off)──> entry
//!                       │
//!                       └─(room colors on)─> room_colors ──> entry
//! ```
//!
//! The `user` step fetches the map header once the credentials are
//! submitted. Whether `colorconf` asks for room colors or a single inside
//! color depends on that header.

use async_trait::async_trait;
use ha_config_flow::{
    ConfigFlow, FieldKind, FlowError, FlowFactory, FormStep, Schema, SchemaError, StepOutcome,
    UserInput,
};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::answers::{AnswerSet, DeviceIdentity, RoomAnswer};
use crate::client::{fetch_map_header, FetchError, MapFetcher};
use crate::color::Rgb;
use crate::config::MapExtractorConfig;
use crate::consts::{
    room_color_key, room_name_key, CONF_BG_COLOR, CONF_CLIENT_ID, CONF_CLIENT_SECRET,
    CONF_COLORS, CONF_DEVICE_ID, CONF_INSIDE_COLOR, CONF_NAME, CONF_ROOM_COLORS, CONF_SERVER,
    CONF_WALL_COLOR, DOMAIN, ERROR_BASE, ERROR_UNKNOWN, STEP_COLOR_CONF, STEP_ROOM_COLORS,
    STEP_USER,
};
use crate::entry_data::assemble;
use crate::header::MapHeader;
use crate::server::ServerRegion;

/// What the flow knows once the credentials checked out
#[derive(Debug, Clone)]
struct FlowContext {
    header: MapHeader,
    answers: AnswerSet,
}

#[derive(Debug, Clone)]
enum Stage {
    /// Waiting for working credentials
    Identity,
    ColorConf(FlowContext),
    RoomColors(FlowContext),
}

/// Setup wizard for one vacuum map
pub struct TuyaMapConfigFlow {
    fetcher: Arc<dyn MapFetcher>,
    config: Arc<MapExtractorConfig>,
    stage: Stage,
    /// Values shown on the identity form; the last submission after a failure
    prefill: Option<DeviceIdentity>,
}

impl TuyaMapConfigFlow {
    pub fn new(fetcher: Arc<dyn MapFetcher>, config: Arc<MapExtractorConfig>) -> Self {
        Self {
            fetcher,
            config,
            stage: Stage::Identity,
            prefill: None,
        }
    }

    async fn step_user(&mut self, user_input: Option<UserInput>) -> Result<StepOutcome, FlowError> {
        let Some(input) = user_input else {
            return Ok(self.user_form(HashMap::new()).into());
        };

        let identity = DeviceIdentity {
            name: string_answer(&input, CONF_NAME)?,
            server: server_answer(&input)?,
            client_id: string_answer(&input, CONF_CLIENT_ID)?,
            client_secret: string_answer(&input, CONF_CLIENT_SECRET)?,
            device_id: string_answer(&input, CONF_DEVICE_ID)?,
        };
        let configure_colors = bool_answer(&input, CONF_COLORS)?;

        let header = match fetch_map_header(self.fetcher.clone(), &identity).await {
            Ok((header, _image)) => header,
            Err(e) => {
                let errors = fetch_errors(&e, &identity);
                self.prefill = Some(identity);
                return Ok(self.user_form(errors).into());
            }
        };

        info!(
            "Fetched map header for device {} ({} rooms)",
            identity.device_id,
            header.rooms().map_or(0, |rooms| rooms.len())
        );

        self.prefill = Some(identity.clone());
        let context = FlowContext {
            header,
            answers: AnswerSet::new(identity),
        };

        if configure_colors {
            let form = color_form(&context.header);
            self.stage = Stage::ColorConf(context);
            Ok(form.into())
        } else {
            self.finish(context)
        }
    }

    async fn step_colorconf(
        &mut self,
        user_input: Option<UserInput>,
    ) -> Result<StepOutcome, FlowError> {
        let Stage::ColorConf(context) = &self.stage else {
            return Err(FlowError::unknown_step(DOMAIN, STEP_COLOR_CONF));
        };

        let Some(input) = user_input else {
            return Ok(color_form(&context.header).into());
        };

        let unset = self.config.colors.unset;
        let background = color_answer(&input, CONF_BG_COLOR)?.unwrap_or(unset);
        let wall = color_answer(&input, CONF_WALL_COLOR)?.unwrap_or(unset);

        // Roomed maps ask whether to color rooms; roomless ones ask for inside
        let (inside, configure_rooms) = if context.header.is_roomless() {
            (color_answer(&input, CONF_INSIDE_COLOR)?, false)
        } else {
            (None, bool_answer(&input, CONF_ROOM_COLORS)?)
        };

        let context = FlowContext {
            header: context.header.clone(),
            answers: context.answers.with_base_colors(background, wall, inside),
        };

        if configure_rooms {
            let form = room_form(&context.header);
            self.stage = Stage::RoomColors(context);
            Ok(form.into())
        } else {
            self.finish(context)
        }
    }

    async fn step_room_colors(
        &mut self,
        user_input: Option<UserInput>,
    ) -> Result<StepOutcome, FlowError> {
        let Stage::RoomColors(context) = &self.stage else {
            return Err(FlowError::unknown_step(DOMAIN, STEP_ROOM_COLORS));
        };

        let Some(input) = user_input else {
            return Ok(room_form(&context.header).into());
        };

        let unset = self.config.colors.unset;
        let mut rooms = IndexMap::new();
        for room in context.header.rooms().unwrap_or_default() {
            let name = match input.get(&room_name_key(room.id)) {
                Some(_) => string_answer(&input, &room_name_key(room.id))?,
                None => room.name.clone(),
            };
            let color = color_answer(&input, &room_color_key(room.id))?.unwrap_or(unset);
            rooms.insert(
                room.id,
                RoomAnswer {
                    name,
                    color: Some(color),
                },
            );
        }

        let context = FlowContext {
            header: context.header.clone(),
            answers: context.answers.with_rooms(rooms),
        };
        self.finish(context)
    }

    /// Build the entry. The stage is left as is so a failed save can be resubmitted.
    fn finish(&self, context: FlowContext) -> Result<StepOutcome, FlowError> {
        let record = assemble(&context.answers, &context.header, &self.config.colors);
        let (title, data) = record.into_entry()?;

        debug!("Config flow for {} finished", title);
        Ok(StepOutcome::create_entry(title, data))
    }

    fn user_form(&self, errors: HashMap<String, String>) -> FormStep {
        let (name, server, client_id, client_secret, device_id) = match &self.prefill {
            Some(identity) => (
                identity.name.clone(),
                identity.server,
                identity.client_id.clone(),
                identity.client_secret.clone(),
                identity.device_id.clone(),
            ),
            None => (
                self.config.default_name.clone(),
                self.config.default_server,
                String::new(),
                String::new(),
                String::new(),
            ),
        };

        let schema = Schema::new()
            .required_with_default(CONF_NAME, FieldKind::String, name)
            .required_with_default(
                CONF_SERVER,
                FieldKind::Select(ServerRegion::select_options()),
                server.host(),
            )
            .required_with_default(CONF_CLIENT_ID, FieldKind::String, client_id)
            .required_with_default(CONF_CLIENT_SECRET, FieldKind::String, client_secret)
            .required_with_default(CONF_DEVICE_ID, FieldKind::String, device_id)
            .required_with_default(CONF_COLORS, FieldKind::Boolean, false);

        FormStep::new(STEP_USER, schema).with_errors(errors)
    }
}

#[async_trait]
impl ConfigFlow for TuyaMapConfigFlow {
    fn domain(&self) -> &str {
        DOMAIN
    }

    async fn step(
        &mut self,
        step_id: &str,
        user_input: Option<UserInput>,
    ) -> Result<StepOutcome, FlowError> {
        debug!("Running {} step {}", DOMAIN, step_id);

        match step_id {
            STEP_USER => self.step_user(user_input).await,
            STEP_COLOR_CONF => self.step_colorconf(user_input).await,
            STEP_ROOM_COLORS => self.step_room_colors(user_input).await,
            other => Err(FlowError::unknown_step(DOMAIN, other)),
        }
    }
}

/// Factory the flow manager registers for [`DOMAIN`]
pub fn flow_factory(fetcher: Arc<dyn MapFetcher>, config: MapExtractorConfig) -> FlowFactory {
    let config = Arc::new(config);
    Arc::new(move || {
        Box::new(TuyaMapConfigFlow::new(fetcher.clone(), config.clone())) as Box<dyn ConfigFlow>
    })
}

fn color_form(header: &MapHeader) -> FormStep {
    let schema = Schema::new()
        .optional(CONF_BG_COLOR, FieldKind::ColorRgb)
        .optional(CONF_WALL_COLOR, FieldKind::ColorRgb);

    let schema = if header.is_roomless() {
        schema.optional(CONF_INSIDE_COLOR, FieldKind::ColorRgb)
    } else {
        schema.required_with_default(CONF_ROOM_COLORS, FieldKind::Boolean, false)
    };

    FormStep::new(STEP_COLOR_CONF, schema)
}

fn room_form(header: &MapHeader) -> FormStep {
    let rooms = header.rooms().unwrap_or_default();
    let schema = rooms.iter().fold(Schema::new(), |schema, room| {
        schema
            .required_with_default(room_name_key(room.id), FieldKind::String, room.name.clone())
            .optional(room_color_key(room.id), FieldKind::ColorRgb)
    });

    FormStep::new(STEP_ROOM_COLORS, schema)
        .with_placeholder("rooms", rooms.len().to_string())
        .last_step(true)
}

/// Form errors for a failed fetch
fn fetch_errors(error: &FetchError, identity: &DeviceIdentity) -> HashMap<String, String> {
    let (field, key) = match error {
        FetchError::BadClientId => (CONF_CLIENT_ID, CONF_CLIENT_ID),
        FetchError::BadClientSecret => (CONF_CLIENT_SECRET, CONF_CLIENT_SECRET),
        FetchError::BadDeviceId => (CONF_DEVICE_ID, CONF_DEVICE_ID),
        FetchError::BadServer => (CONF_SERVER, CONF_SERVER),
        FetchError::Unknown(detail) => {
            error!(
                "Unexpected error fetching map for device {}: {}",
                identity.device_id, detail
            );
            (ERROR_BASE, ERROR_UNKNOWN)
        }
    };

    HashMap::from([(field.to_string(), key.to_string())])
}

fn invalid(field: &str, expected: &'static str) -> FlowError {
    FlowError::InvalidInput(SchemaError::InvalidValue {
        field: field.to_string(),
        expected,
    })
}

fn required<'a>(input: &'a UserInput, field: &str) -> Result<&'a Value, FlowError> {
    input
        .get(field)
        .ok_or_else(|| FlowError::InvalidInput(SchemaError::MissingRequired(field.to_string())))
}

fn string_answer(input: &UserInput, field: &str) -> Result<String, FlowError> {
    required(input, field)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(field, "str"))
}

fn bool_answer(input: &UserInput, field: &str) -> Result<bool, FlowError> {
    required(input, field)?
        .as_bool()
        .ok_or_else(|| invalid(field, "bool"))
}

fn server_answer(input: &UserInput) -> Result<ServerRegion, FlowError> {
    string_answer(input, CONF_SERVER)?
        .parse()
        .map_err(|_| invalid(CONF_SERVER, "one of the listed options"))
}

/// A color field; `None` when it was left blank
fn color_answer(input: &UserInput, field: &str) -> Result<Option<Rgb>, FlowError> {
    input
        .get(field)
        .map(|value| {
            serde_json::from_value::<Rgb>(value.clone()).map_err(|_| invalid(field, "an RGB color"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MapImage;
    use crate::header::Room;
    use ha_config_entries::{ConfigEntries, Storage};
    use ha_config_flow::{ConfigFlowHandler, FlowManager, FlowResultType};
    use serde_json::{json, Map};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Replies with queued results, then with the last header forever
    struct ScriptedFetcher {
        replies: Mutex<VecDeque<Result<MapHeader, FetchError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn new(replies: Vec<Result<MapHeader, FetchError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl MapFetcher for ScriptedFetcher {
        fn fetch_map(
            &self,
            _server: ServerRegion,
            _client_id: &str,
            _client_secret: &str,
            _device_id: &str,
        ) -> Result<(MapHeader, MapImage), FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::Unknown("no scripted reply".to_string())));
            reply.map(|header| (header, MapImage::default()))
        }
    }

    fn three_rooms() -> MapHeader {
        MapHeader::with_rooms(vec![
            Room::new(1, "Hall"),
            Room::new(2, "Kitchen"),
            Room::new(3, "Office"),
        ])
    }

    fn flow(fetcher: Arc<ScriptedFetcher>) -> TuyaMapConfigFlow {
        TuyaMapConfigFlow::new(fetcher, Arc::new(MapExtractorConfig::default()))
    }

    fn input(value: Value) -> UserInput {
        value.as_object().unwrap().clone()
    }

    fn identity_input(colors: bool) -> UserInput {
        input(json!({
            "name": "Downstairs",
            "server": "openapi.tuyaus.com",
            "client_id": "cid",
            "client_secret": "secret",
            "device_id": "bf01",
            "colors": colors
        }))
    }

    fn form(outcome: StepOutcome) -> FormStep {
        match outcome {
            StepOutcome::Form(form) => form,
            other => panic!("expected a form, got {:?}", other),
        }
    }

    fn entry(outcome: StepOutcome) -> (String, Map<String, Value>) {
        match outcome {
            StepOutcome::CreateEntry { title, data } => (title, data),
            other => panic!("expected an entry, got {:?}", other),
        }
    }

    fn default_of(form: &FormStep, field: &str) -> Value {
        form.schema.field(field).unwrap().default.clone().unwrap()
    }

    #[tokio::test]
    async fn test_initial_form() {
        let mut flow = flow(ScriptedFetcher::new(vec![]));
        let form = form(flow.step("user", None).await.unwrap());

        assert_eq!(form.step_id, "user");
        let names: Vec<_> = form.schema.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["name", "server", "client_id", "client_secret", "device_id", "colors"]
        );
        assert_eq!(default_of(&form, "name"), json!("Vacuum map"));
        assert_eq!(default_of(&form, "server"), json!("openapi.tuyaeu.com"));
        assert_eq!(default_of(&form, "client_id"), json!(""));
        assert_eq!(default_of(&form, "colors"), json!(false));
        assert!(form.errors.is_empty());
    }

    #[tokio::test]
    async fn test_colors_off_roomless_finishes_immediately() {
        let fetcher = ScriptedFetcher::new(vec![Ok(MapHeader::roomless())]);
        let mut flow = flow(fetcher.clone());

        let (title, data) = entry(flow.step("user", Some(identity_input(false))).await.unwrap());

        assert_eq!(title, "Downstairs");
        assert_eq!(
            Value::Object(data),
            json!({
                "server": "openapi.tuyaus.com",
                "client_id": "cid",
                "client_secret": "secret",
                "device_id": "bf01",
                "colors": {
                    "inside": [70, 70, 70],
                    "background": [0, 0, 0],
                    "wall": [0, 0, 0]
                }
            })
        );
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_colors_off_roomed_uses_room_default() {
        let mut flow = flow(ScriptedFetcher::new(vec![Ok(three_rooms())]));
        let (_, data) = entry(flow.step("user", Some(identity_input(false))).await.unwrap());

        assert_eq!(
            data["colors"],
            json!({
                "room_color_1": [70, 70, 70],
                "room_color_2": [70, 70, 70],
                "room_color_3": [70, 70, 70],
                "background": [0, 0, 0],
                "wall": [0, 0, 0]
            })
        );
    }

    #[tokio::test]
    async fn test_room_colors_declined() {
        let mut flow = flow(ScriptedFetcher::new(vec![Ok(three_rooms())]));

        let colorconf = form(flow.step("user", Some(identity_input(true))).await.unwrap());
        assert_eq!(colorconf.step_id, "colorconf");
        assert!(colorconf.schema.field("room_colors").is_some());
        assert!(colorconf.schema.field("inside").is_none());
        assert!(!colorconf.schema.field("background").unwrap().required);

        let (_, data) = entry(
            flow.step(
                "colorconf",
                Some(input(json!({
                    "background": [44, 50, 64],
                    "wall": [255, 255, 255],
                    "room_colors": false
                }))),
            )
            .await
            .unwrap(),
        );

        let colors = data["colors"].as_object().unwrap();
        assert_eq!(colors.len(), 5);
        for id in 1..=3 {
            assert_eq!(colors[&format!("room_color_{}", id)], json!([70, 70, 70]));
        }
        assert_eq!(colors["background"], json!([44, 50, 64]));
        assert_eq!(colors["wall"], json!([255, 255, 255]));
        assert!(!colors.contains_key("inside"));
    }

    #[tokio::test]
    async fn test_roomless_color_step_blank_fields_get_unset_fill() {
        let mut flow = flow(ScriptedFetcher::new(vec![Ok(MapHeader::roomless())]));

        let colorconf = form(flow.step("user", Some(identity_input(true))).await.unwrap());
        assert!(colorconf.schema.field("inside").is_some());
        assert!(colorconf.schema.field("room_colors").is_none());

        let (_, data) = entry(
            flow.step("colorconf", Some(input(json!({"wall": [9, 9, 9]}))))
                .await
                .unwrap(),
        );

        assert_eq!(
            data["colors"],
            json!({"inside": [70, 70, 70], "background": [0, 0, 0], "wall": [9, 9, 9]})
        );
    }

    #[tokio::test]
    async fn test_bad_device_id_reshows_identity_form() {
        let fetcher = ScriptedFetcher::new(vec![Err(FetchError::BadDeviceId), Ok(MapHeader::roomless())]);
        let mut flow = flow(fetcher.clone());

        let retry = form(flow.step("user", Some(identity_input(true))).await.unwrap());

        assert_eq!(retry.step_id, "user");
        assert_eq!(
            retry.errors,
            HashMap::from([("device_id".to_string(), "device_id".to_string())])
        );
        assert_eq!(default_of(&retry, "name"), json!("Downstairs"));
        assert_eq!(default_of(&retry, "server"), json!("openapi.tuyaus.com"));
        assert_eq!(default_of(&retry, "client_id"), json!("cid"));
        assert_eq!(default_of(&retry, "client_secret"), json!("secret"));
        assert_eq!(default_of(&retry, "device_id"), json!("bf01"));

        // Nothing was stored, so the color step is not reachable yet
        assert!(matches!(
            flow.step("colorconf", None).await,
            Err(FlowError::UnknownStep { .. })
        ));

        let colorconf = form(flow.step("user", Some(identity_input(true))).await.unwrap());
        assert_eq!(colorconf.step_id, "colorconf");
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_each_fetch_error_marks_its_field() {
        let cases = [
            (FetchError::BadClientId, "client_id", "client_id"),
            (FetchError::BadClientSecret, "client_secret", "client_secret"),
            (FetchError::BadServer, "server", "server"),
            (FetchError::Unknown("timeout".to_string()), "base", "unknown"),
        ];

        for (error, field, key) in cases {
            let mut flow = flow(ScriptedFetcher::new(vec![Err(error)]));
            let retry = form(flow.step("user", Some(identity_input(false))).await.unwrap());
            assert_eq!(retry.errors.len(), 1);
            assert_eq!(retry.errors[field], key);
        }
    }

    #[tokio::test]
    async fn test_room_step_blank_color_and_names_dropped() {
        let mut flow = flow(ScriptedFetcher::new(vec![Ok(three_rooms())]));

        flow.step("user", Some(identity_input(true))).await.unwrap();
        let rooms = form(
            flow.step(
                "colorconf",
                Some(input(json!({"background": [1, 1, 1], "room_colors": true}))),
            )
            .await
            .unwrap(),
        );

        assert_eq!(rooms.step_id, "room_colors");
        assert_eq!(rooms.last_step, Some(true));
        assert_eq!(default_of(&rooms, "room_name_2"), json!("Kitchen"));
        assert!(!rooms.schema.field("room_color_2").unwrap().required);

        let (title, data) = entry(
            flow.step(
                "room_colors",
                Some(input(json!({
                    "room_name_1": "Hall",
                    "room_color_1": [10, 0, 0],
                    "room_name_2": "Galley",
                    "room_name_3": "Office",
                    "room_color_3": [0, 0, 30]
                }))),
            )
            .await
            .unwrap(),
        );

        assert_eq!(title, "Downstairs");
        assert_eq!(
            data["colors"],
            json!({
                "room_color_1": [10, 0, 0],
                "room_color_2": [0, 0, 0],
                "room_color_3": [0, 0, 30],
                "background": [1, 1, 1],
                "wall": [0, 0, 0]
            })
        );
        assert!(!data.keys().any(|k| k.starts_with("room_name_")));
        assert!(!data.contains_key("name"));
    }

    #[tokio::test]
    async fn test_final_step_can_be_resubmitted() {
        let fetcher = ScriptedFetcher::new(vec![Ok(MapHeader::roomless())]);
        let mut flow = flow(fetcher.clone());
        flow.step("user", Some(identity_input(true))).await.unwrap();

        let submission = input(json!({"inside": [3, 3, 3]}));
        let first = entry(flow.step("colorconf", Some(submission.clone())).await.unwrap());
        let second = entry(flow.step("colorconf", Some(submission)).await.unwrap());

        assert_eq!(first, second);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_step() {
        let mut flow = flow(ScriptedFetcher::new(vec![]));
        assert!(matches!(
            flow.step("reauth", None).await,
            Err(FlowError::UnknownStep { .. })
        ));
    }

    fn manager(fetcher: Arc<ScriptedFetcher>) -> (TempDir, FlowManager) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Arc::new(Storage::new(temp_dir.path()));
        let manager = FlowManager::new(Arc::new(ConfigEntries::new(storage)));
        manager.register(DOMAIN, flow_factory(fetcher, MapExtractorConfig::default()));
        (temp_dir, manager)
    }

    #[tokio::test]
    async fn test_manager_room_flow_persists_once() {
        let fetcher = ScriptedFetcher::new(vec![Ok(three_rooms())]);
        let (_dir, manager) = manager(fetcher.clone());

        let start = manager.start_flow(DOMAIN, false).await.unwrap();
        let flow_id = start.flow_id.clone();

        let colorconf = manager
            .progress_flow(
                &flow_id,
                Some(json!({
                    "server": "openapi.tuyaus.com",
                    "client_id": "cid",
                    "client_secret": "secret",
                    "device_id": "bf01",
                    "colors": true
                })),
            )
            .await
            .unwrap();
        assert_eq!(colorconf.step_id.as_deref(), Some("colorconf"));

        let rooms = manager
            .progress_flow(&flow_id, Some(json!({"wall": [2, 2, 2], "room_colors": true})))
            .await
            .unwrap();
        assert_eq!(rooms.step_id.as_deref(), Some("room_colors"));

        let done = manager
            .progress_flow(&flow_id, Some(json!({"room_color_2": [5, 5, 5]})))
            .await
            .unwrap();
        assert_eq!(done.result_type, FlowResultType::CreateEntry);
        assert_eq!(done.title.as_deref(), Some("Vacuum map"));

        let entries = manager.entries().get_by_domain(DOMAIN);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Vacuum map");
        assert_eq!(
            entries[0].data["colors"],
            json!({
                "room_color_1": [0, 0, 0],
                "room_color_2": [5, 5, 5],
                "room_color_3": [0, 0, 0],
                "background": [0, 0, 0],
                "wall": [2, 2, 2]
            })
        );

        let again = manager
            .progress_flow(&flow_id, Some(json!({"room_color_2": [5, 5, 5]})))
            .await;
        assert!(matches!(again, Err(FlowError::UnknownFlow(_))));
        assert_eq!(manager.entries().len(), 1);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_manager_retries_after_failed_save() {
        let fetcher = ScriptedFetcher::new(vec![Ok(MapHeader::roomless())]);
        let temp_dir = TempDir::new().unwrap();
        let config_dir = temp_dir.path().join("config");
        std::fs::write(&config_dir, "").unwrap();
        let manager = FlowManager::new(Arc::new(ConfigEntries::new(Arc::new(Storage::new(
            &config_dir,
        )))));
        manager.register(DOMAIN, flow_factory(fetcher.clone(), MapExtractorConfig::default()));

        let start = manager.start_flow(DOMAIN, false).await.unwrap();
        manager
            .progress_flow(
                &start.flow_id,
                Some(json!({"client_id": "c", "client_secret": "s", "device_id": "d", "colors": true})),
            )
            .await
            .unwrap();

        let colors = json!({"background": [4, 4, 4]});
        let failed = manager.progress_flow(&start.flow_id, Some(colors.clone())).await;
        assert!(matches!(failed, Err(FlowError::Persist(_))));
        assert_eq!(manager.active_flows().await, 1);
        assert!(manager.entries().is_empty());

        // Let the storage directory be created this time
        std::fs::remove_file(&config_dir).unwrap();

        let done = manager.progress_flow(&start.flow_id, Some(colors)).await.unwrap();
        assert_eq!(done.result_type, FlowResultType::CreateEntry);
        assert_eq!(manager.entries().len(), 1);
        assert_eq!(manager.active_flows().await, 0);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_manager_rejects_inside_color_for_roomed_map() {
        let (_dir, manager) = manager(ScriptedFetcher::new(vec![Ok(three_rooms())]));

        let start = manager.start_flow(DOMAIN, false).await.unwrap();
        manager
            .progress_flow(
                &start.flow_id,
                Some(json!({"client_id": "c", "client_secret": "s", "device_id": "d", "colors": true})),
            )
            .await
            .unwrap();

        let result = manager
            .progress_flow(&start.flow_id, Some(json!({"inside": [1, 2, 3]})))
            .await;
        assert!(matches!(result, Err(FlowError::InvalidInput(_))));
        assert_eq!(manager.active_flows().await, 1);
    }

    #[tokio::test]
    async fn test_manager_failed_fetch_keeps_flow_open() {
        let (_dir, manager) = manager(ScriptedFetcher::new(vec![Err(FetchError::BadClientSecret)]));

        let start = manager.start_flow(DOMAIN, false).await.unwrap();
        let retry = manager
            .progress_flow(
                &start.flow_id,
                Some(json!({"client_id": "c", "client_secret": "wrong", "device_id": "d"})),
            )
            .await
            .unwrap();

        assert_eq!(retry.step_id.as_deref(), Some("user"));
        assert_eq!(
            retry.errors,
            Some(HashMap::from([("client_secret".to_string(), "client_secret".to_string())]))
        );
        assert!(manager.entries().is_empty());
        assert_eq!(manager.active_flows().await, 1);
    }
}
