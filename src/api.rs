//! HTTP control API for the studio.
//!
//! Every mutation answers with a small `{status, ...}` JSON body; failures
//! come back as `{status: "error", error}` with a 200 so simple clients
//! only need to look at one field.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::catalog::Persona;
use crate::conversation::{ConversationLog, ConversationTurn, NewTurn, TurnUpdate};
use crate::orchestrator::{Orchestrator, StatusSnapshot, TranscriptEntry, TriggerOutcome};
use crate::settings::{CustomTags, Settings};
use crate::tools::{self, Template, ToolDeclaration, ToolStore};

#[derive(Clone)]
pub struct StudioApiState {
    pub orchestrator: Arc<Orchestrator>,
    pub tags: Arc<Mutex<CustomTags>>,
    pub settings: Arc<Mutex<Settings>>,
    pub tools: Arc<Mutex<ToolStore>>,
    pub conversation: Arc<Mutex<ConversationLog>>,
}

// --- Request/Response types ---

#[derive(Deserialize)]
struct TagRequest {
    tag: String,
}

#[derive(Deserialize)]
struct EnhanceRequest {
    text: String,
}

#[derive(Deserialize)]
struct SetVoiceRequest {
    voice: String,
}

#[derive(Deserialize)]
struct SetSystemPromptRequest {
    system_prompt: String,
}

#[derive(Deserialize)]
struct SetTemplateRequest {
    template: Template,
}

#[derive(Serialize)]
struct PersonaView {
    #[serde(flatten)]
    persona: Persona,
    loading: bool,
    playing: bool,
    error: bool,
}

#[derive(Serialize)]
struct ToolsResponse {
    template: Template,
    tools: Vec<ToolDeclaration>,
}

#[derive(Serialize)]
struct SettingsResponse {
    #[serde(flatten)]
    settings: Settings,
    live_setup: Value,
}

#[derive(Debug, Serialize)]
struct SimpleResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    changed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool: Option<ToolDeclaration>,
}

impl SimpleResponse {
    fn ok(status: &str) -> Self {
        Self {
            status: status.into(),
            error: None,
            changed: None,
            text: None,
            voice: None,
            tool: None,
        }
    }

    fn err(message: impl ToString) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Self::ok("error")
        }
    }

    fn changed(changed: bool) -> Self {
        Self {
            changed: Some(changed),
            ..Self::ok("ok")
        }
    }
}

/// Build the axum router.
pub fn router(state: StudioApiState) -> Router {
    Router::new()
        .route("/status", get(handle_status))
        .route("/personas", get(handle_personas))
        .route("/personas/{id}/play", post(handle_play))
        .route("/stop", post(handle_stop))
        .route("/transcripts", get(handle_transcripts))
        .route("/tags", get(handle_list_tags).post(handle_add_tag))
        .route("/tags/{tag}", axum::routing::delete(handle_remove_tag))
        .route("/enhance", post(handle_enhance))
        .route("/settings", get(handle_settings))
        .route("/settings/voice", post(handle_set_voice))
        .route("/settings/system-prompt", post(handle_set_system_prompt))
        .route("/tools", get(handle_tools).post(handle_add_tool))
        .route("/tools/template", post(handle_set_template))
        .route("/tools/{name}/toggle", post(handle_toggle_tool))
        .route("/tools/{name}", put(handle_update_tool).delete(handle_remove_tool))
        .route(
            "/conversation",
            get(handle_conversation)
                .post(handle_add_turn)
                .delete(handle_clear_conversation),
        )
        .route("/conversation/last", axum::routing::patch(handle_update_last_turn))
        .with_state(state)
}

/// Bind the control API and serve it as a background tokio task.
pub async fn start_studio_api(state: StudioApiState, host: &str, port: u16) -> std::io::Result<()> {
    let app = router(state);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Studio API listening on {addr}");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!("Studio API server error: {e}");
        }
    });
    Ok(())
}

// --- Personas & playback ---

async fn handle_status(State(state): State<StudioApiState>) -> Json<StatusSnapshot> {
    Json(state.orchestrator.status())
}

async fn handle_personas(State(state): State<StudioApiState>) -> Json<Vec<PersonaView>> {
    let request = state.orchestrator.status().request;
    let is = |slot: &Option<String>, id: &str| slot.as_deref() == Some(id);
    let views = state
        .orchestrator
        .catalog()
        .personas()
        .iter()
        .map(|p| PersonaView {
            loading: is(&request.loading, &p.id),
            playing: is(&request.playing, &p.id),
            error: is(&request.error, &p.id),
            persona: p.clone(),
        })
        .collect();
    Json(views)
}

async fn handle_play(
    State(state): State<StudioApiState>,
    Path(id): Path<String>,
) -> Json<SimpleResponse> {
    if state.orchestrator.catalog().get(&id).is_none() {
        return Json(SimpleResponse::err(format!("Unknown persona: {id}")));
    }
    info!("HTTP /personas/{id}/play");

    // Fire-and-forget: progress is visible through /status
    let orchestrator = Arc::clone(&state.orchestrator);
    tokio::spawn(async move {
        match orchestrator.trigger(&id).await {
            Ok(TriggerOutcome::Ignored) => info!("Play {id} ignored, another request is loading"),
            Ok(outcome) => info!("Play {id}: {outcome:?}"),
            Err(e) => warn!("Play {id} failed: {e}"),
        }
    });

    Json(SimpleResponse::ok("accepted"))
}

async fn handle_stop(State(state): State<StudioApiState>) -> Json<SimpleResponse> {
    let stopped = state.orchestrator.stop();
    Json(SimpleResponse {
        changed: Some(stopped),
        ..SimpleResponse::ok("stopped")
    })
}

async fn handle_transcripts(State(state): State<StudioApiState>) -> Json<Vec<TranscriptEntry>> {
    Json(state.orchestrator.history())
}

// --- Audio tags ---

async fn handle_list_tags(State(state): State<StudioApiState>) -> Json<Vec<String>> {
    Json(state.tags.lock().tags().to_vec())
}

async fn handle_add_tag(
    State(state): State<StudioApiState>,
    Json(req): Json<TagRequest>,
) -> Json<SimpleResponse> {
    match state.tags.lock().add(&req.tag) {
        Ok(changed) => Json(SimpleResponse::changed(changed)),
        Err(e) => Json(SimpleResponse::err(e)),
    }
}

async fn handle_remove_tag(
    State(state): State<StudioApiState>,
    Path(tag): Path<String>,
) -> Json<SimpleResponse> {
    match state.tags.lock().remove(&tag) {
        Ok(changed) => Json(SimpleResponse::changed(changed)),
        Err(e) => Json(SimpleResponse::err(e)),
    }
}

async fn handle_enhance(
    State(state): State<StudioApiState>,
    Json(req): Json<EnhanceRequest>,
) -> Json<SimpleResponse> {
    if req.text.trim().is_empty() {
        return Json(SimpleResponse::err("empty text"));
    }
    let tags = state.tags.lock().tags().to_vec();
    match state.orchestrator.enhance(&tags, &req.text).await {
        Ok(text) => Json(SimpleResponse {
            text: Some(text),
            ..SimpleResponse::ok("ok")
        }),
        Err(e) => {
            warn!("Enhance failed: {e}");
            Json(SimpleResponse::err(e))
        }
    }
}

// --- Chat settings & tools ---

async fn handle_settings(State(state): State<StudioApiState>) -> Json<SettingsResponse> {
    let settings = state.settings.lock().clone();
    let live_setup = tools::live_setup(&settings, &state.tools.lock());
    Json(SettingsResponse {
        settings,
        live_setup,
    })
}

async fn handle_set_voice(
    State(state): State<StudioApiState>,
    Json(req): Json<SetVoiceRequest>,
) -> Json<SimpleResponse> {
    let mut settings = state.settings.lock();
    match settings.set_voice(&req.voice) {
        Ok(()) => Json(SimpleResponse {
            voice: Some(settings.voice.clone()),
            ..SimpleResponse::ok("ok")
        }),
        Err(e) => Json(SimpleResponse::err(e)),
    }
}

async fn handle_set_system_prompt(
    State(state): State<StudioApiState>,
    Json(req): Json<SetSystemPromptRequest>,
) -> Json<SimpleResponse> {
    state.settings.lock().set_system_prompt(req.system_prompt);
    Json(SimpleResponse::ok("ok"))
}

async fn handle_tools(State(state): State<StudioApiState>) -> Json<ToolsResponse> {
    let store = state.tools.lock();
    Json(ToolsResponse {
        template: store.template(),
        tools: store.tools().to_vec(),
    })
}

async fn handle_set_template(
    State(state): State<StudioApiState>,
    Json(req): Json<SetTemplateRequest>,
) -> Json<SimpleResponse> {
    state.tools.lock().set_template(req.template);
    Json(SimpleResponse::ok("ok"))
}

async fn handle_add_tool(State(state): State<StudioApiState>) -> Json<SimpleResponse> {
    let tool = state.tools.lock().add().clone();
    Json(SimpleResponse {
        tool: Some(tool),
        ..SimpleResponse::ok("ok")
    })
}

async fn handle_toggle_tool(
    State(state): State<StudioApiState>,
    Path(name): Path<String>,
) -> Json<SimpleResponse> {
    match state.tools.lock().toggle(&name) {
        Ok(enabled) => Json(SimpleResponse::changed(enabled)),
        Err(e) => Json(SimpleResponse::err(e)),
    }
}

async fn handle_update_tool(
    State(state): State<StudioApiState>,
    Path(name): Path<String>,
    Json(tool): Json<ToolDeclaration>,
) -> Json<SimpleResponse> {
    match state.tools.lock().update(&name, tool) {
        Ok(()) => Json(SimpleResponse::ok("ok")),
        Err(e) => Json(SimpleResponse::err(e)),
    }
}

async fn handle_remove_tool(
    State(state): State<StudioApiState>,
    Path(name): Path<String>,
) -> Json<SimpleResponse> {
    match state.tools.lock().remove(&name) {
        Ok(()) => Json(SimpleResponse::ok("ok")),
        Err(e) => Json(SimpleResponse::err(e)),
    }
}

// --- Conversation log ---

async fn handle_conversation(State(state): State<StudioApiState>) -> Json<Vec<ConversationTurn>> {
    Json(state.conversation.lock().turns().to_vec())
}

async fn handle_add_turn(
    State(state): State<StudioApiState>,
    Json(turn): Json<NewTurn>,
) -> Json<SimpleResponse> {
    state.conversation.lock().add_turn(turn);
    Json(SimpleResponse::ok("ok"))
}

async fn handle_update_last_turn(
    State(state): State<StudioApiState>,
    Json(update): Json<TurnUpdate>,
) -> Json<SimpleResponse> {
    if state.conversation.lock().update_last_turn(update) {
        Json(SimpleResponse::ok("ok"))
    } else {
        Json(SimpleResponse::err("conversation is empty"))
    }
}

async fn handle_clear_conversation(State(state): State<StudioApiState>) -> Json<SimpleResponse> {
    state.conversation.lock().clear_turns();
    Json(SimpleResponse::ok("cleared"))
}
