//! Conversation turn log for the chat surface.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSource {
    pub uri: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundingChunk {
    pub web: Option<WebSource>,
}

/// A turn as submitted, before it is timestamped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTurn {
    pub role: Role,
    pub text: String,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub tool_use_request: Option<Value>,
    #[serde(default)]
    pub tool_use_response: Option<Value>,
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    pub timestamp: DateTime<Local>,
    pub role: Role,
    pub text: String,
    pub is_final: bool,
    pub tool_use_request: Option<Value>,
    pub tool_use_response: Option<Value>,
    pub grounding_chunks: Vec<GroundingChunk>,
}

/// Partial update for the most recent turn; `None` fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnUpdate {
    pub text: Option<String>,
    pub is_final: Option<bool>,
    pub tool_use_request: Option<Value>,
    pub tool_use_response: Option<Value>,
    pub grounding_chunks: Option<Vec<GroundingChunk>>,
}

#[derive(Debug, Default)]
pub struct ConversationLog {
    turns: Vec<ConversationTurn>,
}

impl ConversationLog {
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn add_turn(&mut self, turn: NewTurn) {
        self.turns.push(ConversationTurn {
            timestamp: Local::now(),
            role: turn.role,
            text: turn.text,
            is_final: turn.is_final,
            tool_use_request: turn.tool_use_request,
            tool_use_response: turn.tool_use_response,
            grounding_chunks: turn.grounding_chunks,
        });
    }

    /// Merge `update` into the last turn. Returns false when the log is empty.
    pub fn update_last_turn(&mut self, update: TurnUpdate) -> bool {
        let Some(last) = self.turns.last_mut() else {
            return false;
        };
        if let Some(text) = update.text {
            last.text = text;
        }
        if let Some(is_final) = update.is_final {
            last.is_final = is_final;
        }
        if update.tool_use_request.is_some() {
            last.tool_use_request = update.tool_use_request;
        }
        if update.tool_use_response.is_some() {
            last.tool_use_response = update.tool_use_response;
        }
        if let Some(chunks) = update.grounding_chunks {
            last.grounding_chunks = chunks;
        }
        true
    }

    pub fn clear_turns(&mut self) {
        self.turns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: Role, text: &str) -> NewTurn {
        NewTurn {
            role,
            text: text.into(),
            is_final: false,
            tool_use_request: None,
            tool_use_response: None,
            grounding_chunks: Vec::new(),
        }
    }

    #[test]
    fn update_last_turn_merges_fields() {
        let mut log = ConversationLog::default();
        assert!(!log.update_last_turn(TurnUpdate::default()));

        log.add_turn(turn(Role::User, "hi"));
        log.add_turn(turn(Role::Agent, "Hel"));
        assert!(log.update_last_turn(TurnUpdate {
            text: Some("Hello! [giggles]".into()),
            is_final: Some(true),
            ..TurnUpdate::default()
        }));

        let turns = log.turns();
        assert_eq!(turns[0].text, "hi");
        assert!(!turns[0].is_final);
        assert_eq!(turns[1].text, "Hello! [giggles]");
        assert!(turns[1].is_final);
        assert_eq!(turns[1].role, Role::Agent);
    }

    #[test]
    fn partial_update_keeps_timestamp_and_text() {
        let mut log = ConversationLog::default();
        log.add_turn(turn(Role::Agent, "route found"));
        let stamped = log.turns()[0].timestamp;

        log.update_last_turn(TurnUpdate {
            grounding_chunks: Some(vec![GroundingChunk {
                web: Some(WebSource {
                    uri: "https://example.com".into(),
                    title: "Example".into(),
                }),
            }]),
            ..TurnUpdate::default()
        });

        let last = &log.turns()[0];
        assert_eq!(last.timestamp, stamped);
        assert_eq!(last.text, "route found");
        assert_eq!(last.grounding_chunks.len(), 1);
    }

    #[test]
    fn new_turn_deserializes_camel_case() {
        let turn: NewTurn =
            serde_json::from_str(r#"{"role":"system","text":"ready","isFinal":true}"#).unwrap();
        assert_eq!(turn.role, Role::System);
        assert!(turn.is_final);

        let mut log = ConversationLog::default();
        log.add_turn(turn);
        log.clear_turns();
        assert!(log.turns().is_empty());
    }
}
