//! Function-calling tool templates and the editable tool list.
//!
//! The enabled tools, together with [`Settings`], make up the setup
//! message for a Gemini Live session.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::error::{Result, StudioError};
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scheduling {
    Interrupt,
    WhenIdle,
    Silent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDeclaration {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_object_schema")]
    pub parameters: Value,
    #[serde(default = "enabled")]
    pub is_enabled: bool,
    #[serde(default = "interrupt")]
    pub scheduling: Scheduling,
}

fn empty_object_schema() -> Value {
    json!({ "type": "OBJECT", "properties": {} })
}

fn enabled() -> bool {
    true
}

fn interrupt() -> Scheduling {
    Scheduling::Interrupt
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Template {
    CustomerSupport,
    PersonalAssistant,
    NavigationSystem,
}

impl Template {
    pub fn tools(self) -> Vec<ToolDeclaration> {
        match self {
            Self::CustomerSupport => customer_support_tools(),
            Self::PersonalAssistant => personal_assistant_tools(),
            Self::NavigationSystem => navigation_system_tools(),
        }
    }
}

fn tool(name: &str, description: &str, parameters: Value) -> ToolDeclaration {
    ToolDeclaration {
        name: name.into(),
        description: description.into(),
        parameters,
        is_enabled: true,
        scheduling: Scheduling::Interrupt,
    }
}

fn customer_support_tools() -> Vec<ToolDeclaration> {
    vec![
        tool(
            "start_return",
            "Starts the return process for an item, collecting necessary details from the user.",
            json!({
                "type": "OBJECT",
                "properties": {
                    "orderId": { "type": "STRING", "description": "The unique identifier for the customer's order, typically found in their confirmation email. For example, 'ORD-12345'." },
                    "itemName": { "type": "STRING", "description": "The specific name of the product the customer wishes to return, as it appears on their order. For example, 'Model X Wireless Mouse'." },
                    "reason": { "type": "STRING", "description": "A detailed explanation from the customer explaining why they are returning the item. Capture as much detail as possible, e.g., 'item arrived damaged' or 'wrong size'." }
                },
                "required": ["orderId", "itemName", "reason"]
            }),
        ),
        tool(
            "get_order_status",
            "Provides the current status of a user's order, searching by order ID or customer details.",
            json!({
                "type": "OBJECT",
                "properties": {
                    "orderId": { "type": "STRING", "description": "The unique identifier for the customer's order. This is the preferred way to look up an order. Example: 'ORD-12345'." },
                    "customerName": { "type": "STRING", "description": "The full name of the customer. Use as a fallback for lookup only if the order ID is not provided." },
                    "customerEmail": { "type": "STRING", "description": "The customer's email address. Use as a fallback for lookup only if the order ID is not provided. Must be a valid email format, e.g., 'jane.doe@example.com'." }
                }
            }),
        ),
        tool(
            "speak_to_representative",
            "Escalates the conversation to a human customer support representative.",
            json!({
                "type": "OBJECT",
                "properties": {
                    "reason": { "type": "STRING", "description": "A concise summary of the customer's problem and the reason for escalation. This will be passed to the human agent to provide context." }
                },
                "required": ["reason"]
            }),
        ),
    ]
}

fn personal_assistant_tools() -> Vec<ToolDeclaration> {
    vec![
        tool(
            "create_calendar_event",
            "Creates a new event in the user's calendar.",
            json!({
                "type": "OBJECT",
                "properties": {
                    "summary": { "type": "STRING", "description": "A short, descriptive title for the calendar event. For example, 'Quarterly Business Review'." },
                    "location": { "type": "STRING", "description": "The physical address or virtual meeting link for the event." },
                    "startTime": { "type": "STRING", "description": "The event's start date and time in ISO 8601 format. Example: '2024-09-27T10:00:00-07:00'." },
                    "endTime": { "type": "STRING", "description": "The event's end date and time in ISO 8601 format. Example: '2024-09-27T11:00:00-07:00'." }
                },
                "required": ["summary", "startTime", "endTime"]
            }),
        ),
        tool(
            "send_email",
            "Sends an email to a specified recipient.",
            json!({
                "type": "OBJECT",
                "properties": {
                    "recipient": { "type": "STRING", "description": "The primary recipient's email address. Must be a valid email format, e.g., 'john.smith@example.com'." },
                    "subject": { "type": "STRING", "description": "The text for the email's subject line. Should be concise and relevant to the email's content." },
                    "body": { "type": "STRING", "description": "The full content of the email's body. Can include line breaks for paragraphs." }
                },
                "required": ["recipient", "subject", "body"]
            }),
        ),
        tool(
            "set_reminder",
            "Sets a reminder for the user.",
            json!({
                "type": "OBJECT",
                "properties": {
                    "task": { "type": "STRING", "description": "A short description of the task the user wants to be reminded of. For example, 'Pick up dry cleaning' or 'Call the doctor'." },
                    "time": { "type": "STRING", "description": "The date and time to trigger the reminder, specified in ISO 8601 format. Example: '2024-09-28T17:00:00-07:00'." }
                },
                "required": ["task", "time"]
            }),
        ),
    ]
}

fn navigation_system_tools() -> Vec<ToolDeclaration> {
    vec![
        tool(
            "find_route",
            "Finds a route to a specified destination.",
            json!({
                "type": "OBJECT",
                "properties": {
                    "destination": { "type": "STRING", "description": "The target address, landmark, or point of interest." },
                    "modeOfTransport": { "type": "STRING", "description": "The desired method of travel. Common values include 'driving', 'walking', 'bicycling', or 'transit'. If not specified, 'driving' is the default." }
                },
                "required": ["destination"]
            }),
        ),
        tool(
            "find_nearby_places",
            "Finds nearby places of a certain type.",
            json!({
                "type": "OBJECT",
                "properties": {
                    "placeType": { "type": "STRING", "description": "The category of place the user is looking for. Examples: 'coffee shop', 'post office', 'ATM', 'park', 'sushi restaurant'." },
                    "radius": { "type": "NUMBER", "description": "The maximum distance in kilometers to search from the user's current location. If not specified, a default radius of 5 km will be used." }
                },
                "required": ["placeType"]
            }),
        ),
        tool(
            "get_traffic_info",
            "Gets real-time traffic information for a specified location.",
            json!({
                "type": "OBJECT",
                "properties": {
                    "location": { "type": "STRING", "description": "The specific area, route, or address for which to retrieve traffic conditions." }
                },
                "required": ["location"]
            }),
        ),
    ]
}

/// Active template plus the user's edits to its tools.
#[derive(Debug, Clone)]
pub struct ToolStore {
    template: Template,
    tools: Vec<ToolDeclaration>,
}

impl Default for ToolStore {
    fn default() -> Self {
        Self::with_template(Template::CustomerSupport)
    }
}

impl ToolStore {
    pub fn with_template(template: Template) -> Self {
        Self {
            template,
            tools: template.tools(),
        }
    }

    pub fn template(&self) -> Template {
        self.template
    }

    pub fn tools(&self) -> &[ToolDeclaration] {
        &self.tools
    }

    /// Switch template, discarding edits.
    pub fn set_template(&mut self, template: Template) {
        *self = Self::with_template(template);
        info!("Tool template set to {template:?}");
    }

    /// Flip a tool's enabled flag. Returns the new state.
    pub fn toggle(&mut self, name: &str) -> Result<bool> {
        let tool = self.find_mut(name)?;
        tool.is_enabled = !tool.is_enabled;
        Ok(tool.is_enabled)
    }

    /// Append a blank, enabled tool named `new_function_N`.
    pub fn add(&mut self) -> &ToolDeclaration {
        let mut n = self.tools.len() + 1;
        while self.tools.iter().any(|t| t.name == format!("new_function_{n}")) {
            n += 1;
        }
        self.tools.push(tool(&format!("new_function_{n}"), "", empty_object_schema()));
        &self.tools[self.tools.len() - 1]
    }

    pub fn remove(&mut self, name: &str) -> Result<()> {
        let before = self.tools.len();
        self.tools.retain(|t| t.name != name);
        if self.tools.len() == before {
            return Err(StudioError::UnknownTool(name.into()));
        }
        Ok(())
    }

    /// Replace the tool called `name`. Renaming onto another tool's name fails.
    pub fn update(&mut self, name: &str, updated: ToolDeclaration) -> Result<()> {
        if updated.name != name && self.tools.iter().any(|t| t.name == updated.name) {
            return Err(StudioError::DuplicateTool(updated.name));
        }
        *self.find_mut(name)? = updated;
        Ok(())
    }

    /// Declarations of enabled tools, in the Gemini `functionDeclarations` shape.
    pub fn function_declarations(&self) -> Vec<Value> {
        self.tools
            .iter()
            .filter(|t| t.is_enabled)
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                })
            })
            .collect()
    }

    fn find_mut(&mut self, name: &str) -> Result<&mut ToolDeclaration> {
        self.tools
            .iter_mut()
            .find(|t| t.name == name)
            .ok_or_else(|| StudioError::UnknownTool(name.into()))
    }
}

/// Setup message for a Gemini Live session with the current settings and tools.
pub fn live_setup(settings: &Settings, tools: &ToolStore) -> Value {
    let mut setup = json!({
        "model": format!("models/{}", settings.model),
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": {
                    "prebuiltVoiceConfig": { "voiceName": settings.voice }
                }
            }
        },
        "systemInstruction": {
            "parts": [{ "text": settings.system_prompt }]
        }
    });

    let declarations = tools.function_declarations();
    if !declarations.is_empty() {
        setup["tools"] = json!([{ "functionDeclarations": declarations }]);
    }
    json!({ "setup": setup })
}
