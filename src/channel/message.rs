use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An inbound real-time message: a JSON object with a string `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ChannelMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Human-readable text the backend attaches to most events.
    pub fn text(&self) -> Option<&str> {
        self.get("message").and_then(Value::as_str)
    }

    /// Typed view of the message, if it is one of the known project events.
    pub fn event(&self) -> Option<ProjectEvent> {
        let value = serde_json::to_value(self).ok()?;
        serde_json::from_value(value).ok()
    }
}

/// Project events pushed by the backend on `/ws/{project_id}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProjectEvent {
    Connected {
        project_id: i64,
        #[serde(default)]
        project_name: Option<String>,
    },
    Pong {
        project_id: i64,
    },
    Status {
        project_id: i64,
        status: String,
        #[serde(default)]
        created_at: Option<String>,
    },
    TransformationStarted {
        #[serde(default)]
        mode: Option<String>,
    },
    TransformationCompleted {
        #[serde(default)]
        files_count: Option<u64>,
        #[serde(default)]
        improvements: Option<Value>,
    },
    TransformationFailed {
        #[serde(default)]
        error: Option<String>,
    },
    MlTransformationStarted {
        #[serde(default)]
        ml_frameworks: Vec<String>,
        #[serde(default)]
        target: Option<String>,
    },
}
