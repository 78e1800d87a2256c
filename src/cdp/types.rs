//! CDP-side data shapes: scripts, call frames, and `RemoteObject` modeled
//! as a tagged enum since CDP's runtime values are dynamically typed.
//! These model only the slice of `Debugger`/`Runtime` this bridge drives -
//! not a general CDP schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PLACEHOLDER_SCHEME: &str = "placeholder://";

/// A parsed script as reported by `Debugger.scriptParsed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    pub script_id: String,
    pub url: String,
    pub source_map_url: Option<String>,
}

impl Script {
    /// Build a script record, synthesizing a `placeholder://` URL when the
    /// runtime didn't report one.
    pub fn new(script_id: impl Into<String>, url: Option<String>, source_map_url: Option<String>) -> Self {
        let script_id = script_id.into();
        let url = match url {
            Some(u) if !u.is_empty() => u,
            _ => format!("{}{}", PLACEHOLDER_SCHEME, script_id),
        };
        Self {
            script_id,
            url,
            source_map_url,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.url.starts_with(PLACEHOLDER_SCHEME)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub script_id: String,
    pub line_number: i64,
    pub column_number: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    pub call_frame_id: String,
    pub function_name: String,
    pub location: Location,
    pub url: String,
    pub scope_chain: Vec<CdpScope>,
    #[serde(rename = "this")]
    pub this_object: Option<RemoteObject>,
    pub return_value: Option<RemoteObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdpScope {
    #[serde(rename = "type")]
    pub type_: String,
    pub object: RemoteObject,
    pub name: Option<String>,
}

/// `Runtime.RemoteObject`, collapsed to a sum type tagged on `"type"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RemoteObject {
    #[serde(rename = "undefined")]
    Undefined,
    #[serde(rename = "boolean")]
    Bool { value: Option<Value>, description: Option<String> },
    #[serde(rename = "number")]
    Number { description: Option<String> },
    #[serde(rename = "string")]
    String { value: Option<Value> },
    #[serde(rename = "function")]
    Function {
        description: Option<String>,
        #[serde(rename = "objectId")]
        object_id: Option<String>,
    },
    #[serde(rename = "object")]
    Object {
        subtype: Option<String>,
        #[serde(rename = "objectId")]
        object_id: Option<String>,
        description: Option<String>,
        preview: Option<ObjectPreview>,
        #[serde(rename = "className")]
        class_name: Option<String>,
    },
    #[serde(rename = "symbol")]
    Symbol { description: Option<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectPreview {
    pub overflow: bool,
    pub properties: Vec<PropertyPreview>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyPreview {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub value: Option<String>,
}

/// `Runtime.PropertyDescriptor`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescriptor {
    pub name: String,
    pub value: Option<RemoteObject>,
    pub get: Option<RemoteObject>,
    pub set: Option<RemoteObject>,
    #[serde(default)]
    pub is_own: bool,
}

/// `Runtime.InternalPropertyDescriptor`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalPropertyDescriptor {
    pub name: String,
    pub value: Option<RemoteObject>,
}

// ---------------------------------------------------------------------
// Event payloads
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PausedParams {
    pub call_frames: Vec<CallFrame>,
    pub reason: String,
    pub data: Option<Value>,
    #[serde(default)]
    pub hit_breakpoints: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptParsedParams {
    pub script_id: String,
    pub url: String,
    pub source_map_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointResolvedParams {
    pub breakpoint_id: String,
    pub location: Location,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleApiCalledParams {
    #[serde(rename = "type")]
    pub type_: String,
    pub args: Vec<RemoteObject>,
}
