//! The variable engine: translates a CDP `RemoteObject` into a DAP
//! variable tree, including property-container paging, getter/setter
//! handling, scope construction, evaluation, and completions.

use crate::cdp::client::{RpcClient, RpcClientExt};
use crate::cdp::types::{CallFrame, PropertyDescriptor, RemoteObject};
use crate::dap::types::CompletionItem;
use crate::Result;
use serde_json::{json, Value};
use std::cmp::Ordering;

/// What a translated `RemoteObject` renders as in DAP, plus the paging
/// counts needed to mint a `variablesReference` when it has children.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDescription {
    pub value: String,
    pub object_id: Option<String>,
    pub indexed_count: i64,
    pub named_count: i64,
}

impl VariableDescription {
    fn leaf(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            object_id: None,
            indexed_count: 0,
            named_count: 0,
        }
    }

    pub fn has_children(&self) -> bool {
        self.object_id.is_some() && (self.indexed_count > 0 || self.named_count > 0)
    }
}

pub struct VariableEngine;

impl VariableEngine {
    /// Translate a `RemoteObject` into its display string and paging counts. Object
    /// variables whose children require an extra CDP round trip (arrays
    /// without a preview, sets/maps without a preview) are described with
    /// a best-effort count of `0`; callers needing the precise count
    /// should use [`VariableEngine::object_counts`] once the object has
    /// been fetched with a preview, or fall back to runtime evaluation.
    pub fn describe(obj: &RemoteObject) -> VariableDescription {
        match obj {
            RemoteObject::Undefined => VariableDescription::leaf("undefined"),
            RemoteObject::Bool { value, .. } => {
                VariableDescription::leaf(value.as_ref().map(|v| v.to_string()).unwrap_or_default())
            }
            RemoteObject::Number { description } => {
                VariableDescription::leaf(description.clone().unwrap_or_default())
            }
            RemoteObject::String { value } => VariableDescription::leaf(
                value
                    .as_ref()
                    .map(|v| serde_json::to_string(v).unwrap_or_default())
                    .unwrap_or_default(),
            ),
            RemoteObject::Symbol { description } => {
                VariableDescription::leaf(description.clone().unwrap_or_default())
            }
            RemoteObject::Function { description, object_id } => {
                let desc = description.clone().unwrap_or_default();
                let value = if let Some(brace) = desc.find('{') {
                    format!("{}{{ … }}", &desc[..brace])
                } else if let Some(arrow) = desc.find("=>") {
                    format!("{} …", &desc[..arrow + 2])
                } else {
                    desc
                };
                VariableDescription {
                    value,
                    object_id: object_id.clone(),
                    indexed_count: 0,
                    named_count: 0,
                }
            }
            RemoteObject::Object {
                subtype,
                object_id,
                description,
                preview,
                ..
            } => {
                if subtype.as_deref() == Some("null") {
                    return VariableDescription::leaf("null");
                }
                if subtype.as_deref() == Some("internal#location") {
                    return VariableDescription::leaf("internal#location");
                }
                let desc = description.clone().unwrap_or_default();
                let value = if subtype.as_deref() == Some("error") {
                    desc.split('\n').next().unwrap_or(&desc).to_string()
                } else if matches!(subtype.as_deref(), Some("promise") | Some("generator")) {
                    let status = preview
                        .as_ref()
                        .and_then(|p| p.properties.iter().find(|pr| pr.name == "[[PromiseStatus]]" || pr.name == "[[GeneratorStatus]]"))
                        .and_then(|pr| pr.value.clone())
                        .unwrap_or_default();
                    format!("{} {{ {} }}", desc, status)
                } else {
                    desc
                };

                let (indexed_count, named_count) = Self::preview_counts(subtype.as_deref(), preview.as_ref());

                VariableDescription {
                    value,
                    object_id: object_id.clone(),
                    indexed_count,
                    named_count,
                }
            }
        }
    }

    /// Best-effort counts derivable from an `ObjectPreview` alone, per the
    /// array/set/map rules. Returns `(0, 0)` when no
    /// preview is present or it's truncated. The caller must fall back
    /// to `object_counts_via_eval`.
    fn preview_counts(subtype: Option<&str>, preview: Option<&crate::cdp::types::ObjectPreview>) -> (i64, i64) {
        let Some(preview) = preview else { return (0, 0) };
        if preview.overflow {
            return (0, 0);
        }
        match subtype {
            Some("array") | Some("typedarray") => (preview.properties.len() as i64, 0),
            Some("set") | Some("map") => (0, preview.properties.len() as i64 + 1),
            _ => (0, preview.properties.len() as i64),
        }
    }

    /// Counts for array-likes without a usable preview: evaluated on the
    /// target: `[this.length, Object.keys(this).length - this.length]`.
    pub async fn array_counts_via_eval(rpc: &dyn RpcClient, object_id: &str) -> Result<(i64, i64)> {
        let result: Value = rpc
            .call_typed(
                "Runtime.callFunctionOn",
                json!({
                    "objectId": object_id,
                    "functionDeclaration": "function(){return [this.length, Object.keys(this).length - this.length]}",
                    "returnByValue": true,
                }),
            )
            .await?;
        Self::parse_count_pair(result)
    }

    /// Counts for set/map without a usable preview: `[0,
    /// Object.keys(this).length + 1]`.
    pub async fn set_map_counts_via_eval(rpc: &dyn RpcClient, object_id: &str) -> Result<(i64, i64)> {
        let result: Value = rpc
            .call_typed(
                "Runtime.callFunctionOn",
                json!({
                    "objectId": object_id,
                    "functionDeclaration": "function(){return [0, Object.keys(this).length + 1]}",
                    "returnByValue": true,
                }),
            )
            .await?;
        Self::parse_count_pair(result)
    }

    fn parse_count_pair(result: Value) -> Result<(i64, i64)> {
        let pair = result
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(result);
        let arr = pair.as_array().ok_or_else(|| crate::Error::Cdp("expected a count pair".to_string()))?;
        let a = arr.first().and_then(Value::as_i64).unwrap_or(0);
        let b = arr.get(1).and_then(Value::as_i64).unwrap_or(0);
        Ok((a, b))
    }

    /// Fetch and merge a property container's properties: own properties
    /// plus accessor properties, later wins on name collision. Getter
    /// accessors are invoked; a thrown getter surfaces its
    /// message as the value rather than erroring. Setter-only properties
    /// render as the literal `"setter"`.
    pub async fn get_properties(rpc: &dyn RpcClient, object_id: &str) -> Result<Vec<(String, RemoteObject)>> {
        let own: Value = rpc
            .call(
                "Runtime.getProperties",
                json!({"objectId": object_id, "ownProperties": true, "generatePreview": true}),
            )
            .await?;
        let accessors: Value = rpc
            .call(
                "Runtime.getProperties",
                json!({"objectId": object_id, "accessorPropertiesOnly": true, "generatePreview": true}),
            )
            .await?;

        let mut merged: Vec<(String, RemoteObject)> = Vec::new();
        let internal_properties = own.get("internalProperties").cloned();
        Self::merge_descriptors(&mut merged, own, rpc, object_id).await?;
        Self::merge_descriptors(&mut merged, accessors, rpc, object_id).await?;

        if let Some(internal) = internal_properties {
            if let Some(items) = internal.as_array() {
                for item in items {
                    if let (Some(name), Some(value)) = (
                        item.get("name").and_then(Value::as_str),
                        item.get("value").cloned(),
                    ) {
                        if let Ok(obj) = serde_json::from_value::<RemoteObject>(value) {
                            Self::upsert(&mut merged, name.to_string(), obj);
                        }
                    }
                }
            }
        }

        merged.sort_by(|a, b| Self::compare_variable_names(&a.0, &b.0));
        Ok(merged)
    }

    async fn merge_descriptors(
        target: &mut Vec<(String, RemoteObject)>,
        raw: Value,
        rpc: &dyn RpcClient,
        this_object_id: &str,
    ) -> Result<()> {
        let Some(result) = raw.get("result").and_then(Value::as_array) else {
            return Ok(());
        };
        for item in result {
            let descriptor: PropertyDescriptor = match serde_json::from_value(item.clone()) {
                Ok(d) => d,
                Err(_) => continue,
            };
            if let Some(value) = descriptor.value {
                Self::upsert(target, descriptor.name, value);
                continue;
            }
            if let Some(getter) = descriptor.get {
                let invoked = Self::invoke_getter(rpc, this_object_id, &descriptor.name, &getter).await;
                Self::upsert(target, descriptor.name, invoked);
                continue;
            }
            if descriptor.set.is_some() {
                Self::upsert(
                    target,
                    descriptor.name,
                    RemoteObject::String {
                        value: Some(Value::String("setter".to_string())),
                    },
                );
            }
        }
        Ok(())
    }

    async fn invoke_getter(
        rpc: &dyn RpcClient,
        this_object_id: &str,
        name: &str,
        getter: &RemoteObject,
    ) -> RemoteObject {
        let getter_id = match getter {
            RemoteObject::Function { object_id: Some(id), .. } => id.clone(),
            _ => return RemoteObject::Undefined,
        };
        let result: std::result::Result<Value, crate::Error> = rpc
            .call(
                "Runtime.callFunctionOn",
                json!({
                    "objectId": getter_id,
                    "functionDeclaration": "function(){return this}",
                    "thisObjectId": this_object_id,
                }),
            )
            .await;
        match result {
            Ok(v) => {
                if v.get("exceptionDetails").is_some() {
                    let message = v
                        .pointer("/exceptionDetails/exception/description")
                        .and_then(Value::as_str)
                        .unwrap_or("getter threw")
                        .to_string();
                    return RemoteObject::String { value: Some(Value::String(message)) };
                }
                v.get("result")
                    .cloned()
                    .and_then(|r| serde_json::from_value(r).ok())
                    .unwrap_or(RemoteObject::Undefined)
            }
            Err(e) => RemoteObject::String {
                value: Some(Value::String(format!("{} getter failed: {}", name, e))),
            },
        }
    }

    /// Paged expansion: evaluates `getIndexedVariables`/`getNamedVariablesFn`
    /// on the target depending on `filter`, then recursively expands that
    /// helper's result, keeping only the names the filter asked for. Used
    /// when a DAP `variables` request supplies both `start` and `count`,
    /// so a client paging a large array gets only the slice it asked for
    /// instead of the whole merged property list.
    pub async fn get_paged_properties(
        rpc: &dyn RpcClient,
        object_id: &str,
        filter: &str,
        start: i64,
        count: i64,
    ) -> Result<Vec<(String, RemoteObject)>> {
        let function_declaration = if filter == "named" {
            format!(
                "function getNamedVariablesFn() {{ \
                     var keys = Object.keys(this).filter(function(k) {{ return !/^(0|[1-9][0-9]*)$/.test(k); }}); \
                     var out = {{}}; \
                     keys.slice({start}, {start} + {count}).forEach(function(k) {{ out[k] = this[k]; }}, this); \
                     return out; \
                 }}"
            )
        } else {
            format!(
                "function getIndexedVariables() {{ \
                     var out = []; \
                     var end = Math.min(this.length || 0, {start} + {count}); \
                     for (var i = {start}; i < end; i++) {{ out.push(this[i]); }} \
                     return out; \
                 }}"
            )
        };

        let raw: Value = rpc
            .call(
                "Runtime.callFunctionOn",
                json!({"objectId": object_id, "functionDeclaration": function_declaration}),
            )
            .await?;
        let Some(helper_id) = raw.pointer("/result/objectId").and_then(Value::as_str) else {
            return Ok(Vec::new());
        };

        let keep_indexed = filter != "named";
        let props = Self::get_properties(rpc, helper_id).await?;
        Ok(props.into_iter().filter(|(name, _)| Self::is_indexed_name(name) == keep_indexed).collect())
    }

    fn upsert(target: &mut Vec<(String, RemoteObject)>, name: String, value: RemoteObject) {
        if let Some(existing) = target.iter_mut().find(|(n, _)| *n == name) {
            existing.1 = value;
        } else {
            target.push((name, value));
        }
    }

    /// `true` for names matching the decimal-integer pattern (no leading
    /// zeros except `"0"` itself); these sort before named properties.
    pub fn is_indexed_name(name: &str) -> bool {
        if name == "0" {
            return true;
        }
        let mut chars = name.chars();
        match chars.next() {
            Some(c) if c.is_ascii_digit() && c != '0' => chars.all(|c| c.is_ascii_digit()),
            _ => false,
        }
    }

    /// Numeric-index names before named ones; indexed names compare
    /// numerically, named ones lexicographically.
    pub fn compare_variable_names(a: &str, b: &str) -> Ordering {
        match (Self::is_indexed_name(a), Self::is_indexed_name(b)) {
            (true, true) => a.parse::<u64>().unwrap_or(0).cmp(&b.parse::<u64>().unwrap_or(0)),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => a.cmp(b),
        }
    }

    /// `evaluate(expr, frameId?)`: evaluates on a call
    /// frame when one is available, otherwise at the global context.
    /// `context` is the DAP request's own `context` field ("watch",
    /// "hover", "repl", ...); a `ReferenceError` is only rewritten to
    /// "not available" outside `"repl"`, where the raw message is more
    /// useful at a prompt than a canned placeholder.
    pub async fn evaluate(rpc: &dyn RpcClient, expr: &str, frame: Option<&CallFrame>, context: Option<&str>) -> Result<RemoteObject> {
        let raw: Value = if let Some(frame) = frame {
            rpc.call(
                "Debugger.evaluateOnCallFrame",
                json!({"callFrameId": frame.call_frame_id, "expression": expr, "generatePreview": true}),
            )
            .await?
        } else {
            rpc.call(
                "Runtime.evaluate",
                json!({"expression": expr, "contextId": 1, "generatePreview": true}),
            )
            .await?
        };

        if let Some(message) = raw.pointer("/exceptionDetails/exception/description").and_then(Value::as_str) {
            let rewritten = if message.starts_with("ReferenceError:") && context != Some("repl") {
                "not available".to_string()
            } else {
                message.to_string()
            };
            return Ok(RemoteObject::String { value: Some(Value::String(rewritten)) });
        }

        let result = raw.get("result").cloned().unwrap_or(Value::Null);
        serde_json::from_value(result).map_err(|e| crate::Error::Cdp(format!("malformed evaluate result: {}", e)))
    }

    /// Evaluate the RHS silently, then write it back via
    /// `Debugger.setVariableValue` (for locals/scope slots) or
    /// `Runtime.callFunctionOn` with a synthesized setter (for object
    /// properties). Returns the new string representation.
    pub async fn set_variable_on_frame(
        rpc: &dyn RpcClient,
        frame: &CallFrame,
        scope_number: i64,
        variable_name: &str,
        value_expr: &str,
    ) -> Result<String> {
        let new_value = Self::evaluate(rpc, value_expr, Some(frame), None).await?;
        let serialized = serde_json::to_value(&new_value).unwrap_or(Value::Null);
        rpc.call(
            "Debugger.setVariableValue",
            json!({
                "scopeNumber": scope_number,
                "variableName": variable_name,
                "newValue": serialized,
                "callFrameId": frame.call_frame_id,
            }),
        )
        .await?;
        Ok(Self::describe(&new_value).value)
    }

    pub async fn set_property(
        rpc: &dyn RpcClient,
        object_id: &str,
        property_name: &str,
        value_expr: &str,
        frame: Option<&CallFrame>,
    ) -> Result<String> {
        let new_value = Self::evaluate(rpc, value_expr, frame, None).await?;
        let serialized = serde_json::to_string(&serde_json::to_value(&new_value).unwrap_or(Value::Null))
            .unwrap_or_else(|_| "undefined".to_string());
        rpc.call(
            "Runtime.callFunctionOn",
            json!({
                "objectId": object_id,
                "functionDeclaration": format!("function(v){{ this[{:?}] = v; return this[{:?}]; }}", property_name, property_name),
                "arguments": [{"value": serde_json::from_str::<Value>(&serialized).unwrap_or(Value::Null)}],
            }),
        )
        .await?;
        Ok(Self::describe(&new_value).value)
    }

    /// `completions(expr, column, frameId?)`.
    pub async fn completions(
        rpc: &dyn RpcClient,
        prefix: &str,
        frame: Option<&CallFrame>,
    ) -> Result<Vec<CompletionItem>> {
        if let Some(dot) = prefix.rfind('.') {
            let left = &prefix[..dot];
            let script = "(function(x){var a=[];for(var o=x;o;o=o.__proto__)a.push(Object.getOwnPropertyNames(o));return a})";
            let expr = format!("{}({})", script, left);
            let names = Self::flattened_names_via_eval(rpc, &expr, frame).await?;
            return Ok(Self::names_to_completions(names));
        }

        let Some(frame) = frame else { return Ok(Vec::new()) };
        let mut names = Vec::new();
        for scope in &frame.scope_chain {
            if let RemoteObject::Object { object_id: Some(id), .. } = &scope.object {
                for (name, _) in Self::get_properties(rpc, id).await.unwrap_or_default() {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
            }
        }
        Ok(Self::names_to_completions(names))
    }

    async fn flattened_names_via_eval(rpc: &dyn RpcClient, expr: &str, frame: Option<&CallFrame>) -> Result<Vec<String>> {
        let raw: Value = if let Some(frame) = frame {
            rpc.call(
                "Debugger.evaluateOnCallFrame",
                json!({"callFrameId": frame.call_frame_id, "expression": expr, "returnByValue": true}),
            )
            .await?
        } else {
            rpc.call("Runtime.evaluate", json!({"expression": expr, "contextId": 1, "returnByValue": true}))
                .await?
        };
        let value = raw.pointer("/result/value").cloned().unwrap_or(Value::Null);
        let mut flat = Vec::new();
        if let Some(groups) = value.as_array() {
            for group in groups {
                if let Some(names) = group.as_array() {
                    for n in names {
                        if let Some(s) = n.as_str() {
                            if !flat.contains(&s.to_string()) {
                                flat.push(s.to_string());
                            }
                        }
                    }
                }
            }
        }
        Ok(flat)
    }

    fn names_to_completions(names: Vec<String>) -> Vec<CompletionItem> {
        names
            .into_iter()
            .filter(|n| !Self::is_indexed_name(n))
            .map(|label| CompletionItem {
                label,
                type_: "property".to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdp::types::{ObjectPreview, PropertyPreview};
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    #[test]
    fn describes_null_object_with_no_children() {
        let obj = RemoteObject::Object {
            subtype: Some("null".to_string()),
            object_id: None,
            description: None,
            preview: None,
            class_name: None,
        };
        let d = VariableEngine::describe(&obj);
        assert_eq!(d.value, "null");
        assert!(!d.has_children());
    }

    #[test]
    fn describes_number_using_full_description() {
        let obj = RemoteObject::Number { description: Some("Infinity".to_string()) };
        assert_eq!(VariableEngine::describe(&obj).value, "Infinity");
    }

    #[test]
    fn describes_function_truncated_at_brace() {
        let obj = RemoteObject::Function {
            description: Some("function foo() { return 1; }".to_string()),
            object_id: Some("oid".to_string()),
        };
        assert_eq!(VariableEngine::describe(&obj).value, "function foo() { … }");
    }

    #[test]
    fn describes_arrow_function_truncated_after_arrow() {
        let obj = RemoteObject::Function {
            description: Some("(x) => x + 1".to_string()),
            object_id: None,
        };
        assert_eq!(VariableEngine::describe(&obj).value, "(x) => …");
    }

    #[test]
    fn describes_error_truncated_at_first_newline() {
        let obj = RemoteObject::Object {
            subtype: Some("error".to_string()),
            object_id: Some("oid".to_string()),
            description: Some("Error: boom\n    at foo (a.js:1:1)".to_string()),
            preview: None,
            class_name: None,
        };
        assert_eq!(VariableEngine::describe(&obj).value, "Error: boom");
    }

    #[test]
    fn array_with_preview_uses_preview_length_for_indexed_count() {
        let obj = RemoteObject::Object {
            subtype: Some("array".to_string()),
            object_id: Some("oid".to_string()),
            description: Some("Array(2)".to_string()),
            preview: Some(ObjectPreview {
                overflow: false,
                properties: vec![
                    PropertyPreview { name: "0".to_string(), type_: "number".to_string(), value: Some("1".to_string()) },
                    PropertyPreview { name: "1".to_string(), type_: "number".to_string(), value: Some("2".to_string()) },
                ],
            }),
            class_name: None,
        };
        let d = VariableEngine::describe(&obj);
        assert_eq!(d.indexed_count, 2);
        assert_eq!(d.named_count, 0);
        assert!(d.has_children());
    }

    #[test]
    fn set_with_preview_counts_entries_plus_one() {
        let obj = RemoteObject::Object {
            subtype: Some("set".to_string()),
            object_id: Some("oid".to_string()),
            description: Some("Set(1)".to_string()),
            preview: Some(ObjectPreview { overflow: false, properties: vec![PropertyPreview { name: "0".to_string(), type_: "number".to_string(), value: Some("1".to_string()) }] }),
            class_name: None,
        };
        let d = VariableEngine::describe(&obj);
        assert_eq!(d.named_count, 2);
    }

    #[test]
    fn indexed_name_detection_rejects_leading_zeros() {
        assert!(VariableEngine::is_indexed_name("0"));
        assert!(VariableEngine::is_indexed_name("42"));
        assert!(!VariableEngine::is_indexed_name("01"));
        assert!(!VariableEngine::is_indexed_name("a1"));
    }

    #[test]
    fn comparator_sorts_indexed_before_named_and_numerically() {
        let mut names = vec!["b".to_string(), "10".to_string(), "2".to_string(), "a".to_string()];
        names.sort_by(|a, b| VariableEngine::compare_variable_names(a, b));
        assert_eq!(names, vec!["2", "10", "a", "b"]);
    }

    struct FakeRpc {
        response: Value,
    }

    #[async_trait::async_trait]
    impl RpcClient for FakeRpc {
        async fn call(&self, _method: &str, _params: Value) -> Result<Value> {
            Ok(self.response.clone())
        }
        async fn on_event(&self, _method: &str, _callback: crate::cdp::client::EventCallback) {}
    }

    fn reference_error_response() -> Value {
        json!({"exceptionDetails": {"exception": {"description": "ReferenceError: x is not defined"}}})
    }

    #[tokio::test]
    async fn reference_error_is_localized_outside_repl_context() {
        let rpc = FakeRpc { response: reference_error_response() };
        let result = VariableEngine::evaluate(&rpc, "x", None, Some("watch")).await.unwrap();
        assert_eq!(VariableEngine::describe(&result).value, "\"not available\"");
    }

    #[tokio::test]
    async fn reference_error_is_left_verbatim_in_repl_context() {
        let rpc = FakeRpc { response: reference_error_response() };
        let result = VariableEngine::evaluate(&rpc, "x", None, Some("repl")).await.unwrap();
        assert_eq!(VariableEngine::describe(&result).value, "\"ReferenceError: x is not defined\"");
    }

    #[tokio::test]
    async fn reference_error_is_localized_when_context_is_absent() {
        let rpc = FakeRpc { response: reference_error_response() };
        let result = VariableEngine::evaluate(&rpc, "x", None, None).await.unwrap();
        assert_eq!(VariableEngine::describe(&result).value, "\"not available\"");
    }

    struct RoutedFakeRpc {
        calls: StdMutex<Vec<(String, Value)>>,
        responses: HashMap<String, Value>,
    }

    #[async_trait::async_trait]
    impl RpcClient for RoutedFakeRpc {
        async fn call(&self, method: &str, params: Value) -> Result<Value> {
            self.calls.lock().unwrap().push((method.to_string(), params));
            Ok(self.responses.get(method).cloned().unwrap_or(json!({})))
        }
        async fn on_event(&self, _method: &str, _callback: crate::cdp::client::EventCallback) {}
    }

    #[tokio::test]
    async fn paged_indexed_expansion_keeps_only_indexed_names_and_uses_the_helper_eval() {
        let mut responses = HashMap::new();
        responses.insert(
            "Runtime.callFunctionOn".to_string(),
            json!({"result": {"objectId": "helper-1"}}),
        );
        responses.insert(
            "Runtime.getProperties".to_string(),
            json!({"result": [
                {"name": "0", "value": {"type": "number", "description": "1"}},
                {"name": "1", "value": {"type": "number", "description": "2"}},
            ]}),
        );
        let rpc = RoutedFakeRpc { calls: StdMutex::new(vec![]), responses };

        let props = VariableEngine::get_paged_properties(&rpc, "array-1", "indexed", 0, 2).await.unwrap();
        assert_eq!(props.len(), 2);
        assert!(props.iter().all(|(name, _)| VariableEngine::is_indexed_name(name)));

        let calls = rpc.calls.lock().unwrap();
        assert_eq!(calls[0].0, "Runtime.callFunctionOn");
        assert_eq!(calls[0].1["objectId"], json!("array-1"));
        assert!(calls[0].1["functionDeclaration"].as_str().unwrap().contains("getIndexedVariables"));
    }

    #[tokio::test]
    async fn paged_named_expansion_uses_the_named_helper_and_filters_out_indexed_names() {
        let mut responses = HashMap::new();
        responses.insert(
            "Runtime.callFunctionOn".to_string(),
            json!({"result": {"objectId": "helper-2"}}),
        );
        responses.insert(
            "Runtime.getProperties".to_string(),
            json!({"result": [
                {"name": "length", "value": {"type": "number", "description": "2"}},
                {"name": "0", "value": {"type": "number", "description": "1"}},
            ]}),
        );
        let rpc = RoutedFakeRpc { calls: StdMutex::new(vec![]), responses };

        let props = VariableEngine::get_paged_properties(&rpc, "array-1", "named", 0, 10).await.unwrap();
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].0, "length");
        assert!(matches!(&props[0].1, RemoteObject::Number { description } if description.as_deref() == Some("2")));

        let calls = rpc.calls.lock().unwrap();
        assert!(calls[0].1["functionDeclaration"].as_str().unwrap().contains("getNamedVariablesFn"));
    }
}
