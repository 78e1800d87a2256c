//! End-to-end flows driven entirely through `Adapter::handle_dap_message`
//! and simulated CDP notifications, exercising the paths unit tests touch
//! in isolation: attach, a breakpoint set before its script is known, and
//! the resulting `scriptParsed` rebind.

use async_trait::async_trait;
use dap_cdp_bridge::adapter::Adapter;
use dap_cdp_bridge::cdp::client::{EventCallback, RpcClient};
use dap_cdp_bridge::config::Config;
use dap_cdp_bridge::dap::types::{Message, Request, Response, SetBreakpointsArguments, Source, SourceBreakpoint};
use dap_cdp_bridge::Result;
use clap::Parser;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use tokio::sync::mpsc::UnboundedReceiver;

/// A hand-rolled `RpcClient` double that records calls, answers with
/// canned responses, and lets the test fire CDP notifications on demand,
/// standing in for a real websocket-backed runtime connection.
struct FakeRpc {
    calls: StdMutex<Vec<(String, Value)>>,
    responses: HashMap<&'static str, Value>,
    handlers: StdMutex<HashMap<String, Vec<EventCallback>>>,
}

impl FakeRpc {
    fn new(responses: HashMap<&'static str, Value>) -> Self {
        Self {
            calls: StdMutex::new(Vec::new()),
            responses,
            handlers: StdMutex::new(HashMap::new()),
        }
    }

    /// Invoke every callback registered for `method`, then yield a few
    /// times so the `tokio::spawn`ed handler tasks the adapter registers
    /// in `register_cdp_handlers` get to run before the caller inspects
    /// the outbound channel.
    async fn fire(&self, method: &str, params: Value) {
        let callbacks = self.handlers.lock().unwrap().get(method).cloned().unwrap_or_default();
        for cb in callbacks {
            cb(params.clone());
        }
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl RpcClient for FakeRpc {
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        self.calls.lock().unwrap().push((method.to_string(), params));
        Ok(self.responses.get(method).cloned().unwrap_or(json!({})))
    }

    async fn on_event(&self, method: &str, callback: EventCallback) {
        self.handlers.lock().unwrap().entry(method.to_string()).or_default().push(callback);
    }
}

fn test_config() -> Config {
    Config::parse_from(["dap-cdp-bridge"])
}

/// Drain the next message off the adapter's outbound channel.
async fn next(rx: &mut UnboundedReceiver<Message>) -> Message {
    rx.recv().await.expect("adapter outbound channel closed unexpectedly")
}

async fn attach(adapter: &Adapter, rx: &mut UnboundedReceiver<Message>, port: u16) {
    adapter
        .handle_dap_message(Message::Request(Request {
            seq: 1,
            command: "attach".to_string(),
            arguments: Some(json!({"port": port})),
        }))
        .await;
    let initialized = next(rx).await;
    assert!(matches!(initialized, Message::Event(ref e) if e.event == "initialized"));
    let response = next(rx).await;
    assert!(matches!(response, Message::Response(ref r) if r.success && r.command == "attach"));
}

#[tokio::test]
async fn breakpoint_set_before_script_parsed_resolves_and_emits_new() {
    let rpc = std::sync::Arc::new(FakeRpc::new(HashMap::from([(
        "Debugger.setBreakpointByUrl",
        json!({"breakpointId": "1:9:0:1", "locations": [{"scriptId": "1", "lineNumber": 9, "columnNumber": 2}]}),
    )])));

    let (adapter, mut rx) = Adapter::new(test_config());
    adapter.set_rpc_client(rpc.clone()).await;
    attach(&adapter, &mut rx, 9229).await;

    let set_args = SetBreakpointsArguments {
        source: Source { name: None, path: Some("file:///app.js".to_string()), source_reference: None },
        breakpoints: vec![SourceBreakpoint { line: 10, column: None, condition: None, hit_condition: None }],
        source_modified: None,
    };
    adapter
        .handle_dap_message(Message::Request(Request {
            seq: 2,
            command: "setBreakpoints".to_string(),
            arguments: Some(serde_json::to_value(&set_args).unwrap()),
        }))
        .await;
    let response = next(&mut rx).await;
    let Message::Response(Response { success, body, .. }) = response else { panic!("expected a response") };
    assert!(success);
    let body: dap_cdp_bridge::dap::types::SetBreakpointsResponseBody = serde_json::from_value(body.unwrap()).unwrap();
    assert_eq!(body.breakpoints.len(), 1);
    let minted_id = body.breakpoints[0].id.expect("pending breakpoint still gets a minted id");
    assert!(!body.breakpoints[0].verified, "script isn't known yet, so the breakpoint can't be verified");

    rpc.fire(
        "Debugger.scriptParsed",
        json!({"scriptId": "1", "url": "file:///app.js", "sourceMapUrl": null}),
    )
    .await;

    let event = next(&mut rx).await;
    let Message::Event(ref e) = event else { panic!("expected an event, got {:?}", event) };
    assert_eq!(e.event, "breakpoint");
    let body: dap_cdp_bridge::dap::types::BreakpointEventBody = serde_json::from_value(e.body.clone().unwrap()).unwrap();
    assert_eq!(body.reason, "new");
    assert_eq!(body.breakpoint.id, Some(minted_id));
    assert!(body.breakpoint.verified);
    // CDP reported 0-based line 9 / column 2; the DAP-facing event must
    // carry the 1-based conversion, not the raw CDP numbers.
    assert_eq!(body.breakpoint.line, Some(10));
    assert_eq!(body.breakpoint.column, Some(3));
}

#[tokio::test]
async fn pause_emits_stopped_with_user_request_reason() {
    let rpc = std::sync::Arc::new(FakeRpc::new(HashMap::new()));
    let (adapter, mut rx) = Adapter::new(test_config());
    adapter.set_rpc_client(rpc.clone()).await;
    attach(&adapter, &mut rx, 9229).await;

    adapter
        .handle_dap_message(Message::Request(Request { seq: 2, command: "pause".to_string(), arguments: None }))
        .await;
    let response = next(&mut rx).await;
    assert!(matches!(response, Message::Response(ref r) if r.success && r.command == "pause"));

    rpc.fire(
        "Debugger.paused",
        json!({"callFrames": [], "reason": "other", "hitBreakpoints": []}),
    )
    .await;

    let event = next(&mut rx).await;
    let Message::Event(ref e) = event else { panic!("expected an event, got {:?}", event) };
    assert_eq!(e.event, "stopped");
    let body: dap_cdp_bridge::dap::types::StoppedEventBody = serde_json::from_value(e.body.clone().unwrap()).unwrap();
    assert_eq!(body.reason, "user_request");

    // A `pause()` doesn't suppress the following `Debugger.resumed`'s
    // `continued` event, unlike `continue`/the step family.
    rpc.fire("Debugger.resumed", json!({})).await;
    let event = next(&mut rx).await;
    assert!(matches!(event, Message::Event(ref e) if e.event == "continued"));
}

#[tokio::test]
async fn breakpoint_resolved_event_carries_dap_line_numbers() {
    let rpc = std::sync::Arc::new(FakeRpc::new(HashMap::from([(
        "Debugger.setBreakpointByUrl",
        json!({"breakpointId": "1:4:0:1"}),
    )])));
    let (adapter, mut rx) = Adapter::new(test_config());
    adapter.set_rpc_client(rpc.clone()).await;
    attach(&adapter, &mut rx, 9229).await;

    rpc.fire(
        "Debugger.scriptParsed",
        json!({"scriptId": "1", "url": "file:///app.js", "sourceMapUrl": null}),
    )
    .await;

    let set_args = SetBreakpointsArguments {
        source: Source { name: None, path: Some("file:///app.js".to_string()), source_reference: None },
        breakpoints: vec![SourceBreakpoint { line: 5, column: None, condition: None, hit_condition: None }],
        source_modified: None,
    };
    adapter
        .handle_dap_message(Message::Request(Request {
            seq: 2,
            command: "setBreakpoints".to_string(),
            arguments: Some(serde_json::to_value(&set_args).unwrap()),
        }))
        .await;
    let response = next(&mut rx).await;
    let Message::Response(Response { body, .. }) = response else { panic!("expected a response") };
    let body: dap_cdp_bridge::dap::types::SetBreakpointsResponseBody = serde_json::from_value(body.unwrap()).unwrap();
    assert!(!body.breakpoints[0].verified, "setBreakpoint (no actualLocation) resolves later");

    rpc.fire(
        "Debugger.breakpointResolved",
        json!({"breakpointId": "1:4:0:1", "location": {"scriptId": "1", "lineNumber": 4, "columnNumber": 0}}),
    )
    .await;

    let event = next(&mut rx).await;
    let Message::Event(ref e) = event else { panic!("expected an event, got {:?}", event) };
    assert_eq!(e.event, "breakpoint");
    let body: dap_cdp_bridge::dap::types::BreakpointEventBody = serde_json::from_value(e.body.clone().unwrap()).unwrap();
    assert_eq!(body.reason, "changed");
    assert!(body.breakpoint.verified);
    assert_eq!(body.breakpoint.line, Some(5));
    assert_eq!(body.breakpoint.column, Some(1));
}
