//! The `Adapter`: the session state machine mediating between the DAP
//! peer (the editor, northbound) and the CDP peer (the runtime,
//! southbound). Combines every other component in this module plus the
//! step-controller operations (folded in here rather than a separate
//! type) behind one cheaply `Clone`-able handle, so CDP event callbacks
//! can hold a copy and push DAP messages onto the same writer channel
//! the request/response loop uses.

use crate::adapter::breakpoints::BreakpointEngine;
use crate::adapter::debounce::Debouncer;
use crate::adapter::flags::{ExpectedStopReason, SessionFlags};
use crate::adapter::handles::{HandleRegistry, VariablesContainer};
use crate::adapter::scripts::ScriptStore;
use crate::adapter::transformers::{LineColumn, Pipeline, TransformLocation, Transformers};
use crate::adapter::variables::VariableEngine;
use crate::cdp::client::{EventCallback, RpcClient};
use crate::cdp::types::{CallFrame, PausedParams, RemoteObject, Script};
use crate::config::Config;
use crate::dap::types::*;
use crate::{Error, Result};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

struct AdapterState {
    config: Config,
    flags: SessionFlags,
    handles: HandleRegistry,
    scripts: ScriptStore,
    breakpoints: BreakpointEngine,
    transformers: Pipeline,
    rpc: Option<Arc<dyn RpcClient>>,
    call_frames: Vec<CallFrame>,
    exception_data: Option<Value>,
    client_uses_path_format: bool,
    overlay_debounce: Debouncer,
}

impl AdapterState {
    fn new(config: Config) -> Self {
        let smart_step = config.smart_step;
        Self {
            config,
            flags: {
                let mut f = SessionFlags::new();
                f.smart_step = smart_step;
                f
            },
            handles: HandleRegistry::new(),
            scripts: ScriptStore::new(),
            breakpoints: BreakpointEngine::new(),
            transformers: Pipeline::default_pipeline(),
            rpc: None,
            call_frames: Vec::new(),
            exception_data: None,
            client_uses_path_format: true,
            overlay_debounce: Debouncer::overlay(Instant::now()),
        }
    }

    fn rpc(&self) -> Result<Arc<dyn RpcClient>> {
        self.rpc.clone().ok_or_else(|| Error::InvalidState("not attached".to_string()))
    }
}

/// Cheaply cloned: every field is an `Arc` or a channel handle, so every
/// CDP event callback can hold its own copy and push DAP messages onto
/// the same writer channel the request/response loop uses.
#[derive(Clone)]
pub struct Adapter {
    state: Arc<Mutex<AdapterState>>,
    dap_writer: mpsc::UnboundedSender<Message>,
    seq: Arc<AtomicI64>,
}

impl Adapter {
    pub fn new(config: Config) -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let adapter = Self {
            state: Arc::new(Mutex::new(AdapterState::new(config))),
            dap_writer: tx,
            seq: Arc::new(AtomicI64::new(1)),
        };
        (adapter, rx)
    }

    fn next_seq(&self) -> i64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    fn send(&self, msg: Message) {
        // The receiving end only goes away once the transport loop exits
        // (session shutdown); a dropped channel here just means the reply
        // raced that shutdown.
        let _ = self.dap_writer.send(msg);
    }

    async fn emit_event(&self, event: &str, body: Option<Value>) {
        let seq = self.next_seq();
        self.send(Message::Event(Event::new(seq, event, body)));
    }

    pub async fn has_terminated(&self) -> bool {
        self.state.lock().await.flags.has_terminated
    }

    /// Entry point for every inbound DAP message. Requests get a response
    /// written back to the writer channel; the only other message kinds
    /// a well-behaved DAP client sends are requests.
    pub async fn handle_dap_message(&self, msg: Message) {
        if let Message::Request(req) = msg {
            let seq = self.next_seq();
            let request_seq = req.seq;
            let command = req.command.clone();
            let response = match self.dispatch(req).await {
                Ok(body) => Response::success(seq, request_seq, command, body),
                Err(e) => Response::failure(seq, request_seq, command, e.to_string()),
            };
            self.send(Message::Response(response));
        }
    }

    async fn dispatch(&self, req: Request) -> Result<Option<Value>> {
        let args = req.arguments.unwrap_or(Value::Null);
        match req.command.as_str() {
            "initialize" => self.initialize(parse(args)?).await,
            "launch" => self.launch(parse(args)?).await,
            "attach" => self.attach(parse(args)?).await,
            "disconnect" => self.disconnect().await,
            "setBreakpoints" => self.set_breakpoints(parse(args)?).await,
            "setExceptionBreakpoints" => self.set_exception_breakpoints(parse(args)?).await,
            "configurationDone" => Ok(None),
            "continue" => self.continue_(parse(args)?).await,
            "next" => self.next(parse(args)?).await,
            "stepIn" => self.step_in(parse(args)?).await,
            "stepOut" => self.step_out(parse(args)?).await,
            "pause" => self.pause(parse(args)?).await,
            "stackTrace" => self.stack_trace(parse(args)?).await,
            "scopes" => self.scopes(parse(args)?).await,
            "variables" => self.variables(parse(args)?).await,
            "setVariable" => self.set_variable(parse(args)?).await,
            "source" => self.source(parse(args)?).await,
            "threads" => self.threads().await,
            "evaluate" => self.evaluate(parse(args)?).await,
            "completions" => self.completions(parse(args)?).await,
            other => Err(Error::Dap(format!("unsupported request: {}", other))),
        }
    }

    // -----------------------------------------------------------------
    // initialize / launch / attach / disconnect
    // -----------------------------------------------------------------

    async fn initialize(&self, args: InitializeRequestArguments) -> Result<Option<Value>> {
        if let Some(format) = &args.path_format {
            if format != "path" {
                return Err(Error::path_format(format!("unsupported pathFormat: {}", format)));
            }
        }
        {
            let mut state = self.state.lock().await;
            state.client_uses_path_format = args.path_format.as_deref().unwrap_or("path") == "path";
        }
        to_value(Capabilities::default())
    }

    async fn launch(&self, _args: LaunchRequestArguments) -> Result<Option<Value>> {
        self.emit_event("initialized", None).await;
        Ok(None)
    }

    async fn attach(&self, args: AttachRequestArguments) -> Result<Option<Value>> {
        let port = args.port.ok_or_else(Error::attach_port_required)?;
        debug!(port, address = ?args.address, "attaching");
        {
            let mut state = self.state.lock().await;
            state.flags.attach_mode = true;
            state.flags.client_attached = true;
        }
        self.register_cdp_handlers().await?;
        if let Ok(rpc) = self.state.lock().await.rpc() {
            let _: Value = rpc.call("Debugger.enable", json!({})).await.unwrap_or(Value::Null);
            let _: Value = rpc.call("Runtime.enable", json!({})).await.unwrap_or(Value::Null);
        }
        self.emit_event("initialized", None).await;
        Ok(None)
    }

    /// Registered once per attach. Kept separate from `attach` so a
    /// concrete `RpcClient` can be injected by whoever owns process
    /// launch/connect is out of scope here.
    pub async fn set_rpc_client(&self, rpc: Arc<dyn RpcClient>) {
        self.state.lock().await.rpc = Some(rpc);
    }

    async fn register_cdp_handlers(&self) -> Result<()> {
        let rpc = self.state.lock().await.rpc()?;

        let paused_adapter = self.clone();
        rpc.on_event(
            "Debugger.paused",
            Arc::new(move |params: Value| {
                let adapter = paused_adapter.clone();
                tokio::spawn(async move {
                    if let Ok(parsed) = serde_json::from_value::<PausedParams>(params) {
                        adapter.on_paused(parsed).await;
                    }
                });
            }) as EventCallback,
        )
        .await;

        let resumed_adapter = self.clone();
        rpc.on_event(
            "Debugger.resumed",
            Arc::new(move |_params: Value| {
                let adapter = resumed_adapter.clone();
                tokio::spawn(async move { adapter.on_resumed().await });
            }) as EventCallback,
        )
        .await;

        let script_adapter = self.clone();
        rpc.on_event(
            "Debugger.scriptParsed",
            Arc::new(move |params: Value| {
                let adapter = script_adapter.clone();
                tokio::spawn(async move {
                    if let Ok(parsed) = serde_json::from_value::<crate::cdp::types::ScriptParsedParams>(params) {
                        adapter.on_script_parsed(parsed).await;
                    }
                });
            }) as EventCallback,
        )
        .await;

        let cleared_adapter = self.clone();
        rpc.on_event(
            "Debugger.globalObjectCleared",
            Arc::new(move |_params: Value| {
                let adapter = cleared_adapter.clone();
                tokio::spawn(async move { adapter.on_global_object_cleared().await });
            }) as EventCallback,
        )
        .await;

        let resolved_adapter = self.clone();
        rpc.on_event(
            "Debugger.breakpointResolved",
            Arc::new(move |params: Value| {
                let adapter = resolved_adapter.clone();
                tokio::spawn(async move {
                    if let Ok(parsed) = serde_json::from_value::<crate::cdp::types::BreakpointResolvedParams>(params) {
                        adapter.on_breakpoint_resolved(parsed).await;
                    }
                });
            }) as EventCallback,
        )
        .await;

        let console_adapter = self.clone();
        rpc.on_event(
            "Runtime.consoleAPICalled",
            Arc::new(move |params: Value| {
                let adapter = console_adapter.clone();
                tokio::spawn(async move {
                    if let Ok(parsed) = serde_json::from_value::<crate::cdp::types::ConsoleApiCalledParams>(params) {
                        adapter.on_console_api_called(parsed).await;
                    }
                });
            }) as EventCallback,
        )
        .await;

        Ok(())
    }

    async fn disconnect(&self) -> Result<Option<Value>> {
        self.terminate_session("client requested disconnect").await;
        Ok(None)
    }

    /// Flip the terminal flags; best-effort from here on.
    async fn terminate_session(&self, reason: &str) {
        let mut state = self.state.lock().await;
        if state.flags.has_terminated {
            return;
        }
        state.flags.has_terminated = true;
        state.flags.in_shutdown = true;
        drop(state);
        info!(reason, "terminating session");
        self.emit_event(
            "terminated",
            to_value(TerminatedEventBody { restart: None }).ok().flatten(),
        )
        .await;
    }

    // -----------------------------------------------------------------
    // breakpoints
    // -----------------------------------------------------------------

    async fn set_breakpoints(&self, mut args: SetBreakpointsArguments) -> Result<Option<Value>> {
        let mut state = self.state.lock().await;
        let rpc = state.rpc()?;
        for bp in &mut args.breakpoints {
            let converted = state
                .transformers
                .to_cdp(line_column(bp.line, bp.column))
                .await;
            bp.line = converted.position.line;
            bp.column = converted.position.column;
        }

        let mut body = {
            let AdapterState { breakpoints, scripts, handles, .. } = &mut *state;
            breakpoints.set_breakpoints(args, rpc.as_ref(), scripts, handles).await?
        };
        for bp in &mut body.breakpoints {
            if let Some(line) = bp.line {
                let converted = state.transformers.to_dap(line_column(line, bp.column)).await;
                bp.line = Some(converted.position.line);
                bp.column = converted.position.column;
            }
        }
        to_value(body)
    }

    async fn set_exception_breakpoints(&self, args: SetExceptionBreakpointsArguments) -> Result<Option<Value>> {
        let state_for_cdp = self.state.lock().await.rpc()?;
        let pause_state = if args.filters.iter().any(|f| f == "all") {
            "all"
        } else if args.filters.iter().any(|f| f == "uncaught") {
            "uncaught"
        } else {
            "none"
        };
        state_for_cdp
            .call("Debugger.setPauseOnExceptions", json!({"state": pause_state}))
            .await?;
        Ok(None)
    }

    // -----------------------------------------------------------------
    // stepping
    // -----------------------------------------------------------------

    async fn continue_(&self, _args: ThreadIdArguments) -> Result<Option<Value>> {
        self.begin_step(true, None, "Debugger.resume").await
    }

    async fn next(&self, _args: ThreadIdArguments) -> Result<Option<Value>> {
        self.begin_step(true, Some(ExpectedStopReason::Step), "Debugger.stepOver").await
    }

    async fn step_in(&self, _args: ThreadIdArguments) -> Result<Option<Value>> {
        self.begin_step(true, Some(ExpectedStopReason::Step), "Debugger.stepInto").await
    }

    async fn step_out(&self, _args: ThreadIdArguments) -> Result<Option<Value>> {
        self.begin_step(true, Some(ExpectedStopReason::Step), "Debugger.stepOut").await
    }

    /// `pause()` does not set `expectingResumedEvent` even though it sets
    /// `expectingStopReason`, see `SessionFlags::begin_step`.
    async fn pause(&self, _args: ThreadIdArguments) -> Result<Option<Value>> {
        self.begin_step(false, Some(ExpectedStopReason::UserRequest), "Debugger.pause").await
    }

    async fn begin_step(&self, set_resumed: bool, expected: Option<ExpectedStopReason>, cdp_method: &str) -> Result<Option<Value>> {
        let mut state = self.state.lock().await;
        let rpc = state.rpc()?;
        let completion = state.flags.begin_step(set_resumed, expected);
        drop(state);
        rpc.call(cdp_method, json!({})).await?;
        // The response is about to be written by the caller; firing the
        // rendezvous immediately is correct because DAP responses and
        // events both funnel through the same ordered writer channel, so
        // a `Stopped` queued after this send always lands after the
        // response.
        let _ = completion.send(());
        Ok(None)
    }

    // -----------------------------------------------------------------
    // CDP event handlers
    // -----------------------------------------------------------------

    async fn on_paused(&self, params: PausedParams) {
        let mut state = self.state.lock().await;
        state.handles.reset_on_pause();
        state.exception_data = if params.reason == "exception" { params.data.clone() } else { None };
        state.call_frames = params.call_frames;

        let hit_breakpoint_ids: Vec<u32> = params
            .hit_breakpoints
            .iter()
            .filter_map(|cdp_id| state.handles.breakpoint_ids.external_id_of(cdp_id))
            .collect();

        let expected = state.flags.take_expected_stop_reason();
        let reason = if params.reason == "exception" {
            "exception".to_string()
        } else if !hit_breakpoint_ids.is_empty() {
            "breakpoint".to_string()
        } else if let Some(expected) = expected {
            expected.as_dap_reason().to_string()
        } else {
            "debugger".to_string()
        };

        if state.flags.smart_step && reason == "step" && self.should_smart_step(&state).await {
            state.flags.smart_step_count += 1;
            state.flags.expecting_stop_reason = Some(ExpectedStopReason::Step);
            drop(state);
            if let Ok(rpc) = self.state.lock().await.rpc() {
                let _ = rpc.call("Debugger.stepInto", json!({})).await;
            }
            return;
        }
        if state.flags.smart_step_count > 0 {
            info!(skipped = state.flags.smart_step_count, "smart-step finished skipping frames");
            state.flags.smart_step_count = 0;
        }
        drop(state);

        self.state.lock().await.flags.await_step_completion().await;
        self.configure_overlay(Some("Paused in Visual Studio Code")).await;

        self.emit_event(
            "stopped",
            to_value(StoppedEventBody {
                reason,
                thread_id: 1,
                all_threads_stopped: true,
                hit_breakpoint_ids,
                text: None,
            })
            .ok()
            .flatten(),
        )
        .await;
    }

    /// Smart-step: a top frame is skippable when its generated location
    /// has no corresponding authored location.
    /// With no source-map stage configured, `Pipeline::map_to_authored`
    /// always reports a mapping, so this never skips in that
    /// configuration. A deployment that composes a real source-map
    /// transformer gets genuine smart-stepping for free.
    async fn should_smart_step(&self, state: &AdapterState) -> bool {
        let Some(frame) = state.call_frames.first() else { return false };
        let loc = TransformLocation {
            script_id: frame.location.script_id.clone(),
            path: frame.url.clone(),
            position: LineColumn { line: frame.location.line_number, column: frame.location.column_number },
        };
        state.transformers.map_to_authored(&loc).await.is_none()
    }

    async fn on_resumed(&self) {
        let mut state = self.state.lock().await;
        state.call_frames.clear();
        let suppressed = state.flags.expecting_resumed_event;
        state.flags.expecting_resumed_event = false;
        drop(state);

        self.configure_overlay(None).await;

        if !suppressed {
            self.emit_event(
                "continued",
                to_value(ContinuedEventBody { thread_id: 1, all_threads_continued: true }).ok().flatten(),
            )
            .await;
        }
    }

    /// `Page.configureOverlay({message})`, debounced at 200ms so rapid
    /// pause/resume cycles don't flicker the IDE's pause overlay.
    async fn configure_overlay(&self, message: Option<&str>) {
        let mut state = self.state.lock().await;
        if !state.overlay_debounce.should_fire(Instant::now()) {
            return;
        }
        let Ok(rpc) = state.rpc() else { return };
        drop(state);
        let _ = rpc.call("Page.configureOverlay", json!({"message": message})).await;
    }

    async fn on_script_parsed(&self, params: crate::cdp::types::ScriptParsedParams) {
        if params.url.starts_with("extensions::") || params.url.starts_with("chrome-extension://") {
            return;
        }
        let script = Script::new(params.script_id.clone(), Some(params.url.clone()), params.source_map_url);
        let url = script.url.clone();

        let mut state = self.state.lock().await;
        state.scripts.insert(script);
        let rpc = state.rpc().ok();
        drop(state);

        let Some(rpc) = rpc else { return };
        let rebind_events = {
            let mut state = self.state.lock().await;
            let mut events = {
                let AdapterState { breakpoints, scripts, handles, .. } = &mut *state;
                breakpoints.rebind(&url, rpc.as_ref(), scripts, handles).await.unwrap_or_default()
            };
            for bp in &mut events {
                if let Some(line) = bp.line {
                    let converted = state.transformers.to_dap(line_column(line, bp.column)).await;
                    bp.line = Some(converted.position.line);
                    bp.column = converted.position.column;
                }
            }
            events
        };
        for bp in rebind_events {
            self.emit_event(
                "breakpoint",
                to_value(BreakpointEventBody { reason: "new".to_string(), breakpoint: bp }).ok().flatten(),
            )
            .await;
        }
    }

    async fn on_global_object_cleared(&self) {
        let mut state = self.state.lock().await;
        state.scripts.clear();
        state.breakpoints = BreakpointEngine::new();
        state.call_frames.clear();
    }

    async fn on_breakpoint_resolved(&self, params: crate::cdp::types::BreakpointResolvedParams) {
        let mut state = self.state.lock().await;
        let script = state.scripts.get(&params.location.script_id).cloned();
        let external_id = state.handles.breakpoint_ids.id_for_cdp(&params.breakpoint_id);
        let converted = state
            .transformers
            .to_dap(line_column(params.location.line_number, params.location.column_number))
            .await;

        let Some(script) = script else { return };
        state.breakpoints.note_resolved(&script.url, params.breakpoint_id.clone());
        drop(state);

        self.emit_event(
            "breakpoint",
            to_value(BreakpointEventBody {
                reason: "new".to_string(),
                breakpoint: Breakpoint {
                    id: Some(external_id),
                    verified: true,
                    message: None,
                    source: Some(Source { name: None, path: Some(script.url), source_reference: None }),
                    line: Some(converted.position.line),
                    column: converted.position.column,
                },
            })
            .ok()
            .flatten(),
        )
        .await;
    }

    async fn on_console_api_called(&self, params: crate::cdp::types::ConsoleApiCalledParams) {
        let text = params
            .args
            .iter()
            .map(|a| VariableEngine::describe(a).value)
            .collect::<Vec<_>>()
            .join(" ");
        let category = if params.type_ == "error" { "stderr" } else { "stdout" };
        self.emit_event(
            "output",
            to_value(OutputEventBody { category: category.to_string(), output: format!("{}\n", text) })
                .ok()
                .flatten(),
        )
        .await;
    }

    // -----------------------------------------------------------------
    // stack / scopes / variables
    // -----------------------------------------------------------------

    async fn stack_trace(&self, _args: StackTraceArguments) -> Result<Option<Value>> {
        let mut state = self.state.lock().await;
        let mut frames = Vec::with_capacity(state.call_frames.len());
        for idx in 0..state.call_frames.len() {
            let frame = state.call_frames[idx].clone();
            let id = state.handles.frames.insert(idx as u32);
            let dap_loc = state
                .transformers
                .to_dap(line_column(frame.location.line_number, frame.location.column_number))
                .await;
            frames.push(StackFrame {
                id,
                name: if frame.function_name.is_empty() { "(anonymous)".to_string() } else { frame.function_name.clone() },
                source: Some(Source { name: None, path: Some(frame.url.clone()), source_reference: None }),
                line: dap_loc.position.line,
                column: dap_loc.position.column.unwrap_or(1),
            });
        }
        let total = frames.len() as i64;
        to_value(StackTraceResponseBody { stack_frames: frames, total_frames: Some(total) })
    }

    async fn scopes(&self, args: ScopesArguments) -> Result<Option<Value>> {
        let mut state = self.state.lock().await;
        let frame_idx = *state
            .handles
            .frames
            .get(args.frame_id)
            .ok_or_else(Error::source_request_illegal_handle)? as usize;
        let frame = state
            .call_frames
            .get(frame_idx)
            .cloned()
            .ok_or_else(Error::source_request_illegal_handle)?;
        let has_exception = state.exception_data.is_some();

        let mut scopes = Vec::with_capacity(frame.scope_chain.len() + 1);
        if has_exception {
            let reference = state.handles.variables.insert(VariablesContainer::Exception);
            scopes.push(Scope { name: "Exception".to_string(), variables_reference: reference, expensive: false });
        }
        for (scope_idx, scope) in frame.scope_chain.iter().enumerate() {
            let mut name = scope.type_.clone();
            if let Some(first) = name.get_mut(0..1) {
                first.make_ascii_uppercase();
            }
            let reference = state.handles.variables.insert(VariablesContainer::Scope { frame_index: frame_idx, scope_index: scope_idx });
            scopes.push(Scope { name, variables_reference: reference, expensive: scope.type_ == "global" });
        }
        to_value(ScopesResponseBody { scopes })
    }

    async fn variables(&self, args: VariablesArguments) -> Result<Option<Value>> {
        let mut state = self.state.lock().await;
        let container = state
            .handles
            .variables
            .get(args.variables_reference)
            .cloned()
            .ok_or_else(Error::source_request_illegal_handle)?;
        let rpc = state.rpc()?;

        match container {
            VariablesContainer::Object { object_id, .. } => {
                drop(state);
                let props = match (args.start, args.count) {
                    (Some(start), Some(count)) if start >= 0 && count >= 0 => {
                        let filter = args.filter.as_deref().unwrap_or("indexed");
                        VariableEngine::get_paged_properties(rpc.as_ref(), &object_id, filter, start, count).await?
                    }
                    _ => VariableEngine::get_properties(rpc.as_ref(), &object_id).await?,
                };
                let mut out = Vec::with_capacity(props.len());
                for (name, obj) in props {
                    let mut state = self.state.lock().await;
                    out.push(build_variable(rpc.as_ref(), &mut state.handles, name, obj).await);
                }
                to_value(VariablesResponseBody { variables: out })
            }
            VariablesContainer::Scope { frame_index, scope_index } => {
                let frame = state
                    .call_frames
                    .get(frame_index)
                    .cloned()
                    .ok_or_else(Error::source_request_illegal_handle)?;
                let scope = frame
                    .scope_chain
                    .get(scope_index)
                    .cloned()
                    .ok_or_else(Error::source_request_illegal_handle)?;
                drop(state);

                let mut out = Vec::new();
                if scope_index == 0 {
                    if let Some(this_obj) = &frame.this_object {
                        let mut state = self.state.lock().await;
                        out.push(build_variable(rpc.as_ref(), &mut state.handles, "this".to_string(), this_obj.clone()).await);
                    }
                    if let Some(return_value) = &frame.return_value {
                        let mut state = self.state.lock().await;
                        out.push(build_variable(rpc.as_ref(), &mut state.handles, "returnValue".to_string(), return_value.clone()).await);
                    }
                }
                if let RemoteObject::Object { object_id: Some(object_id), .. } = &scope.object {
                    let props = VariableEngine::get_properties(rpc.as_ref(), object_id).await?;
                    for (name, obj) in props {
                        let mut state = self.state.lock().await;
                        out.push(build_variable(rpc.as_ref(), &mut state.handles, name, obj).await);
                    }
                }
                to_value(VariablesResponseBody { variables: out })
            }
            VariablesContainer::Exception => {
                let exception = state.exception_data.clone();
                drop(state);
                let mut out = Vec::new();
                if let Some(data) = exception {
                    if let Ok(obj) = serde_json::from_value::<RemoteObject>(data) {
                        let mut state = self.state.lock().await;
                        out.push(build_variable(rpc.as_ref(), &mut state.handles, "exception".to_string(), obj).await);
                    }
                }
                to_value(VariablesResponseBody { variables: out })
            }
        }
    }

    async fn set_variable(&self, args: SetVariableArguments) -> Result<Option<Value>> {
        let mut state = self.state.lock().await;
        let container = state
            .handles
            .variables
            .get(args.variables_reference)
            .cloned()
            .ok_or_else(Error::source_request_illegal_handle)?;
        let rpc = state.rpc()?;

        let new_value = match container {
            VariablesContainer::Scope { frame_index, scope_index } => {
                let frame = state
                    .call_frames
                    .get(frame_index)
                    .cloned()
                    .ok_or_else(Error::source_request_illegal_handle)?;
                drop(state);
                VariableEngine::set_variable_on_frame(rpc.as_ref(), &frame, scope_index as i64, &args.name, &args.value).await?
            }
            VariablesContainer::Object { object_id, .. } => {
                drop(state);
                VariableEngine::set_property(rpc.as_ref(), &object_id, &args.name, &args.value, None).await?
            }
            VariablesContainer::Exception => {
                return Err(Error::set_value_not_supported("cannot set a property of the exception scope"));
            }
        };

        to_value(SetVariableResponseBody { value: new_value, variables_reference: None })
    }

    async fn source(&self, args: SourceArguments) -> Result<Option<Value>> {
        let state = self.state.lock().await;
        let source_ref = args.source_reference;
        if source_ref <= 0 {
            return Err(Error::source_request_illegal_handle());
        }
        let content = state
            .handles
            .sources
            .get(source_ref as u32)
            .cloned()
            .ok_or_else(Error::source_request_illegal_handle)?;
        to_value(SourceResponseBody { content, mime_type: Some("text/javascript".to_string()) })
    }

    async fn threads(&self) -> Result<Option<Value>> {
        to_value(ThreadsResponseBody { threads: vec![Thread { id: 1, name: "Thread 1".to_string() }] })
    }

    async fn evaluate(&self, args: EvaluateArguments) -> Result<Option<Value>> {
        let mut state = self.state.lock().await;
        let rpc = state.rpc()?;
        let frame = match args.frame_id {
            Some(frame_id) => {
                let idx = *state.handles.frames.get(frame_id).ok_or_else(Error::source_request_illegal_handle)? as usize;
                state.call_frames.get(idx).cloned()
            }
            None => None,
        };
        drop(state);

        let result = VariableEngine::evaluate(rpc.as_ref(), &args.expression, frame.as_ref(), args.context.as_deref())
            .await
            .map_err(|e| Error::error_from_evaluate(e.to_string()))?;

        let mut state = self.state.lock().await;
        let variable = build_variable(rpc.as_ref(), &mut state.handles, String::new(), result).await;
        to_value(EvaluateResponseBody {
            result: variable.value,
            type_: variable.type_,
            variables_reference: variable.variables_reference,
        })
    }

    async fn completions(&self, args: CompletionsArguments) -> Result<Option<Value>> {
        let mut state = self.state.lock().await;
        let rpc = state.rpc()?;
        let frame = match args.frame_id {
            Some(frame_id) => {
                let idx = *state.handles.frames.get(frame_id).ok_or_else(Error::completions_stack_frame_not_valid)? as usize;
                Some(state.call_frames.get(idx).cloned().ok_or_else(Error::completions_stack_frame_not_valid)?)
            }
            None => None,
        };
        drop(state);

        let targets = VariableEngine::completions(rpc.as_ref(), &args.text, frame.as_ref()).await?;
        to_value(CompletionsResponseBody { targets })
    }
}

/// Build a DAP `Variable` from a `RemoteObject`, minting a
/// `variablesReference` handle when it has children, falling back to a
/// runtime-evaluated count when no preview was attached.
async fn build_variable(rpc: &dyn RpcClient, handles: &mut HandleRegistry, name: String, obj: RemoteObject) -> Variable {
    let mut desc = VariableEngine::describe(&obj);
    if desc.object_id.is_some() && desc.indexed_count == 0 && desc.named_count == 0 {
        if let RemoteObject::Object { subtype, object_id: Some(object_id), .. } = &obj {
            let counts = match subtype.as_deref() {
                Some("array") | Some("typedarray") => VariableEngine::array_counts_via_eval(rpc, object_id).await.ok(),
                Some("set") | Some("map") => VariableEngine::set_map_counts_via_eval(rpc, object_id).await.ok(),
                _ => None,
            };
            if let Some((indexed, named)) = counts {
                desc.indexed_count = indexed;
                desc.named_count = named;
            }
        }
    }

    let variables_reference = if let Some(object_id) = &desc.object_id {
        if desc.indexed_count > 0 || desc.named_count > 0 {
            handles.variables.insert(VariablesContainer::Object {
                object_id: object_id.clone(),
                indexed_count: desc.indexed_count,
                named_count: desc.named_count,
            })
        } else {
            0
        }
    } else {
        0
    };

    Variable {
        name,
        value: desc.value,
        type_: None,
        variables_reference,
        indexed_variables: if desc.indexed_count > 0 { Some(desc.indexed_count) } else { None },
        named_variables: if desc.named_count > 0 { Some(desc.named_count) } else { None },
    }
}

/// Wrap a bare line/column pair for a pass through [`Transformers`]; the
/// line-column stage is the only mandatory one, and it
/// ignores `script_id`/`path`, so breakpoint reconciliation (which has
/// neither handy) can use this without resolving a full location.
fn line_column(line: i64, column: Option<i64>) -> TransformLocation {
    TransformLocation { script_id: String::new(), path: String::new(), position: LineColumn { line, column } }
}

fn parse<T: serde::de::DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(Error::Json)
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Option<Value>> {
    Ok(Some(serde_json::to_value(value).map_err(Error::Json)?))
}
