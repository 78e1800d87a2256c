//! The `RpcClient` collaborator: physical websocket framing and
//! reconnection to the runtime are out of scope here, so this module only
//! defines the typed request/response and event-subscription contract the
//! [`crate::adapter::Adapter`] calls through. CDP multiplexes commands and
//! events over one connection, so one trait covers both instead of
//! splitting transport from dispatch.

use crate::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

pub type EventCallback = Arc<dyn Fn(Value) + Send + Sync>;

/// Downstream CDP peer: a browser tab or V8-compatible runtime.
///
/// A concrete implementation owns the websocket (or equivalent) connection,
/// assigns CDP message ids, and dispatches `method` notifications to
/// registered callbacks.
#[async_trait]
pub trait RpcClient: Send + Sync {
    /// Send a CDP command (e.g. `"Debugger.setBreakpoint"`) and await its result.
    async fn call(&self, method: &str, params: Value) -> Result<Value>;

    /// Register a callback invoked for every CDP event/notification matching
    /// `method` (e.g. `"Debugger.paused"`). Multiple callbacks may be
    /// registered for the same method; all are invoked.
    async fn on_event(&self, method: &str, callback: EventCallback);
}

/// Convenience helpers layered over [`RpcClient::call`] so call sites don't
/// repeat the `serde_json::to_value` / `from_value` dance.
#[async_trait]
pub trait RpcClientExt: RpcClient {
    async fn call_typed<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let raw = self.call(method, params).await?;
        serde_json::from_value(raw).map_err(|e| crate::Error::Cdp(format!("malformed response to {}: {}", method, e)))
    }
}

impl<T: RpcClient + ?Sized> RpcClientExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use serde_json::json;

    mock! {
        pub Rpc {}

        #[async_trait]
        impl RpcClient for Rpc {
            async fn call(&self, method: &str, params: Value) -> Result<Value>;
            async fn on_event(&self, method: &str, callback: EventCallback);
        }
    }

    #[tokio::test]
    async fn call_typed_deserializes_the_result() {
        let mut rpc = MockRpc::new();
        rpc.expect_call()
            .withf(|m, _| m == "Debugger.setBreakpoint")
            .returning(|_, _| Ok(json!({"breakpointId": "1:0:0:scriptA", "actualLocation": {"scriptId": "scriptA", "lineNumber": 9}})));

        #[derive(serde::Deserialize)]
        struct Resp {
            #[allow(dead_code)]
            breakpoint_id: String,
        }
        let resp: Resp = rpc.call_typed("Debugger.setBreakpoint", json!({})).await.unwrap();
        assert_eq!(resp.breakpoint_id, "1:0:0:scriptA");
    }

    #[tokio::test]
    async fn call_typed_surfaces_deserialize_errors_as_cdp_errors() {
        let mut rpc = MockRpc::new();
        rpc.expect_call().returning(|_, _| Ok(json!({"unexpected": true})));

        #[derive(serde::Deserialize)]
        #[allow(dead_code)]
        struct Resp {
            breakpoint_id: String,
        }
        let err = rpc.call_typed::<Resp>("Debugger.setBreakpoint", json!({})).await.unwrap_err();
        assert!(matches!(err, crate::Error::Cdp(_)));
    }
}
