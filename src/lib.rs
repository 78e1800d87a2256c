pub mod adapter;
pub mod cdp;
pub mod config;
pub mod dap;
pub mod error;

pub use error::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Run the bridge against a real CDP endpoint, speaking DAP over stdio.
///
/// This is the thin orchestration the binary calls: it wires a stdio-backed
/// [`dap::transport::DapTransport`] to a freshly constructed [`adapter::Adapter`]
/// and pumps messages until the transport closes or the session terminates.
///
/// The adapter owns an internal writer channel (see [`adapter::Adapter::new`])
/// rather than returning one reply per inbound request, because CDP events
/// (a `Debugger.paused` notification arriving between DAP requests) must be
/// able to push a `Stopped` event onto the wire independently of the
/// request/response cycle. This loop's only job is pumping both directions:
/// inbound DAP requests into the adapter, and whatever it writes back out to
/// the transport, in the order the adapter produced them.
pub async fn serve(config: config::Config) -> Result<()> {
    use adapter::Adapter;
    use dap::transport::DapTransport;
    use dap::transport_trait::DapTransportTrait;
    use tracing::{error, info};

    info!("starting DAP↔CDP bridge on stdio");

    let mut transport: Box<dyn DapTransportTrait> = Box::new(DapTransport::new_stdio());
    let (adapter, mut outbound) = Adapter::new(config);

    loop {
        tokio::select! {
            incoming = transport.read_message() => {
                let msg = match incoming {
                    Ok(msg) => msg,
                    Err(e) => {
                        error!("stdio transport closed: {}", e);
                        break;
                    }
                };
                adapter.handle_dap_message(msg).await;
            }
            outgoing = outbound.recv() => {
                match outgoing {
                    Some(msg) => transport.write_message(&msg).await?,
                    None => break,
                }
            }
        }

        if adapter.has_terminated().await {
            // Drain whatever the terminating request already queued (its
            // own response, plus the `terminated` event) before closing
            // the transport, so the editor sees both.
            while let Ok(msg) = outbound.try_recv() {
                transport.write_message(&msg).await?;
            }
            info!("session terminated, shutting down");
            break;
        }
    }

    Ok(())
}
