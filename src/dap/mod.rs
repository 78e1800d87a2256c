pub mod transport;
pub mod transport_trait;
pub mod types;

pub use transport::DapTransport;
pub use transport_trait::DapTransportTrait;
