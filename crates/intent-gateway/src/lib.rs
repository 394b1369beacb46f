//! The Gateway transport abstraction (proto / stub) and the retrying
//! client that sits on top of it.

pub mod cache;
pub mod client;
pub mod pb;
pub mod proto_transport;
pub mod stub;
pub mod tls;
pub mod transport;

pub use cache::get_or_insert_with;
pub use client::{GatewayClient, RegisterDidOptions};
pub use proto_transport::ProtoTransport;
pub use stub::StubTransport;
pub use transport::{GatewayCredentials, Transport};
