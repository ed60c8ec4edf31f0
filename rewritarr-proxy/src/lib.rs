mod config;
mod error;
mod forward;
mod proxy;
mod tunnel;

pub use config::{ListenConfig, ProxyConfig, TimeoutConfig, UpstreamProxy};
pub use error::ProxyError;
pub use proxy::Proxy;
