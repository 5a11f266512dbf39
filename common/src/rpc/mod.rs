#[cfg(feature = "rpc-client")]
mod http;

mod client;
mod error;
mod types;

pub use client::*;
pub use error::*;
#[cfg(feature = "rpc-client")]
pub use http::*;
pub use types::*;
