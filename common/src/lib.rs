//! Wire-level building blocks shared by the compatibility kit:
//! the JSON-RPC gateway to the SDK under test and the key codec.

#![allow(clippy::result_large_err)]

pub mod context;
pub mod crypto;
pub mod rpc;

pub use context::TestContext;
