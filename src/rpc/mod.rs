//! Local RPC between the gorun client and gorund
//!
//! Transport is a Unix socket in the working directory; nothing is
//! reachable from another host.

pub mod client;
pub mod protocol;
pub mod server;

pub use client::Client;
pub use protocol::{ExecutableRequest, ExecutableResponse, RebuildResponse, Request, Response};
pub use server::{Server, ServerHandle};
