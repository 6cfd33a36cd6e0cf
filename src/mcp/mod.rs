//! MCP (Model Context Protocol) server and tool types.
//!
//! This module provides an MCP server implementation for the Code Engine API,
//! allowing AI assistants to inspect and clean up projects, apps, jobs,
//! builds, config maps and secrets.
//!
//! # Example
//!
//! ```no_run
//! use codeengine::mcp::CodeEngineServer;
//!
//! # fn main() -> codeengine::Result<()> {
//! let server = CodeEngineServer::from_env()?;
//! // Server can now be used with rmcp transport
//! # Ok(())
//! # }
//! ```

mod params;
mod server;

pub use params::*;
pub use server::CodeEngineServer;
