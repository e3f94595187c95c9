//! Freshdesk MCP server
//!
//! Exposes Freshdesk tickets, conversations and companies as MCP tools over
//! stdio. Conversation listings are cut to a caller-supplied size budget and
//! can be resumed from the returned token.

pub mod budget;
pub mod client;
pub mod config;
pub mod error;
pub mod markup;
pub mod metrics;
pub mod server;
pub mod tools;

pub use client::FreshdeskClient;
pub use config::Config;
pub use error::{FreshdeskError, Result};
pub use server::McpServer;
pub use tools::{ToolContext, ToolRegistry};
