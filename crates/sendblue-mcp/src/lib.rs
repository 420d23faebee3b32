//! Sendblue SMS/iMessage API exposed as MCP tools.
//!
//! The layering is: [`config`] resolves credentials and endpoints once, [`validation`] turns raw
//! tool arguments into checked request values, [`tools`] shapes them into outbound calls, and
//! [`gateway`] is the only place that talks HTTP. [`server`] binds the tools onto rmcp.

pub mod config;
pub mod error;
pub mod gateway;
pub mod semantics;
pub mod server;
pub mod tools;
pub mod validation;

pub use config::{Cli, Config, LogFormat, Transport};
pub use error::{ConfigError, GatewayError, ValidationError};
pub use server::SendblueServer;
