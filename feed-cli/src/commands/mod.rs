//! CLI command implementations.

pub mod chat;
pub mod init;
pub mod replay;
