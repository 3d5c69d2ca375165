//! Tenkibot core library — config, LINE channel, forecast client, responder,
//! and webhook gateway used by the CLI binary.

pub mod channels;
pub mod config;
pub mod forecast;
pub mod gateway;
pub mod init;
pub mod responder;
