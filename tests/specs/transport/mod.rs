//! Socket server and gateway fallback.

mod degrade;
mod server;
