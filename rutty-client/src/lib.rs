//! # rutty-client: console client for RuTTY
//!
//! Attaches the local terminal to a RuTTY server: remote output goes to
//! stdout, key presses and window resizes go back over the socket.

pub mod config;
pub mod console;
pub mod keys;
