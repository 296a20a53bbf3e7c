//! # dealroom
//!
//! Terminal front end for a dealroom chat room: argument parsing and
//! message rendering. The binary in `main.rs` wires these to a
//! [`dealroom_client::ChatSession`].

#![deny(unsafe_code)]

pub mod cli;
pub mod render;
