// src/core/commands/mod.rs

//! Command metadata and the commands the proxy answers itself.
//!
//! `table` holds the dispatch table consulted by admission, `rules` the static lists it is
//! built from, and `proxy` the `PROXY ...` administrative sub-protocol.

pub mod proxy;
pub(crate) mod rules;
pub mod table;

pub use table::{CommandEntry, CommandFlags, CommandTable, Handler, MultiKeyCommand};
