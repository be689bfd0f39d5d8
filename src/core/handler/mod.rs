// src/core/handler/mod.rs

//! Request processing: admission of a parsed request and routing of admitted ones.

pub mod admission;
pub mod command_router;
