// src/core/commands/table.rs

//! The dispatch table: every command the proxy routes, mapped to its arity bounds, flags,
//! and the handler that serves it. Built once at startup and shared read-only.

use super::rules::{COMMAND_RULES, FORBIDDEN_COMMANDS, READONLY_COMMANDS};
use bitflags::bitflags;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

bitflags! {
    /// Properties of a command that matter to routing and admission.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CommandFlags: u32 {
        /// The first argument is a key and is subject to the key blacklist.
        const KEYED    = 1 << 0;
        /// The command never modifies data and may be served by a replica.
        const READONLY = 1 << 1;
        /// The command is answered by the proxy itself.
        const ADMIN    = 1 << 2;
    }
}

/// Multi-key commands that the fan-out engine decomposes (or answers locally).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, EnumIter, Display)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum MultiKeyCommand {
    Mget,
    Mset,
    Del,
    Msetnx,
    Rename,
    Renamenx,
    Rpoplpush,
    Sdiff,
    Sdiffstore,
    Sinter,
    Sinterstore,
    Smove,
    Zunionstore,
    Zinterstore,
}

impl MultiKeyCommand {
    /// True for the commands that are decomposed into per-key backend calls. The rest are
    /// acknowledged without contacting the backend.
    pub fn is_decomposed(self) -> bool {
        matches!(
            self,
            MultiKeyCommand::Mget | MultiKeyCommand::Mset | MultiKeyCommand::Del
        )
    }
}

/// How an admitted command is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// A single call to the backend gateway, reply relayed verbatim.
    Forward,
    /// Decomposed by the fan-out engine.
    FanOut(MultiKeyCommand),
    /// A `PROXY` administrative operation.
    Admin,
}

/// One row of the dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    pub name: &'static str,
    /// Minimum element count, command name included.
    pub min_args: usize,
    /// Maximum element count, command name included. `None` means unbounded.
    pub max_args: Option<usize>,
    pub flags: CommandFlags,
    pub handler: Handler,
}

impl CommandEntry {
    /// Checks an element count (name included) against the arity bounds.
    pub fn accepts(&self, len: usize) -> bool {
        len >= self.min_args && self.max_args.is_none_or(|max| len <= max)
    }

    pub fn is_keyed(&self) -> bool {
        self.flags.contains(CommandFlags::KEYED)
    }

    pub fn is_readonly(&self) -> bool {
        self.flags.contains(CommandFlags::READONLY)
    }
}

#[derive(Debug, Clone)]
pub struct CommandTable {
    entries: HashMap<&'static str, CommandEntry>,
    forbidden: HashSet<&'static str>,
}

impl CommandTable {
    /// Builds the table the proxy runs with.
    pub fn standard() -> Self {
        let readonly: HashSet<&str> = READONLY_COMMANDS.iter().copied().collect();
        let entries = COMMAND_RULES
            .iter()
            .map(|&(name, min_args, max_args)| {
                let handler = Self::handler_for(name);
                let mut flags = CommandFlags::empty();
                match handler {
                    Handler::Admin => flags |= CommandFlags::ADMIN,
                    _ => flags |= CommandFlags::KEYED,
                }
                if readonly.contains(name) {
                    flags |= CommandFlags::READONLY;
                }
                let entry = CommandEntry {
                    name,
                    min_args,
                    max_args,
                    flags,
                    handler,
                };
                (name, entry)
            })
            .collect();

        Self {
            entries,
            forbidden: FORBIDDEN_COMMANDS.iter().copied().collect(),
        }
    }

    fn handler_for(name: &str) -> Handler {
        if name == "PROXY" {
            Handler::Admin
        } else if let Ok(cmd) = MultiKeyCommand::from_str(name) {
            Handler::FanOut(cmd)
        } else {
            Handler::Forward
        }
    }

    /// Looks up an uppercased command name.
    pub fn lookup(&self, name: &str) -> Option<&CommandEntry> {
        self.entries.get(name)
    }

    pub fn is_forbidden(&self, name: &str) -> bool {
        self.forbidden.contains(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &CommandEntry> {
        self.entries.values()
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::standard()
    }
}
