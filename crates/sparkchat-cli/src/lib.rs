//! Terminal front end for Spark Chat.
//!
//! Provides the interactive chat loop, slash commands and plain-text rendering on top of
//! `sparkchat-core`. The `sparkchat` binary wires these to stdin, stdout and Ctrl+C.

pub mod input;
pub mod render;
pub mod repl;
pub mod slash_commands;
