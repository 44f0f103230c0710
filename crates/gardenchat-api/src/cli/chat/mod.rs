//! Interactive CLI chat experience for gardenchat.
//!
//! Streams replies token by token, renders markdown, and handles slash
//! commands for settings, attachments and history. Entry point:
//! `loop_runner::run_chat_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
pub mod picker;
pub mod renderer;
