//! Emulator session core for Cadence/Flow editor integrations.
//!
//! This crate implements the editor-side glue between user-invoked commands
//! (restart language server, run/stop emulator, create account, switch active
//! account) and three collaborators:
//!
//! - a pseudo-terminal that runs the `flow emulator` process,
//! - a Cadence language server spoken to over JSON-RPC on stdio,
//! - the host editor's UI (dialogs, picker, open document views).
//!
//! The host owns the event loop: it constructs an [`session::EmulatorSession`],
//! forwards user commands to [`session::EmulatorSession::execute`], and drains
//! completed background work each tick via
//! [`session::EmulatorSession::process_events`]. All session state mutation
//! happens inside those two entry points; background tasks report back only
//! through the [`session_bridge::SessionBridge`] channel.

pub mod address;
pub mod commands;
pub mod config;
pub mod error;
pub mod services;
pub mod session;
pub mod session_bridge;
pub mod ui;

pub use config::{Account, AccountRegistry, Config, ServerConfig};
pub use error::{SessionError, Severity};
pub use services::language_server::{AccountService, LanguageServerConnector, StdioConnector};
pub use services::terminal::{EmulatorTerminal, PtyTerminalFactory, TerminalFactory};
pub use session::{EmulatorSession, EmulatorState};
pub use session_bridge::{SessionBridge, SessionEvent};
pub use ui::{DocumentView, PickItem, StatusSnapshot, UserInterface};
