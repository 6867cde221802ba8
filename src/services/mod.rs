//! External collaborators: the language server connection and the emulator
//! terminal. Everything here runs process I/O; session state lives in
//! [`crate::session`].

pub mod language_server;
pub mod terminal;
