//! User-facing command identifiers and their palette descriptors.
//!
//! The five locally handled commands keep the identifier strings the host
//! registers them under, so keybindings and palette entries stay stable
//! across hosts. Account operations are ultimately executed by the language
//! server; the `*_SERVER` names are the commands sent over the wire.

/// Command identifiers for locally handled commands
pub const RESTART_SERVER: &str = "cadence.restartServer";
pub const START_EMULATOR: &str = "cadence.runEmulator";
pub const STOP_EMULATOR: &str = "cadence.stopEmulator";
pub const CREATE_ACCOUNT: &str = "cadence.createAccount";
pub const SWITCH_ACCOUNT: &str = "cadence.switchActiveAccount";

/// Command identifiers for commands handled by the language server
pub const CREATE_ACCOUNT_SERVER: &str = "cadence.server.flow.createAccount";
pub const CREATE_DEFAULT_ACCOUNTS_SERVER: &str = "cadence.server.flow.createDefaultAccounts";
pub const SWITCH_ACCOUNT_SERVER: &str = "cadence.server.flow.switchActiveAccount";

/// A locally handled command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
    RestartServer,
    RunEmulator,
    StopEmulator,
    CreateAccount,
    SwitchActiveAccount,
}

impl CommandId {
    /// All locally handled commands, in registration order
    pub fn all() -> [CommandId; 5] {
        [
            CommandId::RestartServer,
            CommandId::RunEmulator,
            CommandId::StopEmulator,
            CommandId::CreateAccount,
            CommandId::SwitchActiveAccount,
        ]
    }

    /// The identifier string the host registers this command under
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandId::RestartServer => RESTART_SERVER,
            CommandId::RunEmulator => START_EMULATOR,
            CommandId::StopEmulator => STOP_EMULATOR,
            CommandId::CreateAccount => CREATE_ACCOUNT,
            CommandId::SwitchActiveAccount => SWITCH_ACCOUNT,
        }
    }

    /// Resolve an identifier string back to a command
    pub fn parse(identifier: &str) -> Option<CommandId> {
        CommandId::all()
            .into_iter()
            .find(|command| command.as_str() == identifier)
    }
}

/// A command descriptor for palette/menu display
#[derive(Debug, Clone)]
pub struct Command {
    pub id: CommandId,
    /// Command name (e.g., "Run Emulator")
    pub name: &'static str,
    /// Command description
    pub description: &'static str,
}

/// Get all available commands for the command palette
pub fn all_commands() -> Vec<Command> {
    vec![
        Command {
            id: CommandId::RestartServer,
            name: "Restart Language Server",
            description: "Stop the Cadence language server and start a new one",
        },
        Command {
            id: CommandId::RunEmulator,
            name: "Run Emulator",
            description: "Start the Flow emulator in a terminal",
        },
        Command {
            id: CommandId::StopEmulator,
            name: "Stop Emulator",
            description: "Stop the Flow emulator and clear local accounts",
        },
        Command {
            id: CommandId::CreateAccount,
            name: "Create Account",
            description: "Create a new account signed by the active account",
        },
        Command {
            id: CommandId::SwitchActiveAccount,
            name: "Switch Active Account",
            description: "Choose which account signs and submits transactions",
        },
    ]
}
