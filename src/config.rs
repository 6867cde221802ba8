use crate::address::with_address_prefix;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Main configuration for an emulator session.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    /// Name or path of the `flow` CLI binary used to start the emulator
    #[serde(default = "default_flow_command")]
    pub flow_command: String,

    /// Number of default accounts provisioned right after emulator startup
    #[serde(default = "default_num_accounts")]
    pub num_accounts: usize,

    /// Grace period in milliseconds between emitting the emulator start
    /// command and submitting the first transaction. The emulator gives no
    /// readiness signal, so this is a best-effort heuristic rather than a
    /// probe.
    #[serde(default = "default_bootstrap_delay")]
    pub bootstrap_delay_ms: u64,

    /// Command used to spawn the Cadence language server
    #[serde(default = "default_language_server_command")]
    pub language_server_command: String,

    /// Arguments passed to the language server command
    #[serde(default = "default_language_server_args")]
    pub language_server_args: Vec<String>,

    /// Service account parameters shared by the emulator and the language
    /// server
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_flow_command() -> String {
    "flow".to_string()
}

fn default_num_accounts() -> usize {
    3
}

fn default_bootstrap_delay() -> u64 {
    3000
}

fn default_language_server_command() -> String {
    "flow".to_string()
}

fn default_language_server_args() -> Vec<String> {
    vec!["cadence".to_string(), "language-server".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            flow_command: default_flow_command(),
            num_accounts: default_num_accounts(),
            bootstrap_delay_ms: default_bootstrap_delay(),
            language_server_command: default_language_server_command(),
            language_server_args: default_language_server_args(),
            server: ServerConfig::default(),
        }
    }
}

/// Static service account parameters. Supplied once at construction and
/// read-only afterwards: the emulator is started with these, and the language
/// server signs with the same key.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ServerConfig {
    /// Hex-encoded service account private key
    #[serde(default)]
    pub service_private_key: String,

    /// Signature algorithm identifier for the service key
    #[serde(default = "default_signature_algorithm")]
    pub service_key_signature_algorithm: String,

    /// Hash algorithm identifier for the service key
    #[serde(default = "default_hash_algorithm")]
    pub service_key_hash_algorithm: String,
}

fn default_signature_algorithm() -> String {
    "ECDSA_P256".to_string()
}

fn default_hash_algorithm() -> String {
    "SHA3_256".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service_private_key: String::new(),
            service_key_signature_algorithm: default_signature_algorithm(),
            service_key_hash_algorithm: default_hash_algorithm(),
        }
    }
}

/// An account known to the session. Identity is the registry index; the
/// address is whatever the language server returned for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub index: usize,
    pub address: String,
}

impl Account {
    /// Short display name, 1-based to match what users see in dialogs
    pub fn name(&self) -> String {
        format!("Account {}", self.index + 1)
    }

    /// Full label used in pickers and notifications
    pub fn full_name(&self) -> String {
        format!("{} ({})", self.name(), with_address_prefix(&self.address))
    }
}

/// Insertion-ordered collection of accounts plus the designated active one.
///
/// Indices are assigned sequentially on insertion, so they always form a
/// contiguous range starting at 0. The active index, when set, always
/// references an existing entry; `reset` clears both together.
#[derive(Debug, Default)]
pub struct AccountRegistry {
    accounts: Vec<Account>,
    active_index: Option<usize>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an account at the next index and return it.
    pub fn add_account(&mut self, address: String) -> &Account {
        let index = self.accounts.len();
        self.accounts.push(Account { index, address });
        tracing::debug!("Registered account at index {}", index);
        &self.accounts[index]
    }

    pub fn get(&self, index: usize) -> Option<&Account> {
        self.accounts.get(index)
    }

    /// Mark the account at `index` active. Returns false (and changes
    /// nothing) if no such account exists.
    pub fn set_active(&mut self, index: usize) -> bool {
        if index < self.accounts.len() {
            self.active_index = Some(index);
            true
        } else {
            false
        }
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active_index
    }

    pub fn active_account(&self) -> Option<&Account> {
        self.active_index.and_then(|index| self.accounts.get(index))
    }

    /// Drop all accounts and the active designation together.
    pub fn reset(&mut self) {
        self.accounts.clear();
        self.active_index = None;
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter()
    }
}
