//! Emulator session: lifecycle state machine and command handlers.
//!
//! [`EmulatorSession`] is the explicit replacement for a host-global
//! extension object: every collaborator it touches (terminal, language
//! server, UI) is owned here and every mutation happens inside `execute` or
//! `process_events`, both driven by the host loop.
//!
//! Lifecycle: Stopped →(run)→ Starting → Started →(stop)→ Stopped. The one
//! exception is a bootstrap failure, which drops straight from Started to
//! Stopped without disposing the terminal, so the user can read the emulator
//! output that explains the failure.

use crate::address::strip_address_prefix;
use crate::commands::CommandId;
use crate::config::{AccountRegistry, Config};
use crate::error::{SessionError, Severity};
use crate::services::language_server::{AccountService, LanguageServerConnector};
use crate::services::terminal::{EmulatorTerminal, TerminalFactory};
use crate::session_bridge::{SessionBridge, SessionEvent};
use crate::ui::{refresh_document_views, PickItem, StatusSnapshot, UserInterface};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Suffix marking the active account in the picker
const ACTIVE_LABEL_SUFFIX: &str = " (active)";

/// Emulator lifecycle state. Owned by the session; transitions only through
/// the session's own handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmulatorState {
    Stopped,
    Starting,
    Started,
}

impl fmt::Display for EmulatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EmulatorState::Stopped => "stopped",
            EmulatorState::Starting => "starting",
            EmulatorState::Started => "started",
        };
        f.write_str(label)
    }
}

/// One editor session: emulator lifecycle, account registry, and the
/// collaborators the command handlers act on. Lives from activation until
/// the host tears it down; `stop`/`restart` replace the proxy and terminal
/// but the session object itself persists.
pub struct EmulatorSession {
    config: Config,
    accounts: AccountRegistry,
    emulator_state: EmulatorState,
    terminal: Box<dyn EmulatorTerminal>,
    terminal_factory: Box<dyn TerminalFactory>,
    service: Arc<dyn AccountService>,
    connector: Box<dyn LanguageServerConnector>,
    ui: Box<dyn UserInterface>,
    bridge: SessionBridge,
    /// Pending post-start bootstrap task, if any
    bootstrap: Option<JoinHandle<()>>,
    /// Incremented whenever a bootstrap is started or invalidated; events
    /// from older generations are dropped on arrival.
    bootstrap_generation: u64,
}

impl EmulatorSession {
    /// Connect the language server and build a session in the Stopped state.
    pub async fn new(
        config: Config,
        terminal_factory: Box<dyn TerminalFactory>,
        connector: Box<dyn LanguageServerConnector>,
        ui: Box<dyn UserInterface>,
    ) -> anyhow::Result<Self> {
        let service = connector.connect(&config).await?;
        let terminal = terminal_factory.create();
        Ok(Self {
            config,
            accounts: AccountRegistry::new(),
            emulator_state: EmulatorState::Stopped,
            terminal,
            terminal_factory,
            service,
            connector,
            ui,
            bridge: SessionBridge::new(),
            bootstrap: None,
            bootstrap_generation: 0,
        })
    }

    pub fn emulator_state(&self) -> EmulatorState {
        self.emulator_state
    }

    pub fn accounts(&self) -> &AccountRegistry {
        &self.accounts
    }

    /// Dispatch a user-invoked command to its handler.
    pub async fn execute(&mut self, command: CommandId) {
        tracing::info!("Executing command {}", command.as_str());
        match command {
            CommandId::RestartServer => self.restart_server().await,
            CommandId::RunEmulator => self.start_emulator().await,
            CommandId::StopEmulator => self.stop_emulator().await,
            CommandId::CreateAccount => self.create_account().await,
            CommandId::SwitchActiveAccount => self.switch_active_account().await,
        }
    }

    /// Apply results delivered by background tasks. The host calls this each
    /// tick of its event loop.
    pub async fn process_events(&mut self) {
        for event in self.bridge.try_recv_all() {
            self.apply(event).await;
        }
    }

    /// Restart the language server: stop the current client and connect a
    /// new one bound to the same configuration. A pending bootstrap would
    /// complete against the old client's state, so it is invalidated first.
    pub async fn restart_server(&mut self) {
        self.cancel_pending_bootstrap();
        if let Err(e) = self.service.stop().await {
            tracing::warn!("Language server did not stop cleanly: {:#}", e);
        }
        match self.connector.connect(&self.config).await {
            Ok(service) => {
                self.service = service;
                tracing::info!("Language server restarted");
            }
            Err(e) => self.report(SessionError::ServerRestart(e)),
        }
    }

    /// Start the emulator in the terminal and schedule the account
    /// bootstrap. A start while already starting or started is ignored;
    /// the emulator owns its database and a second start would corrupt it.
    pub async fn start_emulator(&mut self) {
        if self.emulator_state != EmulatorState::Stopped {
            tracing::warn!(
                "Ignoring emulator start request while {}",
                self.emulator_state
            );
            return;
        }

        self.emulator_state = EmulatorState::Starting;
        self.render();

        // Start the emulator with the service key the language server signs
        // with. Flag set and order are the contract with the flow CLI.
        let server = &self.config.server;
        let command_line = [
            self.config.flow_command.as_str(),
            "emulator",
            "start",
            "--init",
            "--verbose",
            "--service-priv-key",
            server.service_private_key.as_str(),
            "--service-sig-algo",
            server.service_key_signature_algorithm.as_str(),
            "--service-hash-algo",
            server.service_key_hash_algorithm.as_str(),
        ]
        .join(" ");
        self.terminal.send_text(&command_line);
        self.terminal.show();

        self.emulator_state = EmulatorState::Started;
        self.render();

        self.spawn_bootstrap();
    }

    /// Stop the emulator: replace the terminal, clear local accounts, and
    /// restart the language server so its session state matches.
    pub async fn stop_emulator(&mut self) {
        self.cancel_pending_bootstrap();

        self.terminal.dispose();
        self.terminal = self.terminal_factory.create();

        self.emulator_state = EmulatorState::Stopped;
        self.accounts.reset();
        self.render();

        if let Err(e) = self.service.stop().await {
            tracing::warn!("Language server did not stop cleanly: {:#}", e);
        }
        match self.connector.connect(&self.config).await {
            Ok(service) => self.service = service,
            Err(e) => self.report(SessionError::ServerRestart(e)),
        }
    }

    /// Create a new account by asking the language server to submit a
    /// create-account transaction signed by the active account.
    pub async fn create_account(&mut self) {
        match self.service.create_account().await {
            Ok(address) => {
                let account = self.accounts.add_account(address);
                tracing::info!("Created {}", account.full_name());
                self.render();
            }
            Err(e) => self.report(SessionError::CreateAccount(e)),
        }
    }

    /// Let the user pick the account that signs from now on.
    pub async fn switch_active_account(&mut self) {
        let options: Vec<PickItem> = self
            .accounts
            .iter()
            .map(|account| {
                let mut label = account.full_name();
                if Some(account.index) == self.accounts.active_index() {
                    label.push_str(ACTIVE_LABEL_SUFFIX);
                }
                PickItem {
                    label,
                    target: account.index,
                }
            })
            .collect();

        let Some(index) = self.ui.pick(&options) else {
            return; // picker dismissed
        };

        self.set_active_account(index).await;

        // Only celebrate a committed switch; a proxy failure above leaves
        // the previous account active.
        if self.accounts.active_index() == Some(index) {
            if let Some(account) = self.accounts.get(index) {
                let message = format!("Switched to account {}", account.full_name());
                self.ui.show_info(&message);
            }
            self.render();
        }
    }

    /// Make `index` the active account: notify the language server, refresh
    /// visible documents so inline annotations recompute, then commit. Any
    /// failure before the commit leaves the previous active account in
    /// effect.
    pub async fn set_active_account(&mut self, index: usize) {
        let address = match self.accounts.get(index) {
            Some(account) => account.address.clone(),
            None => {
                self.report(SessionError::UnknownAccount { index });
                return;
            }
        };

        if let Err(e) = self
            .service
            .switch_active_account(strip_address_prefix(&address))
            .await
        {
            self.report(SessionError::SwitchAccount(e));
            return;
        }

        refresh_document_views(self.ui.as_mut());
        self.accounts.set_active(index);
        tracing::info!("Active account is now index {}", index);
    }

    /// Schedule the post-start bootstrap: wait out the emulator's startup
    /// grace period, then provision the default accounts. The outcome comes
    /// back through the bridge tagged with the current generation.
    fn spawn_bootstrap(&mut self) {
        self.bootstrap_generation += 1;
        let generation = self.bootstrap_generation;
        let service = Arc::clone(&self.service);
        let sender = self.bridge.sender();
        let delay = Duration::from_millis(self.config.bootstrap_delay_ms);
        let count = self.config.num_accounts;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let event = match service.create_default_accounts(count).await {
                Ok(addresses) => SessionEvent::BootstrapReady {
                    generation,
                    addresses,
                },
                Err(e) => SessionEvent::BootstrapFailed {
                    generation,
                    error: format!("{:#}", e),
                },
            };
            let _ = sender.send(event);
        });
        self.bootstrap = Some(handle);
        tracing::debug!("Scheduled account bootstrap (generation {})", generation);
    }

    /// Abort any pending bootstrap and invalidate its generation so a result
    /// already in flight is dropped on arrival.
    fn cancel_pending_bootstrap(&mut self) {
        self.bootstrap_generation += 1;
        if let Some(handle) = self.bootstrap.take() {
            handle.abort();
            tracing::debug!("Cancelled pending account bootstrap");
        }
    }

    async fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::BootstrapReady {
                generation,
                addresses,
            } => {
                if generation != self.bootstrap_generation {
                    tracing::debug!("Dropping stale bootstrap result");
                    return;
                }
                self.bootstrap = None;
                for address in addresses {
                    self.accounts.add_account(address);
                }
                // The first default account signs until the user switches.
                self.set_active_account(0).await;
                self.render();
            }
            SessionEvent::BootstrapFailed { generation, error } => {
                if generation != self.bootstrap_generation {
                    tracing::debug!("Dropping stale bootstrap failure");
                    return;
                }
                self.bootstrap = None;
                // The terminal stays up so the user can inspect the emulator
                // output that explains the failure.
                self.emulator_state = EmulatorState::Stopped;
                self.render();
                self.report(SessionError::Bootstrap(anyhow::anyhow!(error)));
            }
        }
    }

    /// Surface an error according to its severity class.
    fn report(&mut self, error: SessionError) {
        let severity = error.severity();
        let message = error.to_string();
        // The anyhow wrapper prints the full source chain in the log even
        // when the dialog text stays short.
        tracing::error!("{:#}", anyhow::Error::new(error));
        match severity {
            Severity::Error => self.ui.show_error(&message),
            Severity::Warning => self.ui.show_warning(&message),
            Severity::Internal => {}
        }
    }

    /// Push the current emulator state and active account to the host's
    /// status surface.
    fn render(&mut self) {
        let status = StatusSnapshot {
            emulator_state: self.emulator_state,
            active_account: self.accounts.active_account().map(|a| a.full_name()),
        };
        self.ui.render(&status);
    }
}
