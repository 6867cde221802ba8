#![allow(dead_code)]
//! Fake collaborators for session tests.
//!
//! Each fake records what the session did to it in a shared handle the test
//! keeps a clone of, so assertions work after the session has taken ownership
//! of the trait objects.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use cadence_session::{
    AccountService, Config, DocumentView, EmulatorSession, EmulatorTerminal,
    LanguageServerConnector, PickItem, StatusSnapshot, TerminalFactory, UserInterface,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// Language server fakes

/// Everything one fake service instance observed, plus the switch failure
/// toggle tests can flip mid-scenario.
#[derive(Debug, Default)]
pub struct ServiceLog {
    pub default_account_calls: Vec<usize>,
    pub switched_to: Vec<String>,
    pub stopped: bool,
    pub fail_switch: bool,
}

/// Scripted behavior for services handed out by [`FakeConnector`].
#[derive(Debug, Clone)]
pub struct FakeServiceSpec {
    /// Outcome of `create_default_accounts`
    pub default_accounts: Result<Vec<String>, String>,
    /// Outcomes of successive `create_account` calls
    pub create_results: Vec<Result<String, String>>,
    pub fail_switch: bool,
}

impl Default for FakeServiceSpec {
    fn default() -> Self {
        Self {
            default_accounts: Ok(vec![]),
            create_results: vec![],
            fail_switch: false,
        }
    }
}

pub struct FakeAccountService {
    log: Arc<Mutex<ServiceLog>>,
    default_accounts: Result<Vec<String>, String>,
    create_results: Mutex<VecDeque<Result<String, String>>>,
}

#[async_trait]
impl AccountService for FakeAccountService {
    async fn create_account(&self) -> Result<String> {
        match self.create_results.lock().unwrap().pop_front() {
            Some(Ok(address)) => Ok(address),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("no scripted create_account result")),
        }
    }

    async fn create_default_accounts(&self, count: usize) -> Result<Vec<String>> {
        self.log.lock().unwrap().default_account_calls.push(count);
        self.default_accounts.clone().map_err(|message| anyhow!(message))
    }

    async fn switch_active_account(&self, address: &str) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        if log.fail_switch {
            return Err(anyhow!("rpc connection reset"));
        }
        log.switched_to.push(address.to_string());
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.log.lock().unwrap().stopped = true;
        Ok(())
    }
}

/// Connector that hands out [`FakeAccountService`]s built from one spec and
/// records a log handle per connection.
pub struct FakeConnector {
    pub spec: FakeServiceSpec,
    pub connects: Arc<AtomicUsize>,
    pub services: Arc<Mutex<Vec<Arc<Mutex<ServiceLog>>>>>,
}

#[async_trait]
impl LanguageServerConnector for FakeConnector {
    async fn connect(&self, _config: &Config) -> Result<Arc<dyn AccountService>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let log = Arc::new(Mutex::new(ServiceLog {
            fail_switch: self.spec.fail_switch,
            ..ServiceLog::default()
        }));
        self.services.lock().unwrap().push(Arc::clone(&log));
        Ok(Arc::new(FakeAccountService {
            log,
            default_accounts: self.spec.default_accounts.clone(),
            create_results: Mutex::new(self.spec.create_results.clone().into()),
        }))
    }
}

// ---------------------------------------------------------------------------
// Terminal fakes

/// Shared across every terminal the factory creates, so tests see dispose on
/// the old terminal and sends on the replacement in one place.
#[derive(Debug, Default)]
pub struct TerminalLog {
    pub sent: Vec<String>,
    pub shows: usize,
    pub disposes: usize,
    pub created: usize,
}

pub struct FakeTerminal {
    log: Arc<Mutex<TerminalLog>>,
}

impl EmulatorTerminal for FakeTerminal {
    fn send_text(&mut self, text: &str) {
        self.log.lock().unwrap().sent.push(text.to_string());
    }

    fn show(&mut self) {
        self.log.lock().unwrap().shows += 1;
    }

    fn dispose(&mut self) {
        self.log.lock().unwrap().disposes += 1;
    }
}

pub struct FakeTerminalFactory {
    pub log: Arc<Mutex<TerminalLog>>,
}

impl TerminalFactory for FakeTerminalFactory {
    fn create(&self) -> Box<dyn EmulatorTerminal> {
        self.log.lock().unwrap().created += 1;
        Box::new(FakeTerminal {
            log: Arc::clone(&self.log),
        })
    }
}

// ---------------------------------------------------------------------------
// UI fakes

#[derive(Debug, Default)]
pub struct UiLog {
    pub infos: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub renders: Vec<StatusSnapshot>,
    /// Options shown by each picker invocation
    pub pick_options: Vec<Vec<PickItem>>,
}

pub struct FakeUi {
    pub log: Arc<Mutex<UiLog>>,
    /// What the user "selects" in the picker; `None` = dismissed
    pub pick_response: Option<usize>,
    pub views: Vec<FakeDocumentView>,
}

impl UserInterface for FakeUi {
    fn show_info(&mut self, message: &str) {
        self.log.lock().unwrap().infos.push(message.to_string());
    }

    fn show_warning(&mut self, message: &str) {
        self.log.lock().unwrap().warnings.push(message.to_string());
    }

    fn show_error(&mut self, message: &str) {
        self.log.lock().unwrap().errors.push(message.to_string());
    }

    fn pick(&mut self, options: &[PickItem]) -> Option<usize> {
        self.log.lock().unwrap().pick_options.push(options.to_vec());
        self.pick_response
    }

    fn visible_documents(&mut self) -> Vec<&mut dyn DocumentView> {
        self.views
            .iter_mut()
            .map(|view| view as &mut dyn DocumentView)
            .collect()
    }

    fn render(&mut self, status: &StatusSnapshot) {
        self.log.lock().unwrap().renders.push(status.clone());
    }
}

/// Document view over shared line storage; the test keeps a clone to inspect
/// the text and the edit log after the session mutated it.
#[derive(Clone)]
pub struct FakeDocumentView {
    pub lines: Arc<Mutex<Vec<String>>>,
    pub edits: Arc<Mutex<Vec<String>>>,
    pub supports_refresh: bool,
    pub refresh_requests: Arc<AtomicUsize>,
}

impl FakeDocumentView {
    pub fn new(lines: &[&str], supports_refresh: bool) -> Self {
        Self {
            lines: Arc::new(Mutex::new(lines.iter().map(|l| l.to_string()).collect())),
            edits: Arc::new(Mutex::new(Vec::new())),
            supports_refresh,
            refresh_requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn text(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn edit_count(&self) -> usize {
        self.edits.lock().unwrap().len()
    }
}

impl DocumentView for FakeDocumentView {
    fn line_count(&self) -> usize {
        self.lines.lock().unwrap().len()
    }

    fn is_line_blank(&self, line: usize) -> bool {
        self.lines
            .lock()
            .unwrap()
            .get(line)
            .map(|l| l.trim().is_empty())
            .unwrap_or(true)
    }

    fn insert(&mut self, line: usize, column: usize, text: &str) {
        self.edits
            .lock()
            .unwrap()
            .push(format!("insert {}:{} {:?}", line, column, text));
        let mut lines = self.lines.lock().unwrap();
        if text == "\n" {
            let tail = {
                let current = &mut lines[line];
                let column = column.min(current.len());
                current.split_off(column)
            };
            lines.insert(line + 1, tail);
        } else {
            let current = &mut lines[line];
            let column = column.min(current.len());
            current.insert_str(column, text);
        }
    }

    fn delete(&mut self, line: usize, start_column: usize, end_column: usize) {
        self.edits
            .lock()
            .unwrap()
            .push(format!("delete {}:{}..{}", line, start_column, end_column));
        let mut lines = self.lines.lock().unwrap();
        let current = &mut lines[line];
        let start = start_column.min(current.len());
        let end = end_column.min(current.len());
        current.replace_range(start..end, "");
    }

    fn request_refresh(&mut self) -> bool {
        self.refresh_requests.fetch_add(1, Ordering::SeqCst);
        self.supports_refresh
    }
}

// ---------------------------------------------------------------------------
// Harness

/// A session wired to fakes, plus the handles the test asserts on.
pub struct Harness {
    pub session: EmulatorSession,
    pub ui: Arc<Mutex<UiLog>>,
    pub terminals: Arc<Mutex<TerminalLog>>,
    pub connects: Arc<AtomicUsize>,
    pub services: Arc<Mutex<Vec<Arc<Mutex<ServiceLog>>>>>,
}

impl Harness {
    pub async fn new(
        config: Config,
        spec: FakeServiceSpec,
        pick_response: Option<usize>,
        views: Vec<FakeDocumentView>,
    ) -> Self {
        let ui_log = Arc::new(Mutex::new(UiLog::default()));
        let terminal_log = Arc::new(Mutex::new(TerminalLog::default()));
        let connects = Arc::new(AtomicUsize::new(0));
        let services = Arc::new(Mutex::new(Vec::new()));

        let session = EmulatorSession::new(
            config,
            Box::new(FakeTerminalFactory {
                log: Arc::clone(&terminal_log),
            }),
            Box::new(FakeConnector {
                spec,
                connects: Arc::clone(&connects),
                services: Arc::clone(&services),
            }),
            Box::new(FakeUi {
                log: Arc::clone(&ui_log),
                pick_response,
                views,
            }),
        )
        .await
        .expect("fake connector never fails");

        Self {
            session,
            ui: ui_log,
            terminals: terminal_log,
            connects,
            services,
        }
    }

    /// Log handle of the `index`-th connected service.
    pub fn service(&self, index: usize) -> Arc<Mutex<ServiceLog>> {
        Arc::clone(&self.services.lock().unwrap()[index])
    }
}

/// A fast config for tests: real flag values, short bootstrap grace period.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.bootstrap_delay_ms = 5;
    config.server.service_private_key = "f8e188e8af0b8b414be59c4a1a15cc666c898fb34d94156e9b51e18bfde754a5".to_string();
    config
}
