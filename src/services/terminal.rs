//! Emulator terminal: the PTY the `flow emulator` process runs in.
//!
//! The session only ever needs three operations — send a command line, bring
//! the terminal to front, dispose it — so that is the whole trait. The
//! bundled implementation spawns the user's shell in a portable-pty pair;
//! hosts with their own terminal surface implement [`EmulatorTerminal`] over
//! it instead.

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// The three operations the session core uses on its terminal.
pub trait EmulatorTerminal: Send {
    /// Send a command line to the shell (a newline is appended).
    fn send_text(&mut self, text: &str);

    /// Bring the terminal to front in the host UI.
    fn show(&mut self);

    /// Kill the shell and release the PTY. The terminal is unusable
    /// afterwards; `stop` replaces it with a fresh one from the factory.
    fn dispose(&mut self);
}

/// Builds replacement terminals bound to the same context, so `stop` can
/// dispose the emulator's terminal and hand the session a fresh one.
pub trait TerminalFactory: Send {
    fn create(&self) -> Box<dyn EmulatorTerminal>;
}

/// Factory for [`PtyTerminal`]s rooted at an optional working directory.
#[derive(Debug, Clone, Default)]
pub struct PtyTerminalFactory {
    cwd: Option<PathBuf>,
}

impl PtyTerminalFactory {
    pub fn new(cwd: Option<PathBuf>) -> Self {
        Self { cwd }
    }
}

impl TerminalFactory for PtyTerminalFactory {
    fn create(&self) -> Box<dyn EmulatorTerminal> {
        Box::new(PtyTerminal::new(self.cwd.clone()))
    }
}

/// Shell session in a portable-pty pair. The PTY is opened lazily on first
/// use: construction never fails, matching how hosts hand out terminal
/// objects before anything runs in them.
pub struct PtyTerminal {
    cwd: Option<PathBuf>,
    inner: Option<PtyInner>,
}

struct PtyInner {
    writer: Box<dyn Write + Send>,
    child: Box<dyn Child + Send + Sync>,
    // Held so the PTY stays open for the lifetime of the session
    _master: Box<dyn MasterPty + Send>,
    alive: Arc<AtomicBool>,
}

impl PtyTerminal {
    pub fn new(cwd: Option<PathBuf>) -> Self {
        Self { cwd, inner: None }
    }

    fn ensure_spawned(&mut self) -> Option<&mut PtyInner> {
        if self.inner.is_none() {
            match spawn_shell(self.cwd.as_deref()) {
                Ok(inner) => self.inner = Some(inner),
                Err(e) => {
                    tracing::error!("Failed to open emulator terminal: {:#}", e);
                    return None;
                }
            }
        }
        self.inner.as_mut()
    }
}

impl EmulatorTerminal for PtyTerminal {
    fn send_text(&mut self, text: &str) {
        let Some(inner) = self.ensure_spawned() else {
            return;
        };
        tracing::debug!("Terminal input: {}", text);
        if let Err(e) = inner
            .writer
            .write_all(text.as_bytes())
            .and_then(|_| inner.writer.write_all(b"\r"))
            .and_then(|_| inner.writer.flush())
        {
            tracing::error!("Failed to write to emulator terminal: {}", e);
        }
    }

    fn show(&mut self) {
        // The library has no window of its own; spawning is the observable
        // effect and hosts embedding a real surface override this.
        self.ensure_spawned();
    }

    fn dispose(&mut self) {
        if let Some(mut inner) = self.inner.take() {
            inner.alive.store(false, Ordering::Relaxed);
            if let Err(e) = inner.child.kill() {
                tracing::debug!("Terminal child already exited: {}", e);
            }
            let _ = inner.child.wait();
            tracing::info!("Emulator terminal disposed");
        }
    }
}

impl Drop for PtyTerminal {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn spawn_shell(cwd: Option<&std::path::Path>) -> anyhow::Result<PtyInner> {
    let pty_system = native_pty_system();
    let pair = pty_system
        .openpty(PtySize {
            rows: 24,
            cols: 80,
            pixel_width: 0,
            pixel_height: 0,
        })
        .map_err(|e| anyhow::anyhow!("failed to open PTY: {}", e))?;

    let shell = detect_shell();
    tracing::info!("Spawning emulator terminal with shell: {}", shell);

    let mut cmd = CommandBuilder::new(&shell);
    if let Some(dir) = cwd {
        cmd.cwd(dir);
    }

    let child = pair
        .slave
        .spawn_command(cmd)
        .map_err(|e| anyhow::anyhow!("failed to spawn shell: {}", e))?;
    drop(pair.slave);

    let writer = pair
        .master
        .take_writer()
        .map_err(|e| anyhow::anyhow!("failed to take PTY writer: {}", e))?;
    let mut reader = pair
        .master
        .try_clone_reader()
        .map_err(|e| anyhow::anyhow!("failed to clone PTY reader: {}", e))?;

    // Drain the PTY so the shell never blocks on a full output buffer. The
    // host renders the emulator's output; this library only logs it.
    let alive = Arc::new(AtomicBool::new(true));
    let read_alive = Arc::clone(&alive);
    thread::spawn(move || {
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if !read_alive.load(Ordering::Relaxed) {
                        break;
                    }
                    tracing::trace!("Terminal output: {} bytes", n);
                }
                Err(_) => break,
            }
        }
    });

    Ok(PtyInner {
        writer,
        child,
        _master: pair.master,
        alive,
    })
}

fn detect_shell() -> String {
    #[cfg(windows)]
    {
        std::env::var("COMSPEC").unwrap_or_else(|_| "cmd.exe".to_string())
    }
    #[cfg(not(windows))]
    {
        std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
    }
}
