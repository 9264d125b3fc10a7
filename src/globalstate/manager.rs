//! Global State Manager
//!
//! Manages persistent state across restarts. On a graceful shutdown the
//! global scope persists `version` and `timestamp` records plus whatever the
//! registered providers contribute; on startup, prior state is handed back
//! to the providers before the engine accepts traffic.
//!
//! Startup fails closed: a prior state file that exists but cannot be
//! written to aborts startup before any provider is touched, so restart
//! continuity is never silently lost.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::lifecycle::Lifecycle;

use super::escape::{unicode_escape, unicode_unescape};
use super::state::{GlobalStateProvider, ScopedState, GLOBAL_SCOPE};

/// Owns the provider registry and the state files for one engine instance
pub struct GlobalStateManager {
    location: PathBuf,
    providers: Mutex<Vec<Arc<dyn GlobalStateProvider>>>,
    started: AtomicBool,
}

impl GlobalStateManager {
    /// Manage state files under the given persistent location
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            providers: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    /// Register a provider contributing to (and restoring from) global state
    pub fn register_state_provider(&self, provider: Arc<dyn GlobalStateProvider>) {
        self.providers.lock().push(provider);
    }

    /// Whether startup completed
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Restore prior state (or create a clean slate) and mark the manager
    /// started.
    pub fn start(&self) -> Result<()> {
        let state_file = self.state_file(GLOBAL_SCOPE);
        match self.read_scoped_state(GLOBAL_SCOPE)? {
            Some(state) => {
                // We proceed only if we can write the file back at shutdown
                self.ensure_writable(&state_file)?;
                info!(
                    version = state.property("version").unwrap_or("unknown"),
                    timestamp = state.property("timestamp").unwrap_or("unknown"),
                    "restoring persisted global state"
                );
                for provider in self.providers.lock().iter() {
                    provider.prepare_for_restore(&state)?;
                }
            }
            None => {
                // Clean slate: create an empty state file before proceeding
                if let Some(parent) = state_file.parent() {
                    fs::create_dir_all(parent).map_err(|err| {
                        self.state_error(&state_file, format!("cannot create state directory: {}", err))
                    })?;
                }
                fs::File::create(&state_file).map_err(|err| {
                    self.state_error(&state_file, format!("cannot create state file: {}", err))
                })?;
                debug!(path = %state_file.display(), "clean start, created empty state file");
            }
        }
        self.started.store(true, Ordering::Release);
        Ok(())
    }

    /// Persist global state and mark the manager stopped
    pub fn stop(&self) -> Result<()> {
        let result = self.write_global_state();
        self.started.store(false, Ordering::Release);
        result
    }

    /// Persist the global scope: engine version, timestamp and provider
    /// contributions.
    pub fn write_global_state(&self) -> Result<()> {
        let mut state = ScopedState::new(GLOBAL_SCOPE);
        state.set_property("version", env!("CARGO_PKG_VERSION"));
        state.set_property("timestamp", chrono::Utc::now().to_rfc3339());
        for provider in self.providers.lock().iter() {
            provider.prepare_for_persist(&mut state);
        }
        self.write_scoped_state(&state)?;
        info!(
            version = state.property("version").unwrap_or("unknown"),
            timestamp = state.property("timestamp").unwrap_or("unknown"),
            "persisted global state"
        );
        Ok(())
    }

    /// Write one scope's records as escaped `key=value` lines
    pub fn write_scoped_state(&self, state: &ScopedState) -> Result<()> {
        let state_file = self.state_file(state.scope());
        let mut content = String::new();
        for (key, value) in state.iter() {
            content.push_str(&unicode_escape(key));
            content.push('=');
            content.push_str(&unicode_escape(value));
            content.push('\n');
        }
        fs::write(&state_file, content)
            .map_err(|err| self.state_error(&state_file, format!("cannot write state: {}", err)))
    }

    /// Read one scope's records; `None` means no prior state (clean start)
    pub fn read_scoped_state(&self, scope: &str) -> Result<Option<ScopedState>> {
        let state_file = self.state_file(scope);
        if !state_file.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&state_file)
            .map_err(|err| self.state_error(&state_file, format!("cannot read state: {}", err)))?;
        let mut state = ScopedState::new(scope);
        for line in content.lines() {
            // Skip comment lines
            if line.starts_with('#') {
                continue;
            }
            let Some(separator) = find_unescaped_separator(line) else {
                continue;
            };
            let key = unicode_unescape(line[..separator].trim())
                .map_err(|err| self.state_error(&state_file, err.to_string()))?;
            let value = unicode_unescape(line[separator + 1..].trim())
                .map_err(|err| self.state_error(&state_file, err.to_string()))?;
            state.set_property(key, value);
        }
        Ok(Some(state))
    }

    fn state_file(&self, scope: &str) -> PathBuf {
        self.location.join(format!("{}.state", scope))
    }

    fn ensure_writable(&self, state_file: &Path) -> Result<()> {
        let metadata = fs::metadata(state_file).map_err(|err| {
            self.state_error(state_file, format!("cannot inspect state file: {}", err))
        })?;
        if metadata.permissions().readonly() {
            return Err(self.state_error(
                state_file,
                "state file exists but is not writable".to_string(),
            ));
        }
        OpenOptions::new()
            .write(true)
            .open(state_file)
            .map(|_| ())
            .map_err(|err| {
                self.state_error(
                    state_file,
                    format!("state file exists but is not writable: {}", err),
                )
            })
    }

    fn state_error(&self, state_file: &Path, reason: String) -> Error {
        Error::PersistentState {
            path: state_file.to_path_buf(),
            reason,
        }
    }
}

/// First `=` preceded by an even run of backslashes; a leading `=` never
/// separates
fn find_unescaped_separator(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    for idx in 1..bytes.len() {
        if bytes[idx] != b'=' {
            continue;
        }
        let mut backslashes = 0;
        while backslashes < idx && bytes[idx - 1 - backslashes] == b'\\' {
            backslashes += 1;
        }
        if backslashes % 2 == 0 {
            return Some(idx);
        }
    }
    None
}

#[async_trait]
impl Lifecycle for GlobalStateManager {
    fn name(&self) -> &'static str {
        "global-state"
    }

    // Must start before everything else
    fn priority(&self) -> i32 {
        1
    }

    fn is_ready(&self) -> bool {
        self.is_started()
    }

    async fn start(&self) -> Result<()> {
        GlobalStateManager::start(self)
    }

    async fn stop(&self) -> Result<()> {
        GlobalStateManager::stop(self)
    }
}
