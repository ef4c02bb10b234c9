//! Color-mode preference
//!
//! Tracks the user's light/dark/system choice, persists it through a
//! [`PreferenceStore`] and resolves "system" through a [`SystemAppearance`]
//! provider. Independent of form state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// Requested color mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    Light,
    Dark,
    #[default]
    System,
}

impl ColorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorMode {
    type Err = ThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "system" => Ok(Self::System),
            other => Err(ThemeError::InvalidMode(other.to_string())),
        }
    }
}

/// Effective appearance after resolving "system"
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Appearance {
    Light,
    Dark,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("unknown color mode '{0}'")]
    InvalidMode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persists the chosen color mode
pub trait PreferenceStore: Send + Sync {
    fn load(&self) -> Result<Option<ColorMode>, ThemeError>;
    fn save(&self, mode: ColorMode) -> Result<(), ThemeError>;
}

/// Reports the operating system's current preference
pub trait SystemAppearance: Send + Sync {
    fn prefers_dark(&self) -> bool;
}

/// Receives the effective appearance whenever it may have changed
pub type ThemeListener = Arc<dyn Fn(Appearance) + Send + Sync>;

/// In-memory store, mainly for tests
#[derive(Debug, Default)]
pub struct InMemoryPreferenceStore {
    mode: RwLock<Option<ColorMode>>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: ColorMode) -> Self {
        Self {
            mode: RwLock::new(Some(mode)),
        }
    }
}

impl PreferenceStore for InMemoryPreferenceStore {
    fn load(&self) -> Result<Option<ColorMode>, ThemeError> {
        Ok(*read(&self.mode))
    }

    fn save(&self, mode: ColorMode) -> Result<(), ThemeError> {
        *write(&self.mode) = Some(mode);
        Ok(())
    }
}

/// Stores the mode as a single word in a text file
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&self) -> Result<Option<ColorMode>, ThemeError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => content.parse().map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, mode: ColorMode) -> Result<(), ThemeError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, mode.as_str())?;
        Ok(())
    }
}

/// System preference that only changes when told to
#[derive(Debug, Default)]
pub struct FixedAppearance {
    dark: AtomicBool,
}

impl FixedAppearance {
    pub fn new(dark: bool) -> Self {
        Self {
            dark: AtomicBool::new(dark),
        }
    }

    pub fn set_dark(&self, dark: bool) {
        self.dark.store(dark, Ordering::SeqCst);
    }
}

impl SystemAppearance for FixedAppearance {
    fn prefers_dark(&self) -> bool {
        self.dark.load(Ordering::SeqCst)
    }
}

/// Color-mode state shared by the application
pub struct ThemeService {
    store: Arc<dyn PreferenceStore>,
    system: Arc<dyn SystemAppearance>,
    mode: RwLock<ColorMode>,
    listeners: RwLock<HashMap<u64, ThemeListener>>,
    next_listener: AtomicU64,
}

impl fmt::Debug for ThemeService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThemeService")
            .field("mode", &*read(&self.mode))
            .field("listeners", &read(&self.listeners).len())
            .finish()
    }
}

impl ThemeService {
    pub fn new(store: Arc<dyn PreferenceStore>, system: Arc<dyn SystemAppearance>) -> Self {
        Self {
            store,
            system,
            mode: RwLock::new(ColorMode::System),
            listeners: RwLock::new(HashMap::new()),
            next_listener: AtomicU64::new(0),
        }
    }

    /// Load the persisted mode (if any) and apply it
    pub fn init(&self) -> Result<Appearance, ThemeError> {
        if let Some(stored) = self.store.load()? {
            *write(&self.mode) = stored;
        }
        let appearance = self.appearance();
        tracing::debug!(mode = %self.mode(), ?appearance, "theme initialised");
        self.notify(appearance);
        Ok(appearance)
    }

    pub fn mode(&self) -> ColorMode {
        *read(&self.mode)
    }

    /// Persist and apply a new mode
    pub fn set_mode(&self, mode: ColorMode) -> Result<Appearance, ThemeError> {
        self.store.save(mode)?;
        *write(&self.mode) = mode;
        let appearance = self.appearance();
        tracing::debug!(%mode, ?appearance, "theme changed");
        self.notify(appearance);
        Ok(appearance)
    }

    pub fn appearance(&self) -> Appearance {
        match self.mode() {
            ColorMode::Light => Appearance::Light,
            ColorMode::Dark => Appearance::Dark,
            ColorMode::System if self.system.prefers_dark() => Appearance::Dark,
            ColorMode::System => Appearance::Light,
        }
    }

    /// Register a listener; returns an id for [`ThemeService::unsubscribe`]
    pub fn subscribe(&self, listener: impl Fn(Appearance) + Send + Sync + 'static) -> u64 {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        write(&self.listeners).insert(id, Arc::new(listener));
        id
    }

    pub fn unsubscribe(&self, id: u64) -> bool {
        write(&self.listeners).remove(&id).is_some()
    }

    /// The system preference changed; only matters while following the system
    pub fn system_changed(&self) -> Option<Appearance> {
        if self.mode() != ColorMode::System {
            return None;
        }
        let appearance = self.appearance();
        self.notify(appearance);
        Some(appearance)
    }

    fn notify(&self, appearance: Appearance) {
        // Clone out so listeners may call back into the service
        let listeners: Vec<ThemeListener> = read(&self.listeners).values().cloned().collect();
        for listener in listeners {
            listener(appearance);
        }
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
