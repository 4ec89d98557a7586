//! # Daily Bugle
//!
//! Fetches a news article (or takes pasted text), extracts the readable
//! content and asks an LLM for a 60-word editorial summary. Summaries can be
//! saved to a local archive.
//!
//! ```text
//! api → summarize → extract (strategy chain → parser) → llm
//!     → archive / preferences → storage
//! ```

pub mod api;
pub mod archive;
pub mod config;
pub mod error;
pub mod extract;
pub mod llm;
pub mod preferences;
pub mod storage;
pub mod summarize;

use std::sync::{Arc, Mutex, MutexGuard};

use config::Config;
use archive::ArchiveStore;
use error::{AppError, Result};
use extract::{ExtractionChain, HtmlParser};
use llm::TextGenerator;
use preferences::Preferences;
use storage::{FileStore, KeyValueStore};
use summarize::Summarizer;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub chain: Arc<ExtractionChain>,
    pub store: Arc<dyn KeyValueStore>,
    pub archive: Arc<Mutex<ArchiveStore>>,
    pub preferences: Arc<Mutex<Preferences>>,
    /// Held for the duration of a summarization; only one runs at a time.
    pub in_flight: Arc<tokio::sync::Mutex<()>>,
    /// Used instead of the configured provider when set.
    pub generator: Option<Arc<dyn TextGenerator>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| AppError::StorageError("state lock poisoned".into()))
}

impl AppState {
    /// Opens the file store under the configured data directory and builds the extraction chain.
    pub fn new(config: Config) -> Result<Self> {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&config.data_dir)?);
        let parser = Arc::new(HtmlParser::new(config.rules.clone())?);
        let chain = ExtractionChain::from_kinds(&config.strategies, parser, config.fetch_timeout);
        Self::with_parts(config, store, chain)
    }

    pub fn with_parts(config: Config, store: Arc<dyn KeyValueStore>, chain: ExtractionChain) -> Result<Self> {
        let archive = ArchiveStore::open(store.clone())?;
        let mut preferences = Preferences::load(store.as_ref())?;
        if preferences.api_key.is_none() {
            preferences.api_key = config.api_key.clone();
        }

        Ok(Self {
            config: Arc::new(config),
            chain: Arc::new(chain),
            store,
            archive: Arc::new(Mutex::new(archive)),
            preferences: Arc::new(Mutex::new(preferences)),
            in_flight: Arc::new(tokio::sync::Mutex::new(())),
            generator: None,
        })
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn archive(&self) -> Result<MutexGuard<'_, ArchiveStore>> {
        lock(&self.archive)
    }

    pub fn preferences(&self) -> Result<MutexGuard<'_, Preferences>> {
        lock(&self.preferences)
    }

    /// Applies `change` to the preferences and persists them.
    pub fn update_preferences<R>(&self, change: impl FnOnce(&mut Preferences) -> Result<R>) -> Result<R> {
        let mut preferences = self.preferences()?;
        let mut updated = preferences.clone();
        let result = change(&mut updated)?;
        updated.save(self.store.as_ref())?;
        *preferences = updated;
        Ok(result)
    }

    /// A summarizer for the current API key.
    pub fn summarizer(&self) -> Result<Summarizer> {
        if let Some(generator) = &self.generator {
            return Ok(Summarizer::new(self.chain.clone(), generator.clone()));
        }
        let api_key = self.preferences()?.api_key.clone();
        Summarizer::with_api_key(self.chain.clone(), &self.config.llm, api_key.as_deref())
    }
}
