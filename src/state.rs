use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::config::{env_bool, Config};
use crate::content::LessonCatalog;
use crate::services::llm_provider::LLMProvider;
use crate::store::DocumentStore;

#[derive(Debug)]
pub struct RuntimeConfig {
    pub practice_gen_enabled: AtomicBool,
    pub instruction_language_enabled: AtomicBool,
    pub llm_mock: AtomicBool,
}

impl RuntimeConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            practice_gen_enabled: AtomicBool::new(config.practice_gen_enabled),
            instruction_language_enabled: AtomicBool::new(config.instruction_language_enabled),
            llm_mock: AtomicBool::new(env_bool("LLM_MOCK").unwrap_or(false)),
        }
    }

    pub fn is_practice_gen_enabled(&self) -> bool {
        self.practice_gen_enabled.load(Ordering::Relaxed)
    }

    pub fn is_instruction_language_enabled(&self) -> bool {
        self.instruction_language_enabled.load(Ordering::Relaxed)
    }

    pub fn is_llm_mock(&self) -> bool {
        self.llm_mock.load(Ordering::Relaxed)
    }

    pub fn set_llm_mock(&self, enabled: bool) {
        self.llm_mock.store(enabled, Ordering::Relaxed);
    }
}

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    json_body_limit: usize,
    store: Arc<DocumentStore>,
    catalog: Arc<LessonCatalog>,
    llm: Arc<LLMProvider>,
    runtime: Arc<RuntimeConfig>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            json_body_limit: config.json_body_limit,
            store: Arc::new(DocumentStore::new()),
            catalog: Arc::new(LessonCatalog::from_env()),
            llm: Arc::new(LLMProvider::from_env()),
            runtime: Arc::new(RuntimeConfig::from_config(config)),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn json_body_limit(&self) -> usize {
        self.json_body_limit
    }

    pub fn store(&self) -> Arc<DocumentStore> {
        Arc::clone(&self.store)
    }

    pub fn catalog(&self) -> Arc<LessonCatalog> {
        Arc::clone(&self.catalog)
    }

    pub fn llm(&self) -> Arc<LLMProvider> {
        Arc::clone(&self.llm)
    }

    pub fn runtime(&self) -> Arc<RuntimeConfig> {
        Arc::clone(&self.runtime)
    }
}
