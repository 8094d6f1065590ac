//! Application state: the session store, prompts, completion settings and client.
//!
//! A session is the server-side state of one open form: the uploaded text, the last
//! generation inputs, the generated questions and the submitted reviews. Sessions live in
//! memory only. The store keeps at most `max_sessions` entries (MAX_SESSIONS, default 256);
//! opening one more evicts the oldest.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::{load_agent_config_from_env, CompletionSettings, Prompts};
use crate::domain::{GenerationRequest, QuestionRecord, ReviewSet};
use crate::openai::{CompletionClient, OpenAI};

#[derive(Clone, Debug)]
pub struct Session {
    pub id: String,
    pub file_name: String,
    pub text: String,
    pub last_request: Option<GenerationRequest>,
    pub questions: Vec<QuestionRecord>,
    pub reviews: ReviewSet,
    /// Insertion order within the store; assigned by `AppState::insert_session`.
    pub opened_seq: u64,
}

impl Session {
    pub fn new(file_name: String, text: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            file_name,
            text,
            last_request: None,
            questions: Vec::new(),
            reviews: ReviewSet::new(),
            opened_seq: 0,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<HashMap<String, Session>>>,
    pub completion: Option<Arc<dyn CompletionClient>>,
    pub settings: CompletionSettings,
    pub prompts: Prompts,
    pub max_sessions: usize,
    next_seq: Arc<AtomicU64>,
}

pub const DEFAULT_MAX_SESSIONS: usize = 256;

fn max_sessions_from_env() -> usize {
    match std::env::var("MAX_SESSIONS") {
        Ok(v) => match v.trim().parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                warn!(target: "mcqgen_backend", value = %v, "Ignoring invalid MAX_SESSIONS");
                DEFAULT_MAX_SESSIONS
            }
        },
        Err(_) => DEFAULT_MAX_SESSIONS,
    }
}

impl AppState {
    /// Build state from env: load TOML config, read completion settings, init the HTTP client.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_agent_config_from_env().unwrap_or_default();
        let settings = CompletionSettings::from_env(cfg.completion.clone());

        let completion: Option<Arc<dyn CompletionClient>> =
            match OpenAI::new(&settings.base_url, settings.timeout) {
                Ok(oa) => Some(Arc::new(oa)),
                Err(e) => {
                    error!(target: "mcqgen_backend", error = %e, "Failed to build HTTP client; generation disabled.");
                    None
                }
            };

        info!(
            target: "mcqgen_backend",
            base_url = %settings.base_url,
            model = %settings.model,
            has_api_key = settings.api_key.is_some(),
            timeout = ?settings.timeout,
            max_tokens = settings.tuning.max_tokens,
            temperature = settings.tuning.temperature,
            "Completion settings loaded."
        );

        let max_sessions = max_sessions_from_env();
        info!(target: "mcqgen_backend", max_sessions, "Session store ready.");
        Self::with_parts(settings, cfg.prompts, completion).with_max_sessions(max_sessions)
    }

    pub fn with_parts(
        settings: CompletionSettings,
        prompts: Prompts,
        completion: Option<Arc<dyn CompletionClient>>,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            completion,
            settings,
            prompts,
            max_sessions: DEFAULT_MAX_SESSIONS,
            next_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Cap the session store; values below 1 are treated as 1.
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    /// Insert a new session and return its id. Evicts the oldest sessions when the store is full.
    #[instrument(level = "debug", skip(self, s), fields(id = %s.id))]
    pub async fn insert_session(&self, mut s: Session) -> String {
        let id = s.id.clone();
        s.opened_seq = self.next_seq.fetch_add(1, Ordering::Relaxed);

        let mut sessions = self.sessions.write().await;
        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions
                .values()
                .min_by_key(|entry| entry.opened_seq)
                .map(|entry| entry.id.clone())
            else {
                break;
            };
            sessions.remove(&oldest);
            info!(target: "mcq", evicted = %oldest, max_sessions = self.max_sessions, "Session store full; dropped oldest session");
        }
        sessions.insert(id.clone(), s);
        id
    }

    /// Read-only snapshot of a session by id.
    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn get_session(&self, id: &str) -> Option<Session> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Apply `f` to the session under the write lock. Returns `None` for unknown ids.
    pub async fn update_session<T>(&self, id: &str, f: impl FnOnce(&mut Session) -> T) -> Option<T> {
        let mut sessions = self.sessions.write().await;
        sessions.get_mut(id).map(f)
    }
}
