//! Shared state injected into every chat handler.

use std::sync::Arc;

use medley_config::{ChatConfig, SecurityConfig};
use medley_security::{PasswordHasher, SecurityError};

use crate::engine::ChatEngine;
use crate::hub::SseHub;

pub struct ChatState {
    pub engine: Arc<ChatEngine>,
    pub hub: Arc<SseHub>,
    pub config: ChatConfig,
}

impl ChatState {
    pub fn new(config: ChatConfig, security: &SecurityConfig) -> Result<Self, SecurityError> {
        let hasher = PasswordHasher::new(security.argon2_memory_kib, security.argon2_iterations)?;
        Ok(Self::with_hasher(config, hasher))
    }

    pub fn with_hasher(config: ChatConfig, hasher: PasswordHasher) -> Self {
        Self {
            engine: Arc::new(ChatEngine::new(config.clone(), hasher)),
            hub: Arc::new(SseHub::new(config.queue_capacity)),
            config,
        }
    }
}

pub type SharedState = Arc<ChatState>;
