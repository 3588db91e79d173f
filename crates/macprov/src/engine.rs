//! Legacy engines: named implementations a cipher can be routed through

use std::collections::HashMap;
use std::sync::Arc;

use crate::cipher::CipherDescriptor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Engine {
    pub id: String,
    pub name: String,
    /// Canonical cipher names the engine implements. Empty means all.
    pub ciphers: Vec<String>,
}

impl Engine {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ciphers: Vec::new(),
        }
    }

    pub fn with_ciphers<I, S>(mut self, ciphers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ciphers = ciphers.into_iter().map(Into::into).collect();
        self
    }

    pub fn supports(&self, cipher: &CipherDescriptor) -> bool {
        self.ciphers.is_empty() || self.ciphers.iter().any(|c| cipher.answers_to(c))
    }
}

pub type EngineHandle = Arc<Engine>;

pub trait EngineRegistry: Send + Sync {
    fn by_id(&self, id: &str) -> Option<EngineHandle>;
}

/// Engines registered up front; lookups hand out shared handles.
#[derive(Debug, Default)]
pub struct DefaultEngineRegistry {
    engines: HashMap<String, EngineHandle>,
}

impl DefaultEngineRegistry {
    /// Registry holding only the `builtin` engine, which implements every cipher.
    pub fn new() -> Self {
        Self::default().with_engine(Engine::new("builtin", "Built-in software engine"))
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engines.insert(engine.id.clone(), Arc::new(engine));
        self
    }
}

impl EngineRegistry for DefaultEngineRegistry {
    fn by_id(&self, id: &str) -> Option<EngineHandle> {
        self.engines.get(id).cloned()
    }
}
