//! Instruction prompt resources.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use strum::{Display, EnumIter, IntoEnumIterator};

use crate::error::{IntakeError, Result};

/// Every instruction set the core needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum PromptName {
    ManagerAgent,
    ExtractorAgent,
    DiagnosticAgent,
    GuardrailAgent,
    DataExtractor,
    Diagnosis,
}

impl PromptName {
    pub fn file_name(self) -> String {
        format!("{self}_prompt.txt")
    }
}

/// Anything that can resolve a prompt by name.
pub trait PromptSource: Send + Sync {
    fn load(&self, name: PromptName) -> Result<String>;
}

/// Loads prompt files from a directory, caching each after the first read.
#[derive(Debug)]
pub struct PromptLoader {
    dir: PathBuf,
    cache: RwLock<HashMap<PromptName, String>>,
}

impl PromptLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read every known prompt, failing on the first one that is missing.
    pub fn preload(&self) -> Result<()> {
        for name in PromptName::iter() {
            self.load(name)?;
        }
        Ok(())
    }
}

impl PromptSource for PromptLoader {
    fn load(&self, name: PromptName) -> Result<String> {
        if let Some(body) = self.cache.read().ok().and_then(|c| c.get(&name).cloned()) {
            return Ok(body);
        }

        let path = self.dir.join(name.file_name());
        let body = fs::read_to_string(&path).map_err(|e| {
            IntakeError::Initialization(format!(
                "Error loading prompt '{}' from '{}': {e}",
                name.file_name(),
                self.dir.display()
            ))
        })?;

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(name, body.clone());
        }
        Ok(body)
    }
}

/// Fixed prompt bodies held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPrompts {
    prompts: HashMap<PromptName, String>,
}

impl InMemoryPrompts {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source where every prompt is `"<name> instructions"`.
    pub fn placeholder() -> Self {
        PromptName::iter().fold(Self::new(), |prompts, name| {
            prompts.with(name, format!("{name} instructions"))
        })
    }

    pub fn with(mut self, name: PromptName, body: impl Into<String>) -> Self {
        self.prompts.insert(name, body.into());
        self
    }

    pub fn without(mut self, name: PromptName) -> Self {
        self.prompts.remove(&name);
        self
    }
}

impl PromptSource for InMemoryPrompts {
    fn load(&self, name: PromptName) -> Result<String> {
        self.prompts
            .get(&name)
            .cloned()
            .ok_or_else(|| IntakeError::Initialization(format!("Prompt '{name}' is not registered")))
    }
}
