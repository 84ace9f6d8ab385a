use std::sync::{Arc, OnceLock};

use crate::capability::{Capability, Generation};
use crate::error::Result;
use crate::model::ModelClass;

/// One finalized class per generation, built on first request.
///
/// Concurrent first requests may both run the builder; the first stored class
/// wins and every caller receives it.
pub struct ClassCache {
    slots: [OnceLock<Arc<ModelClass>>; 2],
}

impl ClassCache {
    pub const fn new() -> Self {
        Self {
            slots: [OnceLock::new(), OnceLock::new()],
        }
    }

    pub fn get_or_build<F>(&self, capability: Capability, build: F) -> Result<Arc<ModelClass>>
    where
        F: FnOnce(Capability) -> Result<Arc<ModelClass>>,
    {
        let slot = &self.slots[capability.generation().index()];
        if let Some(class) = slot.get() {
            return Ok(Arc::clone(class));
        }
        let built = build(capability)?;
        Ok(Arc::clone(slot.get_or_init(|| built)))
    }

    pub fn get(&self, generation: Generation) -> Option<Arc<ModelClass>> {
        self.slots[generation.index()].get().cloned()
    }
}

impl Default for ClassCache {
    fn default() -> Self {
        Self::new()
    }
}
