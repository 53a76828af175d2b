//! Stage registry for managing stage implementations.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::stage::{Stage, StageId};

/// Maps each [`StageId`] to the implementation that runs it.
#[derive(Default)]
pub struct StageRegistry {
    stages: HashMap<StageId, Arc<dyn Stage>>,
}

impl StageRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            stages: HashMap::new(),
        }
    }

    /// Register a stage under its `id()`, replacing any previous one.
    pub fn register(&mut self, stage: Arc<dyn Stage>) {
        let id = stage.id();
        debug!("Registering stage: {}", id);
        self.stages.insert(id, stage);
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.register(stage);
        self
    }

    pub fn get(&self, id: StageId) -> Option<Arc<dyn Stage>> {
        self.stages.get(&id).cloned()
    }

    /// Get a stage, returning an error if it was never registered.
    pub fn get_required(&self, id: StageId) -> CoreResult<Arc<dyn Stage>> {
        self.get(id).ok_or(CoreError::StageNotFound(id))
    }

    pub fn contains(&self, id: StageId) -> bool {
        self.stages.contains_key(&id)
    }

    /// Stages from [`StageId::all`] that have no implementation.
    pub fn missing(&self) -> Vec<StageId> {
        StageId::all()
            .into_iter()
            .filter(|id| !self.contains(*id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl std::fmt::Debug for StageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageRegistry")
            .field("stages", &self.stages.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StageError;
    use crate::state::PipelineState;
    use async_trait::async_trait;

    struct NoopStage(StageId);

    #[async_trait]
    impl Stage for NoopStage {
        fn id(&self) -> StageId {
            self.0
        }

        async fn execute(&self, _state: &mut PipelineState) -> Result<(), StageError> {
            Ok(())
        }
    }

    #[test]
    fn test_registry_register_and_get() {
        let mut registry = StageRegistry::new();
        assert!(registry.is_empty());

        registry.register(Arc::new(NoopStage(StageId::Planner)));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(StageId::Planner));
        assert_eq!(registry.get(StageId::Planner).unwrap().id(), StageId::Planner);
        assert!(registry.get(StageId::Coder).is_none());
    }

    #[test]
    fn test_registry_missing_stages() {
        let registry = StageRegistry::new().with_stage(Arc::new(NoopStage(StageId::Coder)));
        assert_eq!(registry.missing(), vec![StageId::Planner, StageId::Architect]);
        assert!(matches!(
            registry.get_required(StageId::Planner),
            Err(CoreError::StageNotFound(StageId::Planner))
        ));
    }
}
