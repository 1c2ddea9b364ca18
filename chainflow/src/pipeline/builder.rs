//! Pipeline builder with validation.

use super::{ErrorHandler, FlowConfig, Pipeline, Redirect};
use crate::errors::{ContractErrorInfo, FlowError, PipelineValidationError};
use crate::stages::{FnStage, Next, Stage};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Builder for creating validated pipelines.
pub struct PipelineBuilder {
    /// The pipeline name.
    name: String,
    /// Stages in execution order.
    stages: Vec<Arc<dyn Stage>>,
    /// Optional error handler.
    error_handler: Option<ErrorHandler>,
    /// Execution configuration.
    config: FlowConfig,
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            error_handler: None,
            config: FlowConfig::default(),
        }
    }

    /// Appends a stage.
    #[must_use]
    pub fn stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Appends a named closure stage.
    #[must_use]
    pub fn stage_fn<F, R>(self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Value) -> Result<R, FlowError> + Send + Sync + 'static,
        R: Into<Next> + 'static,
    {
        self.stage(Arc::new(FnStage::new(name, func)))
    }

    /// Appends a closure stage named after its position.
    #[must_use]
    pub fn then<F, R>(self, func: F) -> Self
    where
        F: Fn(Value) -> Result<R, FlowError> + Send + Sync + 'static,
        R: Into<Next> + 'static,
    {
        let name = format!("stage-{}", self.stages.len() + 1);
        self.stage_fn(name, func)
    }

    /// Sets the error handler.
    ///
    /// The handler sees every stage failure and may recover by returning a
    /// redirect; returning `None` lets the failure become final.
    #[must_use]
    pub fn error_handler<H>(mut self, handler: H) -> Self
    where
        H: Fn(&FlowError) -> Option<Redirect> + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Sets the execution configuration.
    #[must_use]
    pub fn config(mut self, config: FlowConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipeline or one of its stages is unnamed, or
    /// if two stages share a name.
    pub fn build(self) -> Result<Pipeline, PipelineValidationError> {
        if self.name.trim().is_empty() {
            return Err(unnamed("Pipeline name must not be empty", Vec::new()));
        }

        let mut seen = HashSet::new();
        for (index, stage) in self.stages.iter().enumerate() {
            let stage_name = stage.name();
            if stage_name.trim().is_empty() {
                return Err(unnamed(
                    format!("Stage at position {} of '{}' has no name", index, self.name),
                    vec![index.to_string()],
                ));
            }
            if !seen.insert(stage_name.to_string()) {
                return Err(PipelineValidationError::new(format!(
                    "Duplicate stage '{}' in pipeline '{}'",
                    stage_name, self.name
                ))
                .with_stages(vec![stage_name.to_string()])
                .with_error_info(
                    ContractErrorInfo::suggested(
                        "CONTRACT-001-DUPLICATE",
                        format!("Stage '{stage_name}' appears more than once"),
                    )
                    .with_context_entry("pipeline", self.name.clone()),
                ));
            }
        }

        Ok(Pipeline::from_parts(
            self.name,
            self.stages,
            self.error_handler,
            self.config,
        ))
    }
}

fn unnamed(message: impl Into<String>, stages: Vec<String>) -> PipelineValidationError {
    PipelineValidationError::new(message)
        .with_stages(stages)
        .with_error_info(
            ContractErrorInfo::suggested("CONTRACT-002-UNNAMED", "Missing name"),
        )
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("name", &self.name)
            .field("stages", &self.stages)
            .field("has_error_handler", &self.error_handler.is_some())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ContractSuggestions;
    use crate::stages::IdentityStage;
    use serde_json::json;

    fn identity(name: &str) -> Arc<dyn Stage> {
        Arc::new(IdentityStage::new(name))
    }

    #[test]
    fn test_builder_creation() {
        let builder = PipelineBuilder::new("test");
        assert_eq!(builder.name(), "test");
        assert_eq!(builder.stage_count(), 0);
    }

    #[test]
    fn test_builder_adds_stages_in_order() {
        let pipeline = PipelineBuilder::new("test")
            .stage(identity("first"))
            .then(|v| Ok(v))
            .stage_fn("last", |v| Ok(v))
            .build()
            .unwrap();

        assert_eq!(pipeline.stage_names(), vec!["first", "stage-2", "last"]);
    }

    #[test]
    fn test_empty_pipeline_is_valid() {
        let pipeline = PipelineBuilder::new("empty").build().unwrap();
        assert_eq!(pipeline.stage_count(), 0);
    }

    #[test]
    fn test_duplicate_stage_rejected() {
        let err = PipelineBuilder::new("dup")
            .stage(identity("same"))
            .stage(identity("same"))
            .build()
            .unwrap_err();

        let info = err.error_info.unwrap();
        assert_eq!(err.stages, vec!["same".to_string()]);
        assert_eq!(info.code, "CONTRACT-001-DUPLICATE");
        assert_eq!(
            info.fix_hint.as_deref(),
            ContractSuggestions::get("CONTRACT-001-DUPLICATE")
        );
        assert_eq!(info.context.get("pipeline").map(String::as_str), Some("dup"));
    }

    #[test]
    fn test_unnamed_stage_rejected() {
        let err = PipelineBuilder::new("p")
            .stage_fn("", |_v| Ok(json!(1)))
            .build()
            .unwrap_err();

        let info = err.error_info.unwrap();
        assert_eq!(info.code, "CONTRACT-002-UNNAMED");
        assert!(info.fix_hint.is_some());
    }

    #[test]
    fn test_unnamed_pipeline_rejected() {
        assert!(PipelineBuilder::new("  ").build().is_err());
    }

    #[test]
    fn test_error_handler_and_config_are_kept() {
        let pipeline = PipelineBuilder::new("handled")
            .error_handler(|_e| None)
            .config(FlowConfig::new().with_loop_limit(7))
            .build()
            .unwrap();

        assert!(pipeline.has_error_handler());
        assert_eq!(pipeline.config().loop_limit, 7);
    }
}
