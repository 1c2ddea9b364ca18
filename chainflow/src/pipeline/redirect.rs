//! Redirect signals.

use super::Pipeline;
use crate::stages::{ConstantStage, Stage};
use serde_json::Value;
use std::sync::Arc;

/// Which pipeline a redirect jumps to.
#[derive(Debug, Clone)]
pub enum RedirectTarget {
    /// The pipeline currently executing.
    Current,
    /// A specific pipeline.
    Pipeline(Pipeline),
}

/// Which value a redirect starts the target with.
#[derive(Debug, Clone, PartialEq)]
pub enum RedirectValue {
    /// Reuse the initial input of the current attempt.
    KeepInitial,
    /// Start with this value.
    Value(Value),
}

impl From<Option<Value>> for RedirectValue {
    fn from(value: Option<Value>) -> Self {
        value.map_or(Self::KeepInitial, Self::Value)
    }
}

/// Abandons the remaining stages of the running pipeline and continues in
/// `target` with `value` as its fresh initial input.
#[derive(Debug, Clone)]
pub struct Redirect {
    /// Where to continue.
    pub target: RedirectTarget,
    /// What to continue with.
    pub value: RedirectValue,
}

impl Redirect {
    /// Redirects to `pipeline` with an explicit value.
    #[must_use]
    pub fn to(pipeline: &Pipeline, value: impl Into<Value>) -> Self {
        Self {
            target: RedirectTarget::Pipeline(pipeline.clone()),
            value: RedirectValue::Value(value.into()),
        }
    }

    /// Redirects to `pipeline`, reusing the current initial value.
    #[must_use]
    pub fn to_keeping_input(pipeline: &Pipeline) -> Self {
        Self {
            target: RedirectTarget::Pipeline(pipeline.clone()),
            value: RedirectValue::KeepInitial,
        }
    }

    /// Restarts the current pipeline with its initial value.
    #[must_use]
    pub fn restart() -> Self {
        Self {
            target: RedirectTarget::Current,
            value: RedirectValue::KeepInitial,
        }
    }

    /// Restarts the current pipeline with a new value.
    #[must_use]
    pub fn restart_with(value: impl Into<Value>) -> Self {
        Self {
            target: RedirectTarget::Current,
            value: RedirectValue::Value(value.into()),
        }
    }

    /// Returns true if this redirect targets the running pipeline.
    #[must_use]
    pub fn is_restart(&self) -> bool {
        matches!(self.target, RedirectTarget::Current)
    }
}

/// Redirects to `pipeline`; `None` keeps the current initial value.
#[must_use]
pub fn redirect(pipeline: &Pipeline, value: Option<Value>) -> Redirect {
    Redirect {
        target: RedirectTarget::Pipeline(pipeline.clone()),
        value: value.into(),
    }
}

/// Restarts the running pipeline; `None` keeps the current initial value.
#[must_use]
pub fn restart(value: Option<Value>) -> Redirect {
    Redirect {
        target: RedirectTarget::Current,
        value: value.into(),
    }
}

/// Finishes the innermost pipeline successfully with `value`.
///
/// The returned redirect targets a fresh one-stage pipeline that ignores
/// its input and yields `value`.
#[must_use]
pub fn complete(value: impl Into<Value>) -> Redirect {
    let value = value.into();
    let stage: Arc<dyn Stage> = Arc::new(ConstantStage::new("complete", value.clone()));
    let finisher = Pipeline::from_parts("complete", vec![stage], None, Default::default());
    Redirect {
        target: RedirectTarget::Pipeline(finisher),
        value: RedirectValue::Value(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_restart_keeps_initial() {
        let r = restart(None);
        assert!(r.is_restart());
        assert_eq!(r.value, RedirectValue::KeepInitial);

        let r = Redirect::restart_with(3);
        assert_eq!(r.value, RedirectValue::Value(json!(3)));
    }

    #[test]
    fn test_redirect_to_pipeline() {
        let target = Pipeline::from_stages(Vec::new());
        let r = redirect(&target, Some(json!("x")));

        assert!(!r.is_restart());
        assert_eq!(r.value, RedirectValue::Value(json!("x")));
        assert_eq!(Redirect::to_keeping_input(&target).value, RedirectValue::KeepInitial);
    }

    #[test]
    fn test_complete_targets_constant_pipeline() {
        let r = complete(json!({"done": 1}));

        assert_eq!(r.value, RedirectValue::Value(json!({"done": 1})));
        match r.target {
            RedirectTarget::Pipeline(p) => {
                assert_eq!(p.name(), "complete");
                assert_eq!(p.stage_count(), 1);
            }
            RedirectTarget::Current => panic!("complete must not restart"),
        }
    }
}
