//! Running a parameter's scripts through an injected [ScriptCapability].


use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use crate::{
    choices::{self, ChoiceSet, ScalarResult, ShapeError},
    metrics::{EvaluationRecord, EvaluationSink, NoopSink, ScriptStage},
    param::{ParameterName, ScriptPair, SecureScript},
};

/// Default upper bound on a single script run.
pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(5);

/// Values of a parameter's referenced parameters, as visible to its scripts. Entries are in
/// the parameter's declared reference order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ScriptBinding {
    entries: Vec<(ParameterName, String)>,
}

impl ScriptBinding {
    pub fn new() -> Self {
        Default::default()
    }

    /// Binds `name` to `value`, replacing any existing binding of `name`.
    pub fn insert(&mut self, name: ParameterName, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.as_ref() == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParameterName, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name, value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(ParameterName, String)> for ScriptBinding {
    fn from_iter<T: IntoIterator<Item = (ParameterName, String)>>(iter: T) -> Self {
        let mut binding = Self::new();
        for (name, value) in iter {
            binding.insert(name, value);
        }
        binding
    }
}

/// Failure reported by a [ScriptCapability].
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// The host's approval rules do not allow the script to run.
    #[error("script was rejected: {reason}")]
    Rejected { reason: String },
    #[error("script did not complete within {limit:?}")]
    Timeout { limit: Duration },
    #[error("script failed: {message}")]
    Failed { message: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// External capability that runs scripts. This is also responsible for deciding whether a
/// script may run at all.
pub trait ScriptCapability {
    /// Runs `script` with every entry of `binding` visible as a variable of the same name, and
    /// returns the script's result.
    ///
    /// Implementations should abandon the run once `timeout` has elapsed and report
    /// [ScriptError::Timeout].
    fn execute(
        &self,
        script: &SecureScript,
        binding: &ScriptBinding,
        timeout: Duration,
    ) -> Result<serde_json::Value, ScriptError>;
}

/// Both scripts of a parameter failed. Script details are logged, not carried here.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("evaluation of parameter {parameter:?} failed")]
pub struct EvaluationFailed {
    pub parameter: ParameterName,
}

#[derive(Debug, thiserror::Error)]
enum StageError {
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error("unrecognised script result: {0}")]
    Shape(#[from] ShapeError),
}

/// Runs a parameter's primary script, falling back to its fallback script when the primary
/// fails, and normalises the result.
pub struct ScriptExecutor {
    capability: Arc<dyn ScriptCapability + Send + Sync>,
    sink: Arc<dyn EvaluationSink + Send + Sync>,
    timeout: Duration,
}

impl ScriptExecutor {
    pub fn new(capability: Arc<dyn ScriptCapability + Send + Sync>) -> Self {
        Self {
            capability,
            sink: Arc::new(NoopSink),
            timeout: DEFAULT_SCRIPT_TIMEOUT,
        }
    }

    /// Records every script run in `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn EvaluationSink + Send + Sync>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Evaluates `scripts` for the named parameter.
    ///
    /// Failures of the primary script, including results that cannot be normalised, are logged
    /// and recovered by running the fallback script with the same binding. A blank fallback
    /// script is not run.
    pub fn execute(
        &self,
        parameter: &ParameterName,
        scripts: &ScriptPair,
        binding: &ScriptBinding,
        scalar: ScalarResult,
    ) -> Result<ChoiceSet, EvaluationFailed> {
        let primary_err = match self.run_stage(
            parameter,
            ScriptStage::Primary,
            &scripts.primary,
            binding,
            scalar,
        ) {
            Ok(choices) => return Ok(choices),
            Err(err) => err,
        };
        log::warn!(
            "Script for parameter {parameter:?} failed, using fallback script: {primary_err}"
        );

        if scripts.fallback.is_blank() {
            log::error!("Parameter {parameter:?} has no fallback script, evaluation failed.");
            return Err(EvaluationFailed {
                parameter: parameter.clone(),
            });
        }

        self.run_stage(
            parameter,
            ScriptStage::Fallback,
            &scripts.fallback,
            binding,
            scalar,
        )
        .map_err(|err| {
            log::error!("Fallback script for parameter {parameter:?} failed: {err}");
            EvaluationFailed {
                parameter: parameter.clone(),
            }
        })
    }

    fn run_stage(
        &self,
        parameter: &ParameterName,
        stage: ScriptStage,
        script: &SecureScript,
        binding: &ScriptBinding,
        scalar: ScalarResult,
    ) -> Result<ChoiceSet, StageError> {
        let start = Instant::now();
        let result = self
            .capability
            .execute(script, binding, self.timeout)
            .and_then(|value| {
                // Capabilities that cannot interrupt a run still must not have it count.
                if start.elapsed() > self.timeout {
                    Err(ScriptError::Timeout {
                        limit: self.timeout,
                    })
                } else {
                    Ok(value)
                }
            })
            .map_err(StageError::from)
            .and_then(|value| Ok(choices::normalize(&value, scalar)?));

        self.sink.record(&EvaluationRecord {
            parameter,
            stage,
            elapsed: start.elapsed(),
            succeeded: result.is_ok(),
        });

        result
    }
}
