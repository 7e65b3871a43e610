//! Helpers for tests of this crate and of crates that depend on it.

use std::{sync::Mutex, time::Duration};

use mockall::mock;
use serde_json::Value;

use crate::{
    param::{
        Parameter, ParameterName, SecureScript,
        config::{CascadeSpec, ChoiceSpec, ParameterConfig, ParameterSpec, ReferenceSpec},
    },
    script::{ScriptBinding, ScriptCapability, ScriptError},
};

pub fn name(s: &str) -> ParameterName {
    ParameterName::test_name(s)
}

fn build(name: &str, spec: ParameterSpec) -> Parameter {
    Parameter::try_from(ParameterConfig {
        name: name.into(),
        random_name: Some(format!("choice-parameter-{name}")),
        description: String::new(),
        spec,
    })
    .expect("invalid test parameter")
}

/// Single select [crate::param::Variant::Choice] parameter.
pub fn choice_param(name: &str, script: &str) -> Parameter {
    build(
        name,
        ParameterSpec::Choice(ChoiceSpec {
            script: SecureScript::new(script, true),
            ..Default::default()
        }),
    )
}

/// Single select [crate::param::Variant::Cascade] parameter referencing `references`
/// (comma separated).
pub fn cascade_param(name: &str, script: &str, references: &str) -> Parameter {
    cascade_param_with(name, script, "", references, "")
}

pub fn cascade_param_with(
    name: &str,
    script: &str,
    fallback: &str,
    references: &str,
    choice_type: &str,
) -> Parameter {
    build(
        name,
        ParameterSpec::Cascade(CascadeSpec {
            script: SecureScript::new(script, true),
            fallback_script: SecureScript::new(fallback, true),
            choice_type: choice_type.into(),
            referenced_parameters: references.into(),
            ..Default::default()
        }),
    )
}

/// [crate::param::Variant::Reference] parameter.
pub fn reference_param(
    name: &str,
    script: &str,
    references: &str,
    element_type: &str,
) -> Parameter {
    build(
        name,
        ParameterSpec::Reference(ReferenceSpec {
            script: SecureScript::new(script, true),
            choice_type: element_type.into(),
            referenced_parameters: references.into(),
            ..Default::default()
        }),
    )
}

/// A script run observed by [FakeCapability].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Call {
    pub script: String,
    /// `(name, value)` pairs, in binding order.
    pub binding: Vec<(String, String)>,
}

type Responder = Box<dyn Fn(&ScriptBinding) -> Result<Value, ScriptError> + Send + Sync>;

/// [ScriptCapability] that answers by script source, and records every call.
///
/// Scripts without a response fail.
#[derive(Default)]
pub struct FakeCapability {
    responders: hashbrown::HashMap<String, Responder>,
    calls: Mutex<Vec<Call>>,
}

impl FakeCapability {
    pub fn new() -> Self {
        Default::default()
    }

    /// `script` returns `value`.
    pub fn returning(self, script: &str, value: Value) -> Self {
        self.responding(script, move |_| Ok(value.clone()))
    }

    /// `script` fails.
    pub fn failing(self, script: &str) -> Self {
        let message = format!("{script} failed on purpose");
        self.responding(script, move |_| {
            Err(ScriptError::Failed {
                message: message.clone(),
            })
        })
    }

    /// `script` responds with `f`, which receives the binding.
    pub fn responding<F>(mut self, script: &str, f: F) -> Self
    where
        F: Fn(&ScriptBinding) -> Result<Value, ScriptError> + Send + Sync + 'static,
    {
        self.responders.insert(script.to_string(), Box::new(f));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .expect("failed to lock fake capability calls")
            .clone()
    }

    pub fn scripts_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.script).collect()
    }
}

impl ScriptCapability for FakeCapability {
    fn execute(
        &self,
        script: &SecureScript,
        binding: &ScriptBinding,
        _timeout: Duration,
    ) -> Result<Value, ScriptError> {
        self.calls
            .lock()
            .expect("failed to lock fake capability calls")
            .push(Call {
                script: script.script.clone(),
                binding: binding
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect(),
            });
        match self.responders.get(&script.script) {
            Some(responder) => responder(binding),
            None => Err(ScriptError::Failed {
                message: format!("no fake response for {:?}", script.script),
            }),
        }
    }
}

mock! {
    pub ScriptCapability {}

    impl ScriptCapability for ScriptCapability {
        fn execute(
            &self,
            script: &SecureScript,
            binding: &ScriptBinding,
            timeout: Duration,
        ) -> Result<Value, ScriptError>;
    }
}
