//! A form instance: the parameters of one job configuration and the references between them.

mod graph;

use hashbrown::HashMap;

use crate::param::{
    Parameter, ParameterName,
    config::{ConfigError, FormConfig, ParameterConfig},
};

pub use graph::{
    DanglingReference, ParameterReferenceRegistrator, ReferenceGraph, ReferenceRegistrator,
};

/// Immutable set of [Parameter]s, in display order, indexed by name.
#[derive(Debug)]
pub struct Form {
    parameters: Vec<Parameter>,
    index: HashMap<ParameterName, usize>,
    graph: ReferenceGraph,
}

impl Form {
    pub fn new(parameters: Vec<Parameter>) -> Result<Self, ConfigError> {
        let mut index = HashMap::with_capacity(parameters.len());
        let mut reg = ReferenceRegistrator::new();

        for (position, parameter) in parameters.iter().enumerate() {
            if index.insert(parameter.name().clone(), position).is_some() {
                return Err(ConfigError::DuplicateName(parameter.name().clone()));
            }
            let mut param_reg = reg.for_parameter(parameter.name());
            for upstream in parameter.referenced_parameters() {
                param_reg.add_reference(upstream);
            }
        }

        Ok(Self {
            parameters,
            index,
            graph: reg.build(),
        })
    }

    pub fn from_config(config: FormConfig) -> Result<Self, ConfigError> {
        Self::new(
            config
                .parameters
                .into_iter()
                .map(Parameter::try_from)
                .collect::<Result<Vec<_>, _>>()?,
        )
    }

    /// Configuration to persist for the form.
    pub fn to_config(&self) -> FormConfig {
        FormConfig {
            parameters: self.parameters.iter().map(ParameterConfig::from).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.index
            .get(name)
            .and_then(|position| self.parameters.get(*position))
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn graph(&self) -> &ReferenceGraph {
        &self.graph
    }
}
