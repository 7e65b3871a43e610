//! Registration of references between the parameters of a form.

use std::collections::VecDeque;

use hashbrown::{HashMap, HashSet};

use crate::param::ParameterName;

/// A declared reference to a parameter that is not in the form.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DanglingReference {
    pub parameter: ParameterName,
    pub missing: ParameterName,
}

/// Registers the references of every parameter in a form.
#[derive(Default)]
pub struct ReferenceRegistrator {
    order: Vec<ParameterName>,
    references: HashMap<ParameterName, Vec<ParameterName>>,
}

impl ReferenceRegistrator {
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns a [ParameterReferenceRegistrator] for registering the references of `parameter`.
    /// Parameters must be registered in form order.
    pub fn for_parameter<'a>(
        &'a mut self,
        parameter: &'a ParameterName,
    ) -> ParameterReferenceRegistrator<'a> {
        if !self.references.contains_key(parameter) {
            self.order.push(parameter.clone());
            self.references.insert(parameter.clone(), Vec::new());
        }
        ParameterReferenceRegistrator {
            parameter,
            reg: self,
        }
    }

    /// Consumes the [ReferenceRegistrator], resolving the registered references against the
    /// registered parameters.
    pub fn build(self) -> ReferenceGraph {
        let mut dependents: HashMap<ParameterName, Vec<ParameterName>> = HashMap::new();
        let mut dangling = Vec::new();

        for downstream in &self.order {
            let Some(upstreams) = self.references.get(downstream) else {
                continue;
            };
            for upstream in upstreams {
                if !self.references.contains_key(upstream) {
                    log::warn!(
                        "Parameter {downstream:?} references {upstream:?}, which is not in the \
                         form."
                    );
                    dangling.push(DanglingReference {
                        parameter: downstream.clone(),
                        missing: upstream.clone(),
                    });
                    continue;
                }
                dependents
                    .entry_ref(upstream)
                    .or_default()
                    .push(downstream.clone());
            }
        }

        ReferenceGraph {
            references: self.references,
            dependents,
            dangling,
        }
    }
}

/// Registers the references of a single parameter.
pub struct ParameterReferenceRegistrator<'a> {
    parameter: &'a ParameterName,
    reg: &'a mut ReferenceRegistrator,
}

impl ParameterReferenceRegistrator<'_> {
    /// Declares that the parameter given to [ReferenceRegistrator::for_parameter] reads the value
    /// of `upstream`. Self references and repeats are ignored.
    pub fn add_reference(&mut self, upstream: &ParameterName) {
        if upstream == self.parameter {
            log::debug!("Ignoring self reference of parameter {upstream:?}.");
            return;
        }
        let references = self.reg.references.entry_ref(self.parameter).or_default();
        if !references.contains(upstream) {
            references.push(upstream.clone());
        }
    }
}

/// Directed references between the parameters of a single form. Immutable once built.
#[derive(Debug, Default)]
pub struct ReferenceGraph {
    /// Declared references, in declared order, without self references.
    references: HashMap<ParameterName, Vec<ParameterName>>,
    /// Map from a parameter to the parameters that reference it, in form order. Only contains
    /// parameters in the form.
    dependents: HashMap<ParameterName, Vec<ParameterName>>,
    dangling: Vec<DanglingReference>,
}

impl ReferenceGraph {
    /// Direct upstream references of `parameter`, as declared. Includes names that are not in
    /// the form.
    pub fn references_of(&self, parameter: &str) -> &[ParameterName] {
        self.references
            .get(parameter)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Parameters that directly reference `parameter`.
    pub fn dependents_of(&self, parameter: &str) -> &[ParameterName] {
        self.dependents
            .get(parameter)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn dangling(&self) -> &[DanglingReference] {
        &self.dangling
    }

    /// Every parameter transitively dependent on `origin`, in breadth first order. Each appears
    /// at most once, and `origin` itself never does, even when it is part of a cycle.
    pub fn cascade_from(&self, origin: &str) -> Vec<ParameterName> {
        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(origin);
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(origin);
        let mut order = Vec::new();

        while let Some(current) = queue.pop_front() {
            for dependent in self.dependents_of(current) {
                if visited.insert(dependent.as_ref()) {
                    order.push(dependent.clone());
                    queue.push_back(dependent.as_ref());
                } else {
                    log::debug!(
                        "Not re-evaluating {dependent:?} via {current:?}, already in this cascade."
                    );
                }
            }
        }

        order
    }
}
