use std::collections::{BTreeMap, HashSet};

use ethers::abi::Token;
use ethers::types::Address;

use crate::error::{DeployError, StepId};

/// A single constructor input of a deployment step.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstructorArg {
    /// An address deployed outside of this plan, recorded under `role`.
    External { role: String, address: Address },
    /// The address of an earlier step, by step name.
    Reference(String),
    Literal(Token),
}

impl ConstructorArg {
    pub fn external(role: impl ToString, address: Address) -> Self {
        Self::External {
            role: role.to_string(),
            address,
        }
    }

    pub fn reference(step: impl ToString) -> Self {
        Self::Reference(step.to_string())
    }
}

/// A view function queried on a deployed contract, recorded under `role`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryQuery {
    pub role: String,
    pub function: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentStep {
    pub name: String,
    pub artifact: String,
    pub constructor_args: Vec<ConstructorArg>,
    pub secondary: Vec<SecondaryQuery>,
}

impl DeploymentStep {
    /// A step deploying the artifact of the same name.
    pub fn new(name: impl ToString) -> Self {
        let name = name.to_string();

        Self {
            artifact: name.clone(),
            name,
            constructor_args: vec![],
            secondary: vec![],
        }
    }

    pub fn with_constructor_arg(mut self, arg: ConstructorArg) -> Self {
        self.constructor_args.push(arg);
        self
    }

    pub fn with_secondary(
        mut self,
        role: impl ToString,
        function: impl ToString,
    ) -> Self {
        self.secondary.push(SecondaryQuery {
            role: role.to_string(),
            function: function.to_string(),
        });
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeploymentPlan {
    steps: Vec<DeploymentStep>,
}

impl DeploymentPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step(mut self, step: DeploymentStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(&self) -> &[DeploymentStep] {
        &self.steps
    }

    /// External addresses keyed by role.
    pub fn externals(&self) -> Result<BTreeMap<String, Address>, DeployError> {
        let mut externals = BTreeMap::new();

        for step in &self.steps {
            for arg in &step.constructor_args {
                let ConstructorArg::External { role, address } = arg else {
                    continue;
                };

                match externals.get(role) {
                    Some(existing) if existing != address => {
                        return Err(DeployError::DuplicateName {
                            name: role.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        externals.insert(role.clone(), *address);
                    }
                }
            }
        }

        Ok(externals)
    }

    /// Checks that every reference points at a strictly earlier step and that
    /// every recorded name is unique.
    pub fn validate(&self) -> Result<(), DeployError> {
        let externals = self.externals()?;

        let mut names: HashSet<&str> =
            externals.keys().map(String::as_str).collect();
        let mut completed = HashSet::new();

        for (index, step) in self.steps.iter().enumerate() {
            for arg in &step.constructor_args {
                if let ConstructorArg::Reference(reference) = arg {
                    if !completed.contains(reference.as_str()) {
                        return Err(DeployError::UnresolvedReference {
                            step: StepId::new(index, &step.name),
                            reference: reference.clone(),
                        });
                    }
                }
            }

            let recorded = std::iter::once(step.name.as_str())
                .chain(step.secondary.iter().map(|query| query.role.as_str()));

            for name in recorded {
                if !names.insert(name) {
                    return Err(DeployError::DuplicateName {
                        name: name.to_string(),
                    });
                }
            }

            completed.insert(step.name.as_str());
        }

        Ok(())
    }
}
