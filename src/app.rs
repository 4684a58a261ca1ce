//! The application: every stack, their ordering, and synthesis.

use crate::assembly::{Assembly, TemplateFormat};
use crate::context::{ContextStore, MissingContext};
use crate::error::{Error, Result};
use crate::graph::DependencyGraph;
use crate::parameters::Parameters;
use crate::stacks::{
    CodePipelineStack, DevEnvironmentStack, ImagePipelineStack, Stack, StackBuilder, StorageStack,
    WorkstationStack,
};
use indexmap::IndexMap;
use tracing::{debug, info};

/// Options for [`App::synth`]
#[derive(Debug, Clone, Default)]
pub struct SynthOptions {
    /// Stack names or glob patterns; empty selects every stack
    pub patterns: Vec<String>,
    pub format: TemplateFormat,
    /// Synthesize even when context lookups are missing
    pub allow_missing_context: bool,
}

/// A set of stacks with declared ordering
#[derive(Debug, Clone, Default)]
pub struct App {
    stacks: IndexMap<String, Stack>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the five workstation stacks from parameters
    pub fn from_parameters(parameters: &Parameters, context: &ContextStore) -> Result<Self> {
        let environment = parameters.environment();
        let mut app = Self::new();

        let storage = StorageStack::new(parameters).build(&environment, context)?;
        let storage_name = storage.name().to_string();
        app.add_stack(storage)?;

        let mut image_pipeline = ImagePipelineStack::new(parameters).build(&environment, context)?;
        // Components are read from the bucket at build time
        image_pipeline.add_dependency(&storage_name);
        app.add_stack(image_pipeline)?;

        let builders: [&dyn StackBuilder; 3] = [
            &CodePipelineStack::new(parameters),
            &DevEnvironmentStack::new(parameters),
            &WorkstationStack::new(parameters),
        ];
        for builder in builders {
            app.add_stack(builder.build(&environment, context)?)?;
        }

        info!(stacks = app.stacks.len(), environment = %environment, "Declared application");
        Ok(app)
    }

    /// Add a fully declared stack; names must be unique
    pub fn add_stack(&mut self, stack: Stack) -> Result<()> {
        if self.stacks.contains_key(stack.name()) {
            return Err(Error::invalid_id(stack.name(), "duplicate stack name"));
        }
        debug!(stack = %stack.name(), "Added stack");
        self.stacks.insert(stack.name().to_string(), stack);
        Ok(())
    }

    pub fn stack(&self, name: &str) -> Result<&Stack> {
        self.stacks
            .get(name)
            .ok_or_else(|| Error::StackNotFound(name.to_string()))
    }

    /// Stacks in declaration order
    pub fn stacks(&self) -> impl Iterator<Item = &Stack> {
        self.stacks.values()
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    /// Graph of stack dependencies; unknown dependency names are errors
    pub fn dependency_graph(&self) -> Result<DependencyGraph> {
        let mut graph = DependencyGraph::new();
        for name in self.stacks.keys() {
            graph.add_node(name);
        }
        for stack in self.stacks.values() {
            for dependency in stack.dependencies() {
                graph.add_dependency(stack.name(), dependency)?;
            }
        }
        Ok(graph)
    }

    /// Every stack in deployment order
    pub fn deploy_order(&self) -> Result<Vec<&Stack>> {
        self.dependency_graph()?
            .order()?
            .iter()
            .map(|name| self.stack(name))
            .collect()
    }

    /// Stacks matching any pattern, plus their dependencies, in deployment order
    pub fn select(&self, patterns: &[String]) -> Result<Vec<&Stack>> {
        let order = self.deploy_order()?;
        if patterns.is_empty() {
            return Ok(order);
        }

        let graph = self.dependency_graph()?;
        let mut selected: Vec<String> = Vec::new();
        for pattern in patterns {
            let matcher = glob::Pattern::new(pattern)
                .map_err(|e| Error::invalid_id(pattern.as_str(), e.to_string()))?;
            let matches: Vec<&String> = self
                .stacks
                .keys()
                .filter(|name| matcher.matches(name))
                .collect();
            if matches.is_empty() {
                return Err(Error::StackNotFound(pattern.clone()));
            }
            for name in matches {
                for dependency in graph.dependencies(name) {
                    if !selected.contains(&dependency) {
                        selected.push(dependency);
                    }
                }
                if !selected.contains(name) {
                    selected.push(name.clone());
                }
            }
        }

        Ok(order
            .into_iter()
            .filter(|stack| selected.iter().any(|s| s == stack.name()))
            .collect())
    }

    /// Lookups missing across the selected stacks
    pub fn missing_context(&self, stacks: &[&Stack]) -> Vec<MissingContext> {
        let mut missing: Vec<MissingContext> = Vec::new();
        for stack in stacks {
            for entry in stack.missing_context() {
                if !missing.iter().any(|m| m.key == entry.key) {
                    missing.push(entry.clone());
                }
            }
        }
        missing
    }

    /// Render the selected stacks into an assembly
    pub fn synth(&self, options: &SynthOptions) -> Result<Assembly> {
        let stacks = self.select(&options.patterns)?;
        let missing = self.missing_context(&stacks);
        if !missing.is_empty() && !options.allow_missing_context {
            return Err(Error::MissingContext {
                keys: missing.into_iter().map(|m| m.key).collect(),
            });
        }
        Assembly::render(&stacks, options.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stacks::Environment;
    use crate::testing::sample_parameters;

    fn empty_stack(name: &str, dependencies: &[&str]) -> Stack {
        let mut stack = Stack::new(name, Environment::new("123456789012", "us-east-1")).unwrap();
        for d in dependencies {
            stack.add_dependency(d);
        }
        stack
    }

    #[test]
    fn test_from_parameters_declares_five_stacks() {
        let params = sample_parameters();
        let app = App::from_parameters(&params, &ContextStore::new()).unwrap();
        let names: Vec<&str> = app.deploy_order().unwrap().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "s3ops",
                "development-environment-jdoe-image-builder-pipeline",
                "development-environment-jdoe-deployment-pipeline",
                "development-environment-jdoe-VPC",
                "development-environment-jdoe-workstation",
            ]
        );
    }

    #[test]
    fn test_select_includes_dependencies() {
        let params = sample_parameters();
        let app = App::from_parameters(&params, &ContextStore::new()).unwrap();
        let selected = app.select(&["*image-builder*".to_string()]).unwrap();
        let names: Vec<&str> = selected.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec!["s3ops", "development-environment-jdoe-image-builder-pipeline"]
        );

        assert!(matches!(
            app.select(&["nothing-*".to_string()]),
            Err(Error::StackNotFound(_))
        ));
    }

    #[test]
    fn test_synth_refuses_missing_context() {
        let params = sample_parameters();
        let app = App::from_parameters(&params, &ContextStore::new()).unwrap();
        let err = app.synth(&SynthOptions::default()).unwrap_err();
        assert!(matches!(err, Error::MissingContext { ref keys } if keys.len() == 2));

        // Stacks without lookups synthesize fine
        let assembly = app
            .synth(&SynthOptions {
                patterns: vec!["s3ops".to_string()],
                ..Default::default()
            })
            .unwrap();
        assert_eq!(assembly.manifest().artifacts.len(), 1);

        let assembly = app
            .synth(&SynthOptions {
                allow_missing_context: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(assembly.manifest().missing.len(), 2);
    }

    #[test]
    fn test_cycle_between_stacks() {
        let mut app = App::new();
        app.add_stack(empty_stack("a", &["b"])).unwrap();
        app.add_stack(empty_stack("b", &["a"])).unwrap();
        assert!(matches!(app.deploy_order(), Err(Error::DependencyCycle(_))));
    }

    #[test]
    fn test_unknown_dependency() {
        let mut app = App::new();
        app.add_stack(empty_stack("a", &["ghost"])).unwrap();
        assert!(matches!(app.deploy_order(), Err(Error::StackNotFound(ref n)) if n == "ghost"));
    }

    #[test]
    fn test_duplicate_stack_name() {
        let mut app = App::new();
        app.add_stack(empty_stack("a", &[])).unwrap();
        assert!(app.add_stack(empty_stack("a", &[])).is_err());
    }
}
