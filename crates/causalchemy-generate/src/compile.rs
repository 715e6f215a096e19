use std::collections::BTreeMap;

use causalchemy_core::Node;
use causalchemy_plan::{FunctionalConfig, GeneratorConfig, LinearWeights, Plan};

use crate::distributions::Distribution;
use crate::engine::{GenerationEngine, GenerationResult};
use crate::errors::GenerationError;
use crate::generators::{FunctionRegistry, FunctionalGenerator, NodeGenerator};
use crate::model::{CausalModel, GenerateOptions};
use crate::value::ValueKind;

/// A plan turned into a runnable model.
#[derive(Debug, Clone)]
pub struct CompiledPlan {
    pub model: CausalModel,
    pub options: GenerateOptions,
    pub rows: usize,
    pub seed: u64,
}

impl CompiledPlan {
    pub fn generate(&self) -> Result<GenerationResult, GenerationError> {
        GenerationEngine::new(self.options).generate_with_report(&self.model, self.rows, self.seed)
    }
}

/// Build a [`CausalModel`] from a plan. Named combine functions are looked
/// up in `functions`.
pub fn compile_plan(
    plan: &Plan,
    functions: &FunctionRegistry,
) -> Result<CompiledPlan, GenerationError> {
    let graph = plan.graph.to_graph_spec()?;
    let mut model = CausalModel::new(graph);

    for node_plan in &plan.nodes {
        let node = model
            .graph()
            .node(&node_plan.name)
            .ok_or_else(|| {
                GenerationError::malformed(format!(
                    "node '{}' is not declared in the graph",
                    node_plan.name
                ))
            })?
            .clone();
        if model.generator(&node.name).is_some() {
            return Err(GenerationError::invalid(format!(
                "node '{}' has more than one generator",
                node.name
            )));
        }

        let generator = compile_generator(&node, &node_plan.generator, functions)?;
        model.bind(&node.name, generator)?;
        if let Some(fillrate) = node_plan.fillrate {
            model.set_fillrate(&node.name, fillrate)?;
        }
    }

    if let Some(columns) = &plan.columns {
        model.set_columns(columns.clone())?;
    }
    model.ensure_bound()?;

    let rows = usize::try_from(plan.rows)
        .map_err(|_| GenerationError::invalid(format!("rows {} is too large", plan.rows)))?;

    Ok(CompiledPlan {
        model,
        options: GenerateOptions {
            tie_break: plan.tie_break(),
        },
        rows,
        seed: plan.seed,
    })
}

/// Cell kind of every node the plan binds. Functional nodes always yield
/// floats; independent nodes take the kind of their distribution. Nodes with
/// an invalid distribution are left out.
pub fn column_kinds(plan: &Plan) -> BTreeMap<String, ValueKind> {
    plan.nodes
        .iter()
        .filter_map(|node| {
            let kind = match &node.generator {
                GeneratorConfig::Independent { distribution } => {
                    Distribution::from_spec(distribution, &node.name)
                        .ok()?
                        .value_kind()
                }
                GeneratorConfig::Functional(_) => ValueKind::Float,
            };
            Some((node.name.clone(), kind))
        })
        .collect()
}

fn compile_generator(
    node: &Node,
    config: &GeneratorConfig,
    functions: &FunctionRegistry,
) -> Result<NodeGenerator, GenerationError> {
    match config {
        GeneratorConfig::Independent { distribution } => Ok(NodeGenerator::Independent(
            Distribution::from_spec(distribution, &node.name)?,
        )),
        GeneratorConfig::Functional(config) => {
            compile_functional(node, config, functions).map(NodeGenerator::Functional)
        }
    }
}

fn compile_functional(
    node: &Node,
    config: &FunctionalConfig,
    functions: &FunctionRegistry,
) -> Result<FunctionalGenerator, GenerationError> {
    let parents: Vec<&str> = node.parent_names().collect();

    let generator = match (&config.combine_fn, &config.linear_weights) {
        (Some(_), Some(_)) => {
            return Err(GenerationError::invalid(format!(
                "node '{}': linear_weights and combine_fn are mutually exclusive",
                node.name
            )));
        }
        (Some(name), None) => {
            if config.intercept.is_some() {
                return Err(GenerationError::invalid(format!(
                    "node '{}': intercept only applies to linear combinations",
                    node.name
                )));
            }
            let function = functions.get(name).ok_or_else(|| {
                GenerationError::invalid(format!(
                    "node '{}': unknown combine_fn '{name}'",
                    node.name
                ))
            })?;
            FunctionalGenerator::with_function(parents, name.clone(), function)
        }
        (None, weights) => {
            let weights = linear_weights(node, weights.as_ref())?;
            FunctionalGenerator::linear(weights, config.intercept.unwrap_or(0.0))
                .map_err(|err| with_node(&node.name, err))?
        }
    };

    let generator = match &config.noise {
        Some(noise) => generator
            .noise(Distribution::from_spec(noise, &format!("{} noise", node.name))?)
            .map_err(|err| with_node(&node.name, err))?,
        None => generator,
    };

    Ok(generator.noise_mode(config.noise_mode.unwrap_or_default()))
}

/// `(parent, coefficient)` pairs in parent order. Without explicit weights
/// each parent uses its edge weight, or 1.
fn linear_weights(
    node: &Node,
    weights: Option<&LinearWeights>,
) -> Result<Vec<(String, f64)>, GenerationError> {
    match weights {
        None => Ok(node
            .parents
            .iter()
            .map(|parent| (parent.name.clone(), parent.weight.unwrap_or(1.0)))
            .collect()),
        Some(LinearWeights::Ordered(values)) => {
            if values.len() != node.parents.len() {
                return Err(GenerationError::invalid(format!(
                    "node '{}' has {} parent(s) but {} weight(s)",
                    node.name,
                    node.parents.len(),
                    values.len()
                )));
            }
            Ok(node
                .parent_names()
                .map(str::to_string)
                .zip(values.iter().copied())
                .collect())
        }
        Some(LinearWeights::Named(values)) => {
            if let Some(extra) = values
                .keys()
                .find(|key| !node.parent_names().any(|parent| parent == key.as_str()))
            {
                return Err(GenerationError::invalid(format!(
                    "node '{}': '{extra}' is not a parent",
                    node.name
                )));
            }
            node.parent_names()
                .map(|parent| {
                    values
                        .get(parent)
                        .map(|weight| (parent.to_string(), *weight))
                        .ok_or_else(|| {
                            GenerationError::invalid(format!(
                                "node '{}': missing weight for parent '{parent}'",
                                node.name
                            ))
                        })
                })
                .collect()
        }
    }
}

fn with_node(node: &str, err: GenerationError) -> GenerationError {
    match err {
        GenerationError::InvalidParameter(message) => {
            GenerationError::InvalidParameter(format!("node '{node}': {message}"))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use causalchemy_plan::{
        DistributionSpec, GraphInput, NodeDeclaration, NodePlan, ParentDeclaration,
    };
    use serde_json::json;

    use super::*;

    fn plan(nodes: Vec<NodePlan>) -> Plan {
        Plan {
            plan_version: "0.1".to_string(),
            seed: 3,
            rows: 4,
            graph: GraphInput::Declarations {
                nodes: vec![
                    NodeDeclaration {
                        name: "x".to_string(),
                        parents: Vec::new(),
                    },
                    NodeDeclaration {
                        name: "y".to_string(),
                        parents: vec!["x".into()],
                    },
                ],
            },
            nodes,
            columns: None,
            options: None,
        }
    }

    fn root() -> NodePlan {
        NodePlan {
            name: "x".to_string(),
            generator: GeneratorConfig::Independent {
                distribution: DistributionSpec::new("uniform", None),
            },
            fillrate: None,
        }
    }

    fn functional(config: FunctionalConfig) -> NodePlan {
        NodePlan {
            name: "y".to_string(),
            generator: GeneratorConfig::Functional(config),
            fillrate: None,
        }
    }

    #[test]
    fn compiles_default_linear_node() {
        let compiled = compile_plan(
            &plan(vec![root(), functional(FunctionalConfig::default())]),
            &FunctionRegistry::new(),
        )
        .unwrap();
        assert_eq!(compiled.rows, 4);
        assert_eq!(compiled.seed, 3);
        let generator = compiled.model.generator("y").unwrap();
        assert_eq!(generator.label(), "functional.linear");
        assert_eq!(generator.parents(), ["x"]);
    }

    #[test]
    fn unknown_combine_fn_is_invalid() {
        let config = FunctionalConfig {
            combine_fn: Some("cube".to_string()),
            ..FunctionalConfig::default()
        };
        let err = compile_plan(&plan(vec![root(), functional(config)]), &FunctionRegistry::new())
            .unwrap_err();
        assert!(err.to_string().contains("unknown combine_fn 'cube'"));
    }

    #[test]
    fn negative_noise_scale_names_the_node() {
        let config = FunctionalConfig {
            noise: Some(DistributionSpec::new("normal", Some(json!({ "std": -1.0 })))),
            ..FunctionalConfig::default()
        };
        let err = compile_plan(&plan(vec![root(), functional(config)]), &FunctionRegistry::new())
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidParameter(_)));
        assert!(err.to_string().contains("y noise"));
    }

    #[test]
    fn missing_generator_is_malformed() {
        let err = compile_plan(&plan(vec![root()]), &FunctionRegistry::new()).unwrap_err();
        assert!(err.is_malformed_graph());
    }

    #[test]
    fn weighted_declaration_sets_default_coefficient() {
        let mut weighted = plan(vec![root(), functional(FunctionalConfig::default())]);
        weighted.graph = GraphInput::Declarations {
            nodes: vec![
                NodeDeclaration {
                    name: "x".to_string(),
                    parents: Vec::new(),
                },
                NodeDeclaration {
                    name: "y".to_string(),
                    parents: vec![ParentDeclaration::Weighted {
                        name: "x".to_string(),
                        weight: -2.5,
                    }],
                },
            ],
        };
        let compiled = compile_plan(&weighted, &FunctionRegistry::new()).unwrap();
        let table = compiled.generate().unwrap().table;
        let x = table.numeric_column("x").unwrap();
        let y = table.numeric_column("y").unwrap();
        for (x, y) in x.iter().zip(&y) {
            assert_eq!(*y, x.map(|x| -2.5 * x));
        }
    }

    #[test]
    fn column_kinds_come_from_generators() {
        let segment = NodePlan {
            name: "x".to_string(),
            generator: GeneratorConfig::Independent {
                distribution: DistributionSpec::new(
                    "categorical",
                    Some(json!({ "classes": ["1", "true"] })),
                ),
            },
            fillrate: None,
        };
        let kinds = column_kinds(&plan(vec![segment, functional(FunctionalConfig::default())]));
        assert_eq!(kinds.get("x"), Some(&ValueKind::Text));
        assert_eq!(kinds.get("y"), Some(&ValueKind::Float));
    }

    #[test]
    fn duplicate_node_plan_is_rejected() {
        let err = compile_plan(&plan(vec![root(), root()]), &FunctionRegistry::new()).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidParameter(_)));
    }
}
