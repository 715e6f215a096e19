use causalchemy_core::GraphSpec;
use causalchemy_generate::{CausalModel, Distribution, FunctionalGenerator, generate};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).init();

    let graph = GraphSpec::from_matrix(
        &["smoking", "genes", "cancer"],
        &[
            vec![0.0, 0.0, 0.8],
            vec![0.0, 0.0, 0.4],
            vec![0.0, 0.0, 0.0],
        ],
    )?;

    let model = CausalModel::new(graph)
        .with_generator("smoking", Distribution::bernoulli(0.3)?)?
        .with_generator("genes", Distribution::normal(0.0, 1.0)?)?
        .with_generator(
            "cancer",
            FunctionalGenerator::linear([("smoking", 0.8), ("genes", 0.4)], 0.0)?
                .noise(Distribution::normal(0.0, 0.2)?)?,
        )?;

    let table = generate(&model, 10, 42)?;
    println!("{}", serde_json::to_string_pretty(&table)?);
    Ok(())
}
