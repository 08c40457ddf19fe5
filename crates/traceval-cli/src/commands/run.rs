//! Dataset evaluation command

use std::sync::Arc;

use traceval_core::{
    ApiClient, BatchOptions, BatchResults, EvaluationTarget, OpenAiModel, TracevalResult,
};

use crate::args::RunArgs;

pub async fn handle(client: &ApiClient, args: RunArgs) -> TracevalResult<()> {
    let model = Arc::new(OpenAiModel::new(
        args.model_url.clone(),
        args.model_api_key.clone(),
        args.model.clone(),
    )?);
    let target = if args.completion {
        EvaluationTarget::completion(model)
    } else {
        EvaluationTarget::chat(model)
    };

    let mut options = BatchOptions::new()
        .with_repetitions(args.repetitions)
        .with_concurrency(args.concurrency)
        .with_verbose(args.verbose);
    if let Some(session) = args.session.clone() {
        options = options.with_session_name(session);
    }

    let results = if args.sequential {
        client.run_on_dataset(&args.dataset, &target, &options).await?
    } else {
        client
            .run_on_dataset_concurrent(&args.dataset, &target, &options)
            .await?
    };

    print_summary(&args.dataset, &results);

    if let Some(path) = args.output {
        let json = serde_json::to_string_pretty(&results)?;
        tokio::fs::write(&path, json).await?;
        println!("wrote results to {}", path.display());
    }
    Ok(())
}

fn print_summary(dataset: &str, results: &BatchResults) {
    let repetitions: usize = results.values().map(Vec::len).sum();
    let failures: usize = results
        .values()
        .flat_map(|outcomes| outcomes.iter())
        .filter(|outcome| outcome.is_failure())
        .count();
    println!(
        "{dataset}: {} examples, {repetitions} repetitions, {failures} failed",
        results.len()
    );
}
