//! Example inspection commands

use traceval_core::{ApiClient, TracevalResult};

use crate::args::ExampleAction;

pub async fn handle(client: &ApiClient, action: ExampleAction) -> TracevalResult<()> {
    match action {
        ExampleAction::List { dataset } => {
            let dataset = client.read_dataset(&dataset).await?;
            let examples = client.list_examples(dataset.id).await?;
            println!("{} examples in {}", examples.len(), dataset.name);
            for example in examples {
                let inputs = serde_json::to_string(&example.inputs)?;
                println!("{}  {}", example.id, inputs);
            }
            Ok(())
        }
    }
}
