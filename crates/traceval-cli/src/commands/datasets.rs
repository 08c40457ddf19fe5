//! Dataset management commands

use traceval_core::{ApiClient, TracevalResult};

use crate::args::DatasetAction;

pub async fn handle(client: &ApiClient, action: DatasetAction) -> TracevalResult<()> {
    match action {
        DatasetAction::List { limit } => {
            let datasets = client.list_datasets(limit).await?;
            if datasets.is_empty() {
                println!("no datasets");
                return Ok(());
            }
            for dataset in datasets {
                println!(
                    "{}  {}  {}",
                    dataset.id,
                    dataset.name,
                    dataset.description.as_deref().unwrap_or("")
                );
            }
            Ok(())
        }
        DatasetAction::Create { name, description } => {
            let dataset = client.create_dataset(&name, &description).await?;
            println!("created dataset {} ({})", dataset.name, dataset.id);
            Ok(())
        }
        DatasetAction::Delete { name } => {
            let dataset = client.read_dataset(&name).await?;
            client.delete_dataset(dataset.id).await?;
            println!("deleted dataset {} ({})", name, dataset.id);
            Ok(())
        }
        DatasetAction::Upload {
            file,
            description,
            input_keys,
            output_keys,
        } => {
            let dataset = client
                .upload_csv(&file, &description, &input_keys, &output_keys)
                .await?;
            println!("uploaded dataset {} ({})", dataset.name, dataset.id);
            Ok(())
        }
    }
}
