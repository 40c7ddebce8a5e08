// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use std::error::Error;

use azure_durabletask_cosmos::DocumentStore;
use clap::Args;

/// Create the database and collection if they do not exist.
#[derive(Clone, Args)]
pub struct ProvisionCommand {
    /// The partition key path of the collection.
    #[arg(long, default_value = "/id")]
    partition_key_path: String,

    /// Stored procedures to register, as `id=path/to/body.js`.
    #[arg(long = "procedure")]
    procedures: Vec<String>,
}

impl ProvisionCommand {
    pub async fn run(self, store: DocumentStore) -> Result<(), Box<dyn Error>> {
        store.create_database_if_missing(None).await?;
        let collection = store
            .create_collection_if_missing(&self.partition_key_path, None)
            .await?;
        println!(
            "collection '{}' is partitioned on {:?}",
            collection.id, collection.partition_key.paths
        );

        for procedure in self.procedures {
            let (id, path) = procedure
                .split_once('=')
                .ok_or("procedures must be given as id=path")?;
            let body = std::fs::read_to_string(path)?;
            store.upsert_stored_procedure(id, body, None).await?;
            println!("registered stored procedure '{id}'");
        }
        Ok(())
    }
}
