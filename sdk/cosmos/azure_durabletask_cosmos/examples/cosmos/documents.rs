// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use std::error::Error;

use azure_durabletask_cosmos::{
    models::ETag, DocumentStore, ErrorKind, PartitionKey, ProcedureParams, RetryPolicy,
};
use clap::{Args, Subcommand};
use serde_json::Value;

/// Operate on documents and stored procedures in the collection.
#[derive(Clone, Args)]
pub struct DocumentsCommand {
    #[command(subcommand)]
    subcommand: Subcommands,
}

#[derive(Clone, Subcommand)]
enum Subcommands {
    /// Create a document from JSON.
    Create {
        /// The document, as JSON.
        json: String,
    },
    /// Create or replace a document from JSON, retrying transient failures.
    Upsert {
        /// The document, as JSON.
        json: String,
    },
    /// Read a document.
    Read {
        id: String,

        /// The partition key value. Omit to look the document up across partitions.
        #[arg(long, short)]
        partition_key: Option<String>,
    },
    /// Replace a document, optionally only if it is still at the given version.
    Replace {
        id: String,

        /// The new document, as JSON.
        json: String,

        /// The ETag the stored document must still carry.
        #[arg(long)]
        if_match: Option<String>,
    },
    /// Delete a document.
    Delete {
        id: String,

        #[arg(long, short)]
        partition_key: String,
    },
    /// Execute a stored procedure with JSON parameters.
    Execute {
        procedure: String,

        #[arg(long, short)]
        partition_key: String,

        /// Parameters, as JSON values.
        params: Vec<String>,
    },
}

impl DocumentsCommand {
    pub async fn run(self, store: DocumentStore) -> Result<(), Box<dyn Error>> {
        match self.subcommand {
            Subcommands::Create { json } => {
                let document: Value = serde_json::from_str(&json)?;
                let response = store.create(&document, None).await?;
                print_response(response.item(), response.etag(), response.request_charge());
            }
            Subcommands::Upsert { json } => {
                let document: Value = serde_json::from_str(&json)?;
                let policy = RetryPolicy::for_descriptor(store.descriptor());
                let response = policy.execute(|| store.upsert(&document, None)).await?;
                print_response(response.item(), response.etag(), response.request_charge());
            }
            Subcommands::Read { id, partition_key } => {
                match store
                    .read::<Value>(&id, partition_key.map(PartitionKey::from), None)
                    .await
                {
                    Ok(response) => {
                        print_response(response.item(), response.etag(), response.request_charge())
                    }
                    Err(e) if e.kind() == &ErrorKind::NotFound => println!("document not found"),
                    Err(e) => return Err(e.into()),
                }
            }
            Subcommands::Replace { id, json, if_match } => {
                let document: Value = serde_json::from_str(&json)?;
                let expected = if_match.map(ETag::from);
                match store.replace(&id, &document, expected.as_ref(), None).await {
                    Ok(response) => {
                        print_response(response.item(), response.etag(), response.request_charge())
                    }
                    Err(e) if e.kind() == &ErrorKind::VersionConflict => {
                        println!("the document was modified by someone else")
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Subcommands::Delete { id, partition_key } => {
                store.delete(&id, partition_key, None).await?;
                println!("deleted");
            }
            Subcommands::Execute {
                procedure,
                partition_key,
                params,
            } => {
                let mut parameters = ProcedureParams::new();
                for param in params {
                    parameters.push(serde_json::from_str::<Value>(&param)?)?;
                }
                let result: Value = store
                    .execute_stored_procedure(&procedure, partition_key, parameters, None)
                    .await?;
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
        }
        Ok(())
    }
}

fn print_response(item: &Value, etag: Option<&ETag>, request_charge: f64) {
    if let Some(etag) = etag {
        println!("etag: {etag}");
    }
    println!("request charge: {request_charge} RU");
    match serde_json::to_string_pretty(item) {
        Ok(json) => println!("{json}"),
        Err(_) => println!("{item}"),
    }
}
