// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use std::{error::Error, sync::Arc};

use azure_durabletask_cosmos::{ConnectionDescriptor, ConnectionRegistry, DocumentStore};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod documents;
mod provision;

/// A sample CLI over the durable task document store.
#[derive(Parser)]
struct ProgramArgs {
    /// The Cosmos DB endpoint to connect to.
    #[arg(long, env = "AZURE_COSMOS_ENDPOINT")]
    endpoint: String,

    /// The account key to sign requests with.
    #[arg(long, short, env = "AZURE_COSMOS_KEY")]
    key: String,

    /// The database holding the task hub.
    #[arg(long, default_value = "durabletask")]
    database: String,

    /// The collection to operate on.
    #[arg(long, default_value = "instances")]
    collection: String,

    /// Regions to serve reads from, in order of preference.
    #[arg(long = "location")]
    locations: Vec<String>,

    #[command(subcommand)]
    subcommand: Subcommands,
}

#[derive(Subcommand)]
enum Subcommands {
    Provision(provision::ProvisionCommand),
    Documents(documents::DocumentsCommand),
}

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = ProgramArgs::parse();
    let descriptor =
        ConnectionDescriptor::builder(args.endpoint, args.key, args.database, args.collection)
            .preferred_locations(args.locations)
            .build()?;
    let store = DocumentStore::new(descriptor, Arc::new(ConnectionRegistry::gateway()));

    match args.subcommand {
        Subcommands::Provision(cmd) => cmd.run(store).await,
        Subcommands::Documents(cmd) => cmd.run(store).await,
    }
}
