// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::ServiceConfig;

/// Medical Classifier CLI
#[derive(Parser, Debug)]
#[command(name = "medical-classifier-cli")]
#[command(version)]
#[command(about = "CLI tools for the chest X-ray classifier service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify a single image with the local model
    Classify(commands::ClassifyArgs),

    /// Upload a small text file to the bucket and print its URL
    UploadTest(commands::UploadTestArgs),

    /// Check email/password credentials
    Login(commands::LoginArgs),

    /// Download the model weights from the bucket
    FetchModel(commands::FetchModelArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let settings = ServiceConfig::load()?;

    match cli.command {
        Commands::Classify(args) => commands::classify(&settings, args).await,
        Commands::UploadTest(args) => commands::upload_test(&settings, args).await,
        Commands::Login(args) => commands::login(&settings, args).await,
        Commands::FetchModel(args) => commands::fetch_model(&settings, args).await,
    }
}
