//! Kraal CLI

use clap::{Parser, Subcommand};
use kraal::{
    auth::{
        AuthService,
        models::{AdminContext, RawAdminKey},
    },
    context::AppContext,
};

mod admin_key;
mod db;
mod item;
mod order;

#[derive(Debug, Parser)]
#[command(name = "kraal", about = "Kraal CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Db(db::DbCommand),
    AdminKey(admin_key::AdminKeyCommand),
    Item(item::ItemCommand),
    Order(order::OrderCommand),
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), String> {
        match self.command {
            Commands::Db(command) => db::run(command).await,
            Commands::AdminKey(command) => admin_key::run(command).await,
            Commands::Item(command) => item::run(command).await,
            Commands::Order(command) => order::run(command).await,
        }
    }
}

pub(crate) async fn connect(database_url: &str) -> Result<AppContext, String> {
    AppContext::from_database_url(database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))
}

/// Verify the presented admin key before any privileged operation runs.
pub(crate) async fn authorize(ctx: &AppContext, admin_key: String) -> Result<AdminContext, String> {
    ctx.auth
        .authorize_admin(&RawAdminKey::new(admin_key))
        .await
        .map_err(|error| format!("admin authorization failed: {error}"))
}
