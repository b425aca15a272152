//! Admin key provisioning commands.

use clap::{Args, Subcommand};
use kraal::auth::{AuthService, models::RawAdminKey};

use super::connect;

#[derive(Debug, Args)]
pub(crate) struct AdminKeyCommand {
    #[command(subcommand)]
    command: AdminKeySubcommand,
}

#[derive(Debug, Subcommand)]
enum AdminKeySubcommand {
    Create(CreateAdminKeyArgs),
}

#[derive(Debug, Args)]
struct CreateAdminKeyArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Label describing who holds the key
    #[arg(long)]
    label: String,

    /// Optional raw key material; generated when omitted
    #[arg(long)]
    key: Option<String>,
}

pub(crate) async fn run(command: AdminKeyCommand) -> Result<(), String> {
    match command.command {
        AdminKeySubcommand::Create(args) => create(args).await,
    }
}

async fn create(args: CreateAdminKeyArgs) -> Result<(), String> {
    let ctx = connect(&args.database_url).await?;

    let raw = args.key.unwrap_or_else(generate_key);

    if raw.trim().is_empty() {
        return Err("admin key cannot be empty".to_string());
    }

    let created = ctx
        .auth
        .create_key(&args.label, &RawAdminKey::new(raw.clone()))
        .await
        .map_err(|error| format!("failed to create admin key: {error}"))?;

    println!("key_uuid: {}", created.uuid);
    println!("label: {}", created.label);
    println!("admin_key: {raw}");
    println!("store this key now; it is only shown once");

    Ok(())
}

fn generate_key() -> String {
    let bytes: [u8; 24] = rand::random();
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();

    format!("kr_{hex}")
}
