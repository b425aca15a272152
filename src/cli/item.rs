//! Inventory administration commands.

use clap::{Args, Subcommand};
use kraal::domain::catalog::{
    CatalogService,
    models::{AvailabilityStatus, ItemUpdate, ItemUuid, NewItem},
};
use uuid::Uuid;

use super::{authorize, connect};

#[derive(Debug, Args)]
pub(crate) struct ItemCommand {
    #[command(subcommand)]
    command: ItemSubcommand,
}

#[derive(Debug, Subcommand)]
enum ItemSubcommand {
    Create(CreateItemArgs),
    List(ListItemsArgs),
    Update(UpdateItemArgs),
    Delete(DeleteItemArgs),
}

#[derive(Debug, Args)]
struct ItemFields {
    /// Physical tag number, e.g. C001
    #[arg(long)]
    tag_number: String,

    #[arg(long)]
    breed: String,

    #[arg(long)]
    age: String,

    #[arg(long)]
    weight: String,

    /// Price in minor currency units
    #[arg(long)]
    price: u64,

    #[arg(long, default_value_t = 1)]
    stock: u32,

    #[arg(long, default_value = "Available")]
    status: AvailabilityStatus,

    #[arg(long)]
    health_notes: Option<String>,

    /// Image URL; repeat for multiple images (first is primary)
    #[arg(long = "image")]
    images: Vec<String>,
}

#[derive(Debug, Args)]
struct CreateItemArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Admin key authorizing the write
    #[arg(long, env = "ADMIN_KEY", hide_env_values = true)]
    admin_key: String,

    #[command(flatten)]
    fields: ItemFields,
}

#[derive(Debug, Args)]
struct ListItemsArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

#[derive(Debug, Args)]
struct UpdateItemArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Admin key authorizing the write
    #[arg(long, env = "ADMIN_KEY", hide_env_values = true)]
    admin_key: String,

    /// Item UUID
    #[arg(long)]
    uuid: Uuid,

    #[command(flatten)]
    fields: ItemFields,
}

#[derive(Debug, Args)]
struct DeleteItemArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Admin key authorizing the write
    #[arg(long, env = "ADMIN_KEY", hide_env_values = true)]
    admin_key: String,

    /// Item UUID
    #[arg(long)]
    uuid: Uuid,
}

pub(crate) async fn run(command: ItemCommand) -> Result<(), String> {
    match command.command {
        ItemSubcommand::Create(args) => create(args).await,
        ItemSubcommand::List(args) => list(args).await,
        ItemSubcommand::Update(args) => update(args).await,
        ItemSubcommand::Delete(args) => delete(args).await,
    }
}

async fn create(args: CreateItemArgs) -> Result<(), String> {
    let ctx = connect(&args.database_url).await?;
    let admin = authorize(&ctx, args.admin_key).await?;

    let created = ctx
        .catalog
        .create_item(
            &admin,
            NewItem {
                uuid: ItemUuid::new(),
                tag_number: args.fields.tag_number,
                breed: args.fields.breed,
                age: args.fields.age,
                weight: args.fields.weight,
                price: args.fields.price,
                stock_quantity: args.fields.stock,
                availability_status: args.fields.status,
                health_notes: args.fields.health_notes,
                images: args.fields.images,
            },
        )
        .await
        .map_err(|error| format!("failed to create item: {error}"))?;

    println!("item_uuid: {}", created.uuid);
    println!("status: {}", created.availability_status);

    Ok(())
}

async fn list(args: ListItemsArgs) -> Result<(), String> {
    let ctx = connect(&args.database_url).await?;

    let items = ctx
        .catalog
        .list_items()
        .await
        .map_err(|error| format!("failed to list items: {error}"))?;

    for item in items {
        println!(
            "{} tag={} breed={} price={} stock={} status={}",
            item.uuid,
            item.tag_number,
            item.breed,
            item.price,
            item.stock_quantity,
            item.availability_status,
        );
    }

    Ok(())
}

async fn update(args: UpdateItemArgs) -> Result<(), String> {
    let ctx = connect(&args.database_url).await?;
    let admin = authorize(&ctx, args.admin_key).await?;

    let updated = ctx
        .catalog
        .update_item(
            &admin,
            ItemUuid::from_uuid(args.uuid),
            ItemUpdate {
                tag_number: args.fields.tag_number,
                breed: args.fields.breed,
                age: args.fields.age,
                weight: args.fields.weight,
                price: args.fields.price,
                stock_quantity: args.fields.stock,
                availability_status: args.fields.status,
                health_notes: args.fields.health_notes,
                images: args.fields.images,
            },
        )
        .await
        .map_err(|error| format!("failed to update item: {error}"))?;

    println!("item_uuid: {}", updated.uuid);
    println!("stock: {}", updated.stock_quantity);
    println!("status: {}", updated.availability_status);

    Ok(())
}

async fn delete(args: DeleteItemArgs) -> Result<(), String> {
    let ctx = connect(&args.database_url).await?;
    let admin = authorize(&ctx, args.admin_key).await?;

    ctx.catalog
        .delete_item(&admin, ItemUuid::from_uuid(args.uuid))
        .await
        .map_err(|error| format!("failed to delete item: {error}"))?;

    println!("deleted {}", args.uuid);

    Ok(())
}
