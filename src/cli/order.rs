//! Order administration commands.

use clap::{Args, Subcommand};
use kraal::domain::orders::{
    OrdersService,
    models::{DeliveryStatus, OrderUuid},
};
use uuid::Uuid;

use super::{authorize, connect};

#[derive(Debug, Args)]
pub(crate) struct OrderCommand {
    #[command(subcommand)]
    command: OrderSubcommand,
}

#[derive(Debug, Subcommand)]
enum OrderSubcommand {
    List(ListOrdersArgs),
    SetDelivery(SetDeliveryArgs),
}

#[derive(Debug, Args)]
struct ListOrdersArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Admin key authorizing the listing
    #[arg(long, env = "ADMIN_KEY", hide_env_values = true)]
    admin_key: String,
}

#[derive(Debug, Args)]
struct SetDeliveryArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Admin key authorizing the write
    #[arg(long, env = "ADMIN_KEY", hide_env_values = true)]
    admin_key: String,

    /// Order UUID
    #[arg(long)]
    uuid: Uuid,

    /// New delivery status: Processing, Shipped, "In Transit" or Delivered
    #[arg(long)]
    status: DeliveryStatus,
}

pub(crate) async fn run(command: OrderCommand) -> Result<(), String> {
    match command.command {
        OrderSubcommand::List(args) => list(args).await,
        OrderSubcommand::SetDelivery(args) => set_delivery(args).await,
    }
}

async fn list(args: ListOrdersArgs) -> Result<(), String> {
    let ctx = connect(&args.database_url).await?;
    let admin = authorize(&ctx, args.admin_key).await?;

    let orders = ctx
        .orders
        .list_all(&admin)
        .await
        .map_err(|error| format!("failed to list orders: {error}"))?;

    for entry in orders {
        println!(
            "{} item={} amount={} payment={} delivery={} reference={}",
            entry.order.uuid,
            entry.display_breed(),
            entry.order.amount,
            entry.order.payment_status,
            entry.order.delivery_status,
            entry.order.payment_reference,
        );
    }

    Ok(())
}

async fn set_delivery(args: SetDeliveryArgs) -> Result<(), String> {
    let ctx = connect(&args.database_url).await?;
    let admin = authorize(&ctx, args.admin_key).await?;

    ctx.orders
        .update_delivery_status(&admin, OrderUuid::from_uuid(args.uuid), args.status)
        .await
        .map_err(|error| format!("failed to update delivery status: {error}"))?;

    println!("order {} -> {}", args.uuid, args.status);

    Ok(())
}
