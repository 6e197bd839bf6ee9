use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Subcommand;
use fridge_core::models::{FridgeItem, NewFridgeItem, StockDates};
use fridge_core::{ApiClient, ApiError};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and remember the session
    Login { username: String },
    /// Create an account and log in
    Register { username: String },
    /// End the session and forget stored credentials
    Logout,
    /// Show who is logged in
    Status,
    /// Manage the item catalog
    #[command(subcommand)]
    Items(ItemsCommand),
    /// Manage fridges and their stock
    #[command(subcommand)]
    Fridges(FridgesCommand),
}

#[derive(Debug, Subcommand)]
pub enum ItemsCommand {
    List,
    Add { name: String },
    Rename { id: String, name: String },
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
pub enum FridgesCommand {
    List,
    Create { name: String },
    Delete { id: String },
    /// List the stock of one fridge
    Items { fridge_id: String },
    /// Put an item into a fridge
    Stock {
        fridge_id: String,
        item_id: String,
        /// Best-before date (YYYY-MM-DD)
        #[arg(long)]
        best_before: NaiveDate,
        /// Date it went into the fridge (YYYY-MM-DD), defaults to today
        #[arg(long)]
        stored: Option<NaiveDate>,
    },
    /// Change the dates on a stock entry
    Update {
        fridge_id: String,
        fridge_item_id: String,
        #[arg(long)]
        best_before: NaiveDate,
        #[arg(long)]
        stored: NaiveDate,
    },
    /// Take a stock entry out of a fridge
    Remove {
        fridge_id: String,
        fridge_item_id: String,
    },
}

pub async fn run(client: &ApiClient, command: Command) -> Result<()> {
    match command {
        Command::Login { username } => {
            let password = rpassword::prompt_password("Password: ")
                .context("Failed to read password")?;
            client.login(&username, &password).await?;
            println!("Logged in as {}", username);
        }
        Command::Register { username } => {
            let password = rpassword::prompt_password("Password: ")
                .context("Failed to read password")?;
            let confirmation = rpassword::prompt_password("Confirm password: ")
                .context("Failed to read password")?;
            client.register(&username, &password, &confirmation).await?;
            println!("Registered and logged in as {}", username);
        }
        Command::Logout => {
            client.logout().await;
            println!("Logged out");
        }
        Command::Status => {
            let snapshot = client.session().snapshot();
            match snapshot.user {
                Some(user) if snapshot.authenticated => println!("Logged in as {}", user.username),
                _ => println!("Not logged in"),
            }
        }
        Command::Items(cmd) => run_items(client, cmd).await.map_err(|e| explain(client, e))?,
        Command::Fridges(cmd) => run_fridges(client, cmd).await.map_err(|e| explain(client, e))?,
    }
    Ok(())
}

async fn run_items(client: &ApiClient, command: ItemsCommand) -> Result<(), ApiError> {
    match command {
        ItemsCommand::List => {
            let items = client.list_items().await?;
            if items.is_empty() {
                println!("No items yet");
            }
            for item in items {
                println!("{:<38} {}", item.id, item.name);
            }
        }
        ItemsCommand::Add { name } => {
            client.create_item(&name).await?;
            println!("Item created");
        }
        ItemsCommand::Rename { id, name } => {
            client.rename_item(&id, &name).await?;
            println!("Item renamed");
        }
        ItemsCommand::Delete { id } => {
            client.delete_item(&id).await?;
            println!("Item deleted");
        }
    }
    Ok(())
}

async fn run_fridges(client: &ApiClient, command: FridgesCommand) -> Result<(), ApiError> {
    match command {
        FridgesCommand::List => {
            let fridges = client.list_fridges().await?;
            if fridges.is_empty() {
                println!("No fridges yet");
            }
            for fridge in fridges {
                println!("{:<38} {}", fridge.id, fridge.name);
            }
        }
        FridgesCommand::Create { name } => {
            client.create_fridge(&name).await?;
            println!("Fridge created");
        }
        FridgesCommand::Delete { id } => {
            client.delete_fridge(&id).await?;
            println!("Fridge deleted");
        }
        FridgesCommand::Items { fridge_id } => {
            let stock = client.list_fridge_items(&fridge_id).await?;
            if stock.is_empty() {
                println!("Fridge is empty");
            }
            for entry in &stock {
                println!("{}", format_stock_line(entry));
            }
        }
        FridgesCommand::Stock {
            fridge_id,
            item_id,
            best_before,
            stored,
        } => {
            let entry = NewFridgeItem {
                item_id,
                best_before_date: best_before,
                stored_at: stored.unwrap_or_else(|| Local::now().date_naive()),
            };
            client.add_fridge_item(&fridge_id, &entry).await?;
            println!("Item added to fridge");
        }
        FridgesCommand::Update {
            fridge_id,
            fridge_item_id,
            best_before,
            stored,
        } => {
            let dates = StockDates {
                best_before_date: best_before,
                stored_at: stored,
            };
            client
                .update_fridge_item(&fridge_id, &fridge_item_id, dates)
                .await?;
            println!("Stock entry updated");
        }
        FridgesCommand::Remove {
            fridge_id,
            fridge_item_id,
        } => {
            client.remove_fridge_item(&fridge_id, &fridge_item_id).await?;
            println!("Item removed from fridge");
        }
    }
    Ok(())
}

fn format_stock_line(entry: &FridgeItem) -> String {
    let show = |date: Option<NaiveDate>, raw: &str| {
        date.map(|d| d.format("%d.%m.%Y.").to_string())
            .unwrap_or_else(|| raw.to_string())
    };
    format!(
        "{:<38} {:<24} stored {}  best before {}",
        entry.id,
        entry.item_name,
        show(entry.stored_on(), &entry.stored_at),
        show(entry.best_before(), &entry.best_before_date),
    )
}

/// Turn an authorization failure into a hint when there is no session left.
fn explain(client: &ApiClient, err: ApiError) -> anyhow::Error {
    if err.is_auth_failure() && !client.session().is_authenticated() {
        return anyhow::anyhow!("Not logged in (run `fridge login <username>`)");
    }
    anyhow::Error::new(err)
}
