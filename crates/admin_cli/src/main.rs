use std::error::Error;

use clap::{Args, Parser, Subcommand};
use engine::{BootstrapAdmin, Engine, EngineError};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

#[derive(Parser, Debug)]
#[command(name = "tracks_admin")]
#[command(about = "Admin utilities for Tracks (first-time setup)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./tracks.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the initial administrator account.
    Bootstrap(BootstrapArgs),
}

#[derive(Args, Debug)]
struct BootstrapArgs {
    #[arg(long, default_value = "admin")]
    login: String,
    #[arg(long, default_value = "admin")]
    password: String,
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;

    match cli.command {
        Command::Bootstrap(args) => {
            let engine = Engine::builder().database(db).build().await?;
            let admin = BootstrapAdmin {
                login: args.login,
                password: args.password,
                ..BootstrapAdmin::default()
            };
            let password = admin.password.clone();

            match engine.bootstrap_admin(admin).await {
                Ok(user) => {
                    println!("Admin user created successfully: {}/{password}", user.login);
                }
                Err(EngineError::ExistingKey(login)) => {
                    eprintln!("user already exists: {login}");
                    std::process::exit(1);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    Ok(())
}
