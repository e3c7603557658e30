use anyhow::{anyhow, Result};
use std::env;
use std::io;
use std::path::Path;
use tutor_booking_bot::config::Config;
use tutor_booking_bot::database::connection::{ensure_parent_dir, sqlite_file_path, DatabaseManager};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tutor_booking_bot=info".into()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("migrate");

    match command {
        "migrate" | "up" => run_migrations().await,
        "check" => check_database().await,
        "reset" => reset_database().await,
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {command}");
            print_help();
            std::process::exit(1);
        }
    }
}

async fn run_migrations() -> Result<()> {
    println!("🔧 Tutor Booking Bot - Database Migration Tool");
    println!("==============================================");

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    println!("📊 Database URL: {}", mask_url(&config.database_url));

    ensure_parent_dir(&config.database_url)?;

    println!("🚀 Running database migrations...");

    let db_manager = DatabaseManager::with_timeout(&config.database_url, config.db_timeout)
        .await
        .map_err(|e| anyhow!("Failed to connect to database: {}", e))?;

    match db_manager.run_migrations().await {
        Ok(_) => {
            println!("✅ Migrations completed successfully!");
            println!("\n🎯 Your booking database is ready!");
        }
        Err(e) => {
            eprintln!("❌ Migration failed: {e}");
            std::process::exit(1);
        }
    }

    Ok(())
}

async fn check_database() -> Result<()> {
    println!("🔍 Checking database connection and schema...");

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    println!("📊 Database URL: {}", mask_url(&config.database_url));

    let db_manager = DatabaseManager::with_timeout(&config.database_url, config.db_timeout)
        .await
        .map_err(|e| anyhow!("Failed to connect to database: {}", e))?;

    match check_schema(&db_manager).await {
        Ok((tables, bookings)) => {
            println!("✅ Database connection successful!");
            println!("📋 Found tables:");
            for table in tables {
                println!("  • {table}");
            }
            match bookings {
                Some(count) => println!("📅 Live bookings: {count}"),
                None => println!("💡 No bookings table yet - run 'migrate up' to create the schema"),
            }
        }
        Err(e) => {
            println!("⚠️  Database check failed: {e}");
            println!("💡 Try running 'migrate up' to create the schema");
        }
    }

    Ok(())
}

async fn reset_database() -> Result<()> {
    println!("⚠️  WARNING: This will delete ALL bookings in the database!");
    println!("🤔 Are you sure you want to continue? (yes/no)");

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    if input.trim().to_lowercase() != "yes" {
        println!("❌ Reset cancelled.");
        return Ok(());
    }

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    // For SQLite, we can just delete the file
    let Some(db_path) = sqlite_file_path(&config.database_url) else {
        return Err(anyhow!("Reset is only supported for file-backed SQLite databases"));
    };
    if db_path.exists() {
        std::fs::remove_file(db_path)?;
        println!("🗑️  Deleted database file: {}", db_path.display());
    }

    println!("🔄 Recreating database schema...");
    run_migrations().await?;

    println!("✅ Database reset completed!");

    Ok(())
}

async fn check_schema(db_manager: &DatabaseManager) -> Result<(Vec<String>, Option<i64>)> {
    let tables = sqlx::query_scalar::<_, String>(
        "SELECT name FROM sqlite_master WHERE type='table' ORDER BY name",
    )
    .fetch_all(&db_manager.pool)
    .await?;

    let bookings = if tables.iter().any(|t| t == "bookings") {
        Some(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bookings")
                .fetch_one(&db_manager.pool)
                .await?,
        )
    } else {
        None
    };

    Ok((tables, bookings))
}

fn mask_url(url: &str) -> String {
    // Don't show full paths in production logs
    match sqlite_file_path(url).and_then(Path::file_name) {
        Some(filename) => format!("sqlite:.../{}", filename.to_string_lossy()),
        None => url.to_string(),
    }
}

fn print_help() {
    println!("📚 Tutor Booking Bot - Database Migration Tool");
    println!();
    println!("USAGE:");
    println!("    migrate [COMMAND]");
    println!();
    println!("COMMANDS:");
    println!("    migrate, up    Run database migrations (default)");
    println!("    check          Check database connection, schema and booking count");
    println!("    reset          Reset database (SQLite only) - DESTRUCTIVE!");
    println!("    help           Show this help message");
    println!();
    println!("ENVIRONMENT:");
    println!("    DATABASE_URL   Database connection string (default: sqlite:./data/bookings.db)");
    println!();
    println!("EXAMPLES:");
    println!("    migrate                    # Run migrations");
    println!("    migrate check              # Check database status");
    println!("    migrate reset              # Reset database (careful!)");
    println!();
}
