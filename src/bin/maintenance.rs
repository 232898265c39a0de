use std::env;

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use tracing_subscriber::EnvFilter;

use waitlist::{
    auth::password,
    config::AppConfig,
    db,
    store::{AccountStore, PgWaitlistStore, StoreError, WaitlistStore},
};

const USAGE: &str = "Usage: maintenance <create-admin <username> [password] | stats>";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("create-admin") => {
            let username = args.next().context(USAGE)?;
            let password = match args.next() {
                Some(password) => password,
                None => env::var("ADMIN_PASSWORD")
                    .context("pass a password argument or set ADMIN_PASSWORD")?,
            };
            create_admin(&username, &password).await?
        }
        Some("stats") => print_stats().await?,
        Some(cmd) => {
            eprintln!("Unknown command: {cmd}\n{USAGE}");
            std::process::exit(1);
        }
        None => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn open_store() -> Result<PgWaitlistStore> {
    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "maintenance",
        database_url = %config.redacted_database_url(),
        "loaded waitlist configuration"
    );
    let pool = db::init_pool_with_size(&config.database_url, 1)?;
    Ok(PgWaitlistStore::new(pool))
}

async fn create_admin(username: &str, password: &str) -> Result<()> {
    let username = username.trim();
    if username.is_empty() {
        bail!("username must not be empty");
    }
    if password.len() < 8 {
        bail!("password must be at least 8 characters");
    }

    let store = open_store()?;
    let password_hash = password::hash_password(password)?;

    match store.create_admin(username, &password_hash).await {
        Ok(admin) => {
            println!("Created admin {} ({})", admin.username, admin.id);
            Ok(())
        }
        Err(StoreError::DuplicateUsername) => bail!("admin {username} already exists"),
        Err(err) => Err(err).context("failed to create admin"),
    }
}

async fn print_stats() -> Result<()> {
    let store = open_store()?;
    let now = Utc::now().naive_utc();

    let total = store.count(None).await.context("failed to count entries")?;
    let week = store
        .count(Some(now - Duration::days(7)))
        .await
        .context("failed to count entries")?;
    let month = store
        .count(Some(now - Duration::days(30)))
        .await
        .context("failed to count entries")?;

    println!("total_signups: {total}");
    println!("this_week:     {week}");
    println!("this_month:    {month}");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
