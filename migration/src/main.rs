use migration::Migrator;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Database;

#[tokio::main]
async fn main() {
    if let Err(err) = Migrator::check_order() {
        eprintln!("Refusing to run migrations: {err}");
        std::process::exit(1);
    }

    let invocation = Invocation::from_args(std::env::args().skip(1));
    if let Err(err) = check_pending(invocation).await {
        eprintln!("Refusing to run migrations: {err}");
        std::process::exit(1);
    }

    cli::run_cli(Migrator).await;
}

async fn check_pending(invocation: Invocation) -> Result<(), DbErr> {
    if !invocation.applies_pending {
        return Ok(());
    }
    let Some(url) = invocation.database_url.or_else(|| std::env::var("DATABASE_URL").ok()) else {
        return Ok(());
    };
    // Connection errors are left for the CLI itself to report
    let Ok(db) = Database::connect(url.as_str()).await else {
        return Ok(());
    };
    Migrator::check_pending(&db).await
}

/// The parts of the command line that decide whether pending migrations get applied.
struct Invocation {
    applies_pending: bool,
    database_url: Option<String>,
}

impl Invocation {
    /// `up` and the bare command apply pending migrations; other subcommands do not.
    fn from_args(args: impl Iterator<Item = String>) -> Self {
        let mut args = args;
        let mut database_url = None;
        let mut applies_pending = true;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-u" | "--database-url" => database_url = args.next(),
                "-s" | "--database-schema" => {
                    args.next();
                }
                "up" => break,
                flag if flag.starts_with('-') => {
                    if let Some(url) = flag.strip_prefix("--database-url=") {
                        database_url = Some(url.to_string());
                    }
                }
                _ => {
                    applies_pending = false;
                    break;
                }
            }
        }

        Self {
            applies_pending,
            database_url,
        }
    }
}
