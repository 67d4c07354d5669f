use axum::Router;
use clap::Parser;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paydesk::config::Config;
use paydesk::db::{AppState, create_pool, init_db, queries};
use paydesk::handlers;
use paydesk::models::{
    Amount, BatchMonth, CreateUser, NewContribution, Permission, Signatories,
};
use paydesk::payments::StripeClient;

#[derive(Parser, Debug)]
#[command(name = "paydesk")]
#[command(about = "Payroll contribution records and Stripe payment proxy")]
struct Cli {
    /// Seed the database with dev data (admin user, one batch, signatories)
    #[arg(long)]
    seed: bool,

    /// Create a staff user, print its API token and exit
    #[arg(long, value_name = "EMAIL")]
    create_user: Option<String>,

    /// Display name for --create-user
    #[arg(long, requires = "create_user", default_value = "Staff User")]
    name: String,

    /// Comma-separated permissions for --create-user (view,edit,delete,upload,generate)
    #[arg(long, requires = "create_user", default_value = "view")]
    permissions: String,
}

fn bootstrap_admin(state: &AppState, email: &str) {
    let conn = state.db.get().expect("Failed to get db connection for bootstrap");

    let count = queries::count_users(&conn).expect("Failed to count users");
    if count > 0 {
        tracing::info!("Users already exist, skipping bootstrap");
        return;
    }

    let input = CreateUser {
        email: email.to_string(),
        name: "Administrator".to_string(),
        permissions: Permission::all(),
    };
    let user = queries::create_user(&conn, &input).expect("Failed to create bootstrap admin");
    let (_, token) =
        queries::create_api_token(&conn, &user.id).expect("Failed to create bootstrap token");

    tracing::info!("============================================");
    tracing::info!("BOOTSTRAP ADMIN CREATED");
    tracing::info!("Email: {}", email);
    tracing::info!("API Token: {}", token);
    tracing::info!("============================================");
    tracing::info!("SAVE THIS TOKEN - IT WILL NOT BE SHOWN AGAIN");
    tracing::info!("============================================");
}

/// Seeds the database with dev data.
/// Only runs in dev mode and when no users exist.
fn seed_dev_data(state: &AppState) {
    let mut conn = state.db.get().expect("Failed to get db connection for seeding");

    let count = queries::count_users(&conn).expect("Failed to count users");
    if count > 0 {
        tracing::info!("Database already has data, skipping seed");
        return;
    }

    tracing::info!("============================================");
    tracing::info!("SEEDING DEV DATA");
    tracing::info!("============================================");

    let admin = queries::create_user(
        &conn,
        &CreateUser {
            email: "admin@paydesk.local".to_string(),
            name: "Dev Admin".to_string(),
            permissions: Permission::all(),
        },
    )
    .expect("Failed to create dev admin");
    let (_, admin_token) =
        queries::create_api_token(&conn, &admin.id).expect("Failed to create dev admin token");

    let viewer = queries::create_user(
        &conn,
        &CreateUser {
            email: "viewer@paydesk.local".to_string(),
            name: "Dev Viewer".to_string(),
            permissions: vec![Permission::View],
        },
    )
    .expect("Failed to create dev viewer");
    let (_, viewer_token) =
        queries::create_api_token(&conn, &viewer.id).expect("Failed to create dev viewer token");

    let month = BatchMonth::containing(chrono::Local::now().date_naive());
    let rows: Vec<NewContribution> = [
        ("34-1234567-8", "Dela Cruz, Juan", 112_500, 3_000),
        ("34-2345678-9", "Santos, Maria", 90_000, 1_000),
        ("34-3456789-0", "Reyes, Ana", 57_000, 1_000),
    ]
    .into_iter()
    .map(|(sss_no, name, ss, ec)| NewContribution {
        batch_date: month,
        sss_no: sss_no.to_string(),
        name: name.to_string(),
        ss: Amount::from_centavos(ss),
        ec: Amount::from_centavos(ec),
        total: None,
        sbr_no: None,
        sbr_date: None,
    })
    .collect();
    queries::insert_batch(&mut conn, month, &rows).expect("Failed to seed batch");

    queries::save_signatories(
        &conn,
        &Signatories {
            payroll_incharge: "Liza Ramos".to_string(),
            vp_finance: "Carlos Tan".to_string(),
        },
    )
    .expect("Failed to seed signatories");

    tracing::info!("Admin: {} ({})", admin.email, admin.name);
    tracing::info!("Viewer: {} ({})", viewer.email, viewer.name);
    tracing::info!("Batch: {} ({} records)", month.long_label(), rows.len());

    println!();
    println!("--- COPY FROM HERE ---");
    println!("  admin_token: {}", admin_token);
    println!("  viewer_token: {}", viewer_token);
    println!("--- END COPY ---");
    println!();
}

fn create_user_command(config: &Config, email: &str, name: &str, permissions: &str) -> Result<(), String> {
    let permissions = Permission::parse_list(permissions)?;
    let input = CreateUser {
        email: email.to_string(),
        name: name.to_string(),
        permissions,
    };
    input.validate().map_err(|e| e.to_string())?;

    let pool = create_pool(&config.database_path)
        .map_err(|e| format!("Failed to create database pool: {}", e))?;
    let conn = pool
        .get()
        .map_err(|e| format!("Failed to get database connection: {}", e))?;
    init_db(&conn).map_err(|e| format!("Failed to initialize database: {}", e))?;

    let user = queries::create_user(&conn, &input).map_err(|e| e.to_string())?;
    let (_, token) = queries::create_api_token(&conn, &user.id).map_err(|e| e.to_string())?;

    let tags: Vec<&str> = user.user_permissions.iter().map(|p| p.as_ref()).collect();
    println!("Created user {} ({})", user.email, user.name);
    println!("Permissions: {}", tags.join(","));
    println!("API token: {}", token);
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paydesk=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if let Some(ref email) = cli.create_user {
        if let Err(e) = create_user_command(&config, email, &cli.name, &cli.permissions) {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
        return;
    }

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let state = AppState {
        db: db_pool,
        stripe: StripeClient::new(&config.stripe),
        pdf_max_rows: config.pdf_max_rows,
        max_upload_bytes: config.max_upload_bytes,
    };

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set PAYDESK_ENV=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    if let Some(ref email) = config.bootstrap_admin_email {
        bootstrap_admin(&state, email);
    }

    let app = Router::new()
        .merge(handlers::router(state.clone()))
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("paydesk server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
