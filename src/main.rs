use std::sync::Arc;

use ray_auth::config::{environment::Config, init_db};
use ray_auth::modules::auth::manager::AccountManager;
use ray_auth::modules::auth::store::MySqlStore;
use ray_auth::services::{
    clock::SystemClock, mailer::SmtpMailer, otp::RandomOtp, session::SessionTokens,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ray_auth=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().expect("Failed to load environment configuration");

    let db = init_db(&config.database_url).await;
    sqlx::migrate!()
        .run(&db)
        .await
        .expect("Failed to run migrations");
    tracing::info!("Connected to MySQL");

    let mailer = SmtpMailer::new(&config).expect("Failed to build SMTP transport");
    let tokens = SessionTokens::new(config.jwt_secret.clone());

    let auth = AccountManager::new(
        Arc::new(MySqlStore::new(db)),
        Arc::new(mailer),
        Arc::new(SystemClock),
        Arc::new(RandomOtp),
        tokens,
    );

    let app = ray_auth::create_app(auth, config.cookie_secure).await;

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .unwrap();
    tracing::info!("Server running on http://localhost:{}", config.port);
    axum::serve(listener, app).await.unwrap();
}
