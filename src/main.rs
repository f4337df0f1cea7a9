use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use taxdesk_rs::auth::{extractors::AppState, google::GoogleOAuthService, jwt::JwtService, otp::OtpStore};
use taxdesk_rs::services::{email::EmailService, payments::RazorpayClient};
use taxdesk_rs::{create_app, AppConfig, Database};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const OTP_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taxdesk_rs=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let startup_time = Instant::now();

    let config = AppConfig::new()?;
    let bind_address = format!("{}:{}", config.server.host, config.server.port);

    info!("Starting TaxDesk-RS server on {}", bind_address);

    let database = match Database::new(&config.database.url, config.database.max_connections).await {
        Ok(db) => {
            info!("Database connected successfully");
            db
        }
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e);
        }
    };

    let jwt_service = match JwtService::new(&config.auth) {
        Ok(service) => {
            info!("JWT service initialized successfully");
            service
        }
        Err(e) => {
            error!("Failed to initialize JWT service: {}", e);
            return Err(e);
        }
    };

    let otp_store = OtpStore::from_config(&config.auth);
    otp_store.spawn_sweeper(OTP_SWEEP_INTERVAL);
    info!("OTP store initialized, codes valid for {}s", config.auth.otp_ttl_seconds);

    let google_oauth = GoogleOAuthService::new(config.google.clone());
    if !google_oauth.is_configured() {
        warn!("Google OAuth credentials missing, Google sign-in is disabled");
    }

    let email_service = Arc::new(EmailService::new(config.email.clone()));
    let payments = Arc::new(RazorpayClient::new(config.payments.clone()));

    let app_state = AppState {
        database,
        jwt_service,
        otp_store,
        google_oauth,
        email_service,
        payments,
        config: config.clone(),
        startup_time,
    };

    let app = create_app(app_state).await?;

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
