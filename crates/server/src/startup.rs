use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use dotenvy::dotenv;
use migration::MigratorTrait;
use sea_orm::DatabaseConnection;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use configs::{AppConfig, MailConfig, ServerConfig};
use service::auth::notify::{LogNotifier, Notifier};
use service::auth::repo::seaorm::SeaOrmAuthRepository;
use service::auth::repository::AuthRepository;
use service::auth::smtp::SmtpNotifier;
use service::auth::{AuthConfig, AuthService};

use crate::errors::StartupError;
use crate::routes::{self, auth};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(s: &ServerConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", s.host, s.port).parse()?)
}

/// SMTP when enabled, otherwise mails are only logged.
pub fn build_notifier(mail: &MailConfig) -> Result<Arc<dyn Notifier>, StartupError> {
    if mail.enabled {
        let smtp = SmtpNotifier::from_config(mail).map_err(|e| StartupError::Mail(e.to_string()))?;
        info!(host = %mail.host, port = mail.port, "smtp delivery enabled");
        Ok(Arc::new(smtp))
    } else {
        warn!("smtp disabled; verification and reset mails are logged, not sent");
        Ok(Arc::new(LogNotifier))
    }
}

/// Wire the auth service over any repository into the router state.
pub fn build_state<R: AuthRepository + 'static>(
    settings: &configs::AuthSettings,
    repo: Arc<R>,
    notifier: Arc<dyn Notifier>,
) -> Result<auth::ServerState, StartupError> {
    let svc = AuthService::new(repo, notifier, AuthConfig::from_settings(settings))
        .map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    let redirects = auth::Redirects::from_settings(settings).map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    Ok(auth::ServerState { auth: Arc::new(svc), redirects: Arc::new(redirects) })
}

/// Router for a loaded configuration and an open database.
pub async fn build_app(cfg: &AppConfig, db: DatabaseConnection) -> Result<Router, StartupError> {
    let notifier = build_notifier(&cfg.mail)?;
    let state = build_state(&cfg.auth, Arc::new(SeaOrmAuthRepository::new(db)), notifier)?;
    Ok(routes::build_router(state, build_cors()))
}

/// Public entry: build the app and run the HTTP server until a shutdown signal.
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    let cfg = AppConfig::load_and_validate()?;

    let db = models::db::connect_with_config(&cfg.database).await?;
    migration::Migrator::up(&db, None).await?;
    info!("database migrated");

    let app = build_app(&cfg, db).await?;

    let addr = bind_addr(&cfg.server)?;
    info!(%addr, "starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(common::utils::shutdown::shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}
