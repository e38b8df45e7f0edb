//! # Scene Tutor Backend - Main Application Entry Point
//!
//! HTTP backend for a language-tutoring page. The learner picks a topic and a
//! difficulty, is shown a generated image or video, describes it in writing,
//! and gets a scored evaluation. Feedback can be read aloud through synthesized
//! speech.
//!
//! ## Application Architecture:
//! - **config**: Application configuration (TOML files + environment variables)
//! - **state**: Shared application state and metrics
//! - **health**: Health and metrics endpoints
//! - **middleware**: Request logging and metrics
//! - **handlers**: HTTP request handlers for API endpoints
//! - **error**: Error types and HTTP error responses
//! - **genai**: Generative AI service client, request builders, job poller
//! - **audio**: PCM16 speech decoding and the shared audio context
//! - **lesson**: Lesson rounds, evaluation and history

mod audio;       // Speech audio decoding (audio/ directory)
mod config;      // Configuration management (config.rs)
mod error;       // Error handling types (error.rs)
mod genai;       // Generative AI service (genai/ directory)
mod handlers;    // HTTP request handlers (handlers/ directory)
mod health;      // Health check endpoints (health.rs)
mod lesson;      // Tutoring workflow (lesson/ directory)
mod middleware;  // Custom middleware (middleware/ directory)
mod state;       // Application state management (state.rs)

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Result;
use config::AppConfig;
use state::AppState;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// The main application entry point.
///
/// ## What this function does:
/// 1. **Loads configuration** from files and environment variables
/// 2. **Sets up logging**
/// 3. **Creates shared application state** (service client, tutor, audio context)
/// 4. **Configures the HTTP server** with middleware and routes
/// 5. **Shuts down gracefully**: stops the server, cancels video waits, closes audio
#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {}:{}", config.server.host, config.server.port);
    if config.genai.api_key.is_empty() {
        warn!("No API key configured; set GEMINI_API_KEY or PUT /api/v1/config before starting a lesson");
    }

    let app_state = AppState::new(config.clone())?;
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    info!("Starting HTTP server on {}", bind_addr);

    let server_state = app_state.clone();
    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(server_state.clone()))
            // Middleware executes in reverse order for responses
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(middleware::MetricsMiddleware)
            .wrap(middleware::RequestLogging)
            .service(
                web::scope("/api/v1")
                    .route("/health", web::get().to(health::health_check))
                    .route("/metrics", web::get().to(health::detailed_metrics))
                    .route("/config", web::get().to(handlers::get_config))
                    .route("/config", web::put().to(handlers::update_config))
                    .route("/status", web::get().to(handlers::get_status))
                    .route("/lessons", web::post().to(handlers::create_lesson))
                    .route("/lessons/{id}/evaluate", web::post().to(handlers::evaluate_lesson))
                    .route("/history", web::get().to(handlers::get_history))
                    .route("/media/{id}", web::get().to(handlers::get_media))
                    .route("/speech", web::post().to(handlers::synthesize_speech))
                    .route("/speech/wav", web::post().to(handlers::synthesize_speech_wav)),
            )
            .route("/health", web::get().to(health::health_check))
    })
    .disable_signals()
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Err(e)) => error!("Server error: {}", e),
                Err(e) => error!("Server task error: {}", e),
                Ok(Ok(())) => {}
            }
            app_state.shutdown();
        }
        signal = wait_for_shutdown() => {
            match signal {
                Ok(name) => info!("Received {}, stopping server...", name),
                Err(e) => error!("Signal handler failed ({}), stopping server...", e),
            }
            // Cancel video waits before draining in-flight requests.
            app_state.shutdown();
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Initialize tracing.
///
/// ## Environment Variables:
/// - `RUST_LOG`: Controls what gets logged (e.g., "debug", "scene_tutor_backend=trace")
/// - If not set, defaults to "scene_tutor_backend=debug,actix_web=info"
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scene_tutor_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}

/// Resolve when SIGINT (Ctrl+C) or, on Unix, SIGTERM arrives.
async fn wait_for_shutdown() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = sigterm.recv() => Ok("SIGTERM"),
            result = tokio::signal::ctrl_c() => result.map(|_| "SIGINT"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.map(|_| "Ctrl+C")
    }
}
