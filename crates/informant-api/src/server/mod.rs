//! Server setup and process lifecycle
//!
//! `run` logs in and owns the session. `serve` binds the intake listener and
//! runs until the shutdown token fires: background sync and the intake server
//! run as tasks, the dispatch loop in the foreground. Sync has its own token,
//! cancelled only once the dispatch loop has returned, so the session is never
//! used for sends after its sync task was told to stop. Teardown then waits for
//! sync, closes the session and lets the intake drain.

mod signal;

use std::sync::Arc;

use axum::Router;
use informant_common::{AppConfig, AppError, AppResult, SharedSecret};
use informant_core::{NetworkSession, SessionResult, Submission};
use informant_matrix::{MatrixConfig, MatrixSession};
use informant_service::{
    apply_profile, DispatchPolicy, Dispatcher, InviteHandler, MessageLogger, ProfileSettings,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::middleware::apply_middleware;
use crate::routes::create_router;
use crate::state::IntakeState;

pub use signal::spawn_signal_watcher;

/// Build the intake application with routes and middleware
pub fn create_app(state: IntakeState, max_body_bytes: usize) -> Router {
    let router = create_router();
    let router = apply_middleware(router, max_body_bytes);
    router.with_state(state)
}

/// Log in and run until a shutdown signal
pub async fn run(config: AppConfig) -> AppResult<()> {
    info!(
        homeserver = %config.homeserver,
        username = %config.username,
        "Logging in"
    );
    let session = MatrixSession::login(MatrixConfig::from(&config))
        .await
        .map_err(AppError::Session)?;

    let shutdown = CancellationToken::new();
    spawn_signal_watcher(shutdown.clone());

    serve(&config, Arc::new(session), shutdown).await
}

/// Bind the configured address and run the lifecycle around `session`
pub async fn serve(
    config: &AppConfig,
    session: Arc<dyn NetworkSession>,
    shutdown: CancellationToken,
) -> AppResult<()> {
    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr.as_str())
        .await
        .map_err(|e| AppError::bind(&addr, e))?;

    serve_with_listener(listener, config, session, shutdown).await
}

/// Run the lifecycle on an already bound listener
pub async fn serve_with_listener(
    listener: TcpListener,
    config: &AppConfig,
    session: Arc<dyn NetworkSession>,
    shutdown: CancellationToken,
) -> AppResult<()> {
    session.add_event_handler(Arc::new(InviteHandler::new()));
    session.add_event_handler(Arc::new(MessageLogger));

    let gate = SharedSecret::new(&config.psk);
    if gate.is_empty() {
        warn!("psk is empty, only submissions without a PSK will be relayed");
    }

    let local_addr = listener.local_addr().map_err(AppError::Server)?;
    let (tx, rx) = mpsc::channel::<Submission>(config.dispatch.queue_capacity);

    let stop_sync = CancellationToken::new();
    let sync = spawn_sync(session.clone(), stop_sync.clone(), shutdown.clone());
    let intake = spawn_intake(
        listener,
        IntakeState::new(tx),
        config.intake.max_body_bytes,
        shutdown.clone(),
    );
    info!(addr = %local_addr, "Intake listening");

    apply_profile(session.as_ref(), &ProfileSettings::from(config)).await;

    let dispatcher = Dispatcher::new(session.clone(), gate, DispatchPolicy::from(config));
    dispatcher.run(rx, shutdown.clone()).await;

    info!("Shutting down");
    shutdown.cancel();
    stop_sync.cancel();

    let sync_result = match sync.await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "Sync task did not finish cleanly");
            Ok(())
        }
    };

    if let Err(e) = session.close().await {
        warn!(error = %e, "Failed to close session");
    }

    let intake_result = match intake.await {
        Ok(result) => result.map_err(AppError::Server),
        Err(e) => Err(AppError::internal(e)),
    };

    sync_result.map_err(AppError::Sync)?;
    intake_result?;

    info!("Shutdown complete");
    Ok(())
}

/// Run background sync until `stop` fires; a sync failure shuts the whole process down
fn spawn_sync(
    session: Arc<dyn NetworkSession>,
    stop: CancellationToken,
    shutdown: CancellationToken,
) -> JoinHandle<SessionResult<()>> {
    tokio::spawn(async move {
        let result = session.run_sync(stop).await;
        if result.is_err() {
            shutdown.cancel();
        }
        result
    })
}

fn spawn_intake(
    listener: TcpListener,
    state: IntakeState,
    max_body_bytes: usize,
    shutdown: CancellationToken,
) -> JoinHandle<std::io::Result<()>> {
    let app = create_app(state, max_body_bytes);

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
    })
}
