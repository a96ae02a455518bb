//! Server Implementation
//!
//! HTTP 服务器启动和管理

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::core::{BackgroundTasks, Config, Result, ServerState, TaskKind};
use crate::ledger::{Ledger, sweeper};
use crate::services::https::build_router;
use crate::utils::logger;

/// HTTP Server
pub struct Server {
    config: Config,
    state: Option<ServerState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Create server with existing state
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    pub async fn run(&self) -> Result<()> {
        let state = match &self.state {
            Some(s) => s.clone(),
            None => ServerState::initialize(&self.config).await?,
        };

        let mut tasks = BackgroundTasks::new();
        register_background_tasks(&state, &mut tasks);
        tasks.log_summary();

        let app = build_router(state.clone());
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let grace = self.config.shutdown_timeout();

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            tracing::info!("Shutting down...");
            shutdown_handle.graceful_shutdown(Some(grace));
        });

        tracing::info!(
            public_base_url = %self.config.public_base_url,
            "🚀 Hub server listening on {}",
            addr
        );
        let served = axum_server::bind(addr)
            .handle(handle)
            .serve(app.into_make_service())
            .await;

        tasks.shutdown(grace).await;
        served?;
        Ok(())
    }
}

/// 注册后台任务：过期订单清理、日志清理、订单事件日志
fn register_background_tasks(state: &ServerState, tasks: &mut BackgroundTasks) {
    let token = tasks.shutdown_token();
    tasks.spawn(
        "order_sweeper",
        TaskKind::Periodic,
        sweeper::run_sweeper(state.ledger.clone(), state.config.sweep_interval(), token),
    );

    let token = tasks.shutdown_token();
    tasks.spawn(
        "log_cleanup",
        TaskKind::Periodic,
        logger::periodic_cleanup(state.config.log_dir(), token),
    );

    let token = tasks.shutdown_token();
    tasks.spawn(
        "order_event_log",
        TaskKind::Listener,
        log_order_events(state.ledger.clone(), token),
    );
}

/// 订单状态变化写入日志 (target `order_events`)
async fn log_order_events(ledger: Arc<Ledger>, shutdown: CancellationToken) {
    let mut events = ledger.subscribe();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            received = events.recv() => match received {
                Ok(event) => tracing::info!(
                    target: "order_events",
                    order_id = event.order_id,
                    status = event.status.as_str(),
                    timestamp = event.timestamp,
                    "Order status changed"
                ),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Order event log lagged");
                }
                Err(RecvError::Closed) => return,
            },
        }
    }
}

/// Ctrl+C 或 SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
