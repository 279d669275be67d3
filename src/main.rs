use std::sync::Arc;

use fen_board::startup::run_startup_checks;
use fen_board::state::AppState;
use fen_board::{AppConfig, ShutdownManager, build_app};

#[tokio::main]
async fn main() {
    // Load config
    let config = match AppConfig::load() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            eprintln!("Config init failed: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("fen_board={},tower_http=info", config.logging.level).into()
            }),
        )
        .init();

    let shutdown_manager = ShutdownManager::new();
    if let Err(e) = shutdown_manager.start_signal_handler() {
        tracing::error!("信号处理器启动失败: {}", e);
        std::process::exit(1);
    }

    // Run startup checks
    let report = run_startup_checks(&config);
    if !report.cache_ready {
        tracing::warn!("缓存目录不可用，所有请求都将实时渲染");
    }

    let state = match AppState::new(config.clone()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("渲染流水线初始化失败: {}", e);
            std::process::exit(1);
        }
    };
    let app = build_app(state);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Bind address failed {}: {}", addr, e);
            std::process::exit(1);
        });

    tracing::info!("Server: http://{}", addr);
    tracing::info!("Health: http://{}/health", addr);
    tracing::info!("Board API: http://{}{}/board", addr, config.api.prefix);
    tracing::info!("Cache: {:?}", config.cache_path());
    tracing::info!("Sprites: {:?}", config.sprite_path());

    let shutdown_timeout = config.shutdown.timeout_duration();
    let manager = shutdown_manager.clone();
    let graceful = axum::serve(listener, app).with_graceful_shutdown(async move {
        let reason = manager.wait_for_shutdown().await;
        tracing::info!("接收到退出信号: {:?}，开始优雅关闭HTTP服务器...", reason);
    });

    // 收到退出信号后最多再等待 timeout_secs
    let server = tokio::spawn(async move { graceful.await });
    let result = tokio::select! {
        res = server => res,
        _ = async {
            shutdown_manager.wait_for_shutdown().await;
            tokio::time::sleep(shutdown_timeout).await;
        } => {
            tracing::warn!("优雅退出超时，强制退出");
            std::process::exit(1);
        }
    };

    match result {
        Ok(Ok(())) => tracing::info!("服务器已优雅关闭"),
        Ok(Err(e)) => {
            tracing::error!("服务器运行错误: {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("服务器任务异常退出: {}", e);
            std::process::exit(1);
        }
    }
}
