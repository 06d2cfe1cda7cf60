//! Service command implementations

use crate::broker::{AmqpConnector, Connector};
use crate::cli::{BrokerServeArgs, DashboardArgs, ServeArgs};
use crate::config::{RelayConfig, ServerConfig, RABBIT_HOST_ENV};
use crate::consumer::{self, ConsumerState, MessageLog, Subscriber};
use crate::dashboard::{self, DashboardState, ReportPoller, Snapshot};
use crate::logging::init_tracing;
use crate::publisher::{self, PublisherState};
use axum::Router;
use std::error::Error;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Load configuration with CLI overrides
pub fn load_config_with_overrides(args: &ServeArgs) -> Result<RelayConfig, Box<dyn Error>> {
    // Load from file if it exists, otherwise use defaults
    let mut config = if args.config.exists() {
        RelayConfig::load(Some(&args.config))?
    } else {
        tracing::debug!("Config file not found, using defaults");
        RelayConfig::default()
    };

    config = config.with_env_overrides();

    // CLI overrides (highest priority)
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ref host) = args.host {
        config.server.host = host.clone();
    }
    if let Some(ref log_level) = args.log_level {
        config.logging.level = log_level.clone();
    }

    Ok(config)
}

/// Load configuration for a broker-backed service, applying `--rabbit-host`.
pub fn load_broker_config(args: &BrokerServeArgs) -> Result<RelayConfig, Box<dyn Error>> {
    let mut config = load_config_with_overrides(&args.serve)?;
    if let Some(ref rabbit_host) = args.rabbit_host {
        config.broker.host = rabbit_host.clone();
    }
    Ok(config)
}

/// Validate the final configuration and start logging.
fn prepare(config: RelayConfig) -> Result<RelayConfig, Box<dyn Error>> {
    config.validate()?;
    init_tracing(&config.logging)?;
    Ok(config)
}

/// Bind the service's HTTP listener.
pub async fn bind(server: &ServerConfig) -> std::io::Result<TcpListener> {
    let addr = server.addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "HTTP server listening");
    Ok(listener)
}

/// Wait for shutdown signal (SIGINT or SIGTERM), then cancel the token.
pub async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install CTRL+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
        _ = cancel_token.cancelled() => return,
    }

    cancel_token.cancel();
}

/// Serve `app` until the token is cancelled. Cancels the token on return so
/// background tasks sharing it stop with the server.
pub async fn serve_until_cancelled(
    listener: TcpListener,
    app: Router,
    cancel_token: CancellationToken,
) -> std::io::Result<()> {
    let shutdown = cancel_token.clone();
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await;
    cancel_token.cancel();
    result
}

/// Publisher service over an already-bound listener.
pub async fn serve_publisher(
    config: &RelayConfig,
    connector: Arc<dyn Connector>,
    listener: TcpListener,
    cancel_token: CancellationToken,
) -> Result<(), Box<dyn Error>> {
    let state = Arc::new(PublisherState::new(
        connector,
        config.broker.queue.clone(),
        config.broker.connect_policy(),
    ));
    let app = publisher::create_router(state);

    serve_until_cancelled(listener, app, cancel_token).await?;
    Ok(())
}

/// Consumer service over an already-bound listener.
///
/// Returns an error when the subscription fails for good (connect retries
/// exhausted, queue declaration refused, delivery stream lost). The HTTP
/// server is stopped in that case too.
pub async fn serve_consumer(
    config: &RelayConfig,
    connector: Arc<dyn Connector>,
    listener: TcpListener,
    cancel_token: CancellationToken,
) -> Result<(), Box<dyn Error>> {
    let log = Arc::new(MessageLog::new());
    let subscription = Subscriber::new(
        connector,
        config.broker.queue.clone(),
        config.broker.connect_policy(),
        Arc::clone(&log),
    )
    .start(cancel_token.clone());

    let app = consumer::create_router(Arc::new(ConsumerState::new(log)));

    let supervised = {
        let cancel_token = cancel_token.clone();
        async move {
            let outcome = subscription.await;
            cancel_token.cancel();
            outcome
        }
    };

    let (served, subscribed) =
        tokio::join!(serve_until_cancelled(listener, app, cancel_token), supervised);

    if let Err(e) = subscribed? {
        tracing::error!(error = %e, "Subscriber stopped");
        return Err(e.into());
    }
    served?;
    Ok(())
}

/// Dashboard service over an already-bound listener.
pub async fn serve_dashboard(
    poller: ReportPoller,
    state: Arc<DashboardState>,
    listener: TcpListener,
    cancel_token: CancellationToken,
) -> Result<(), Box<dyn Error>> {
    let poller_handle = poller.start(cancel_token.clone());
    let app = dashboard::create_router(state);

    let served = serve_until_cancelled(listener, app, cancel_token).await;

    tracing::info!("Waiting for report poller to stop");
    poller_handle.await?;
    served?;
    Ok(())
}

/// `relay publisher`
pub async fn run_publisher(args: BrokerServeArgs) -> Result<(), Box<dyn Error>> {
    let config = prepare(load_broker_config(&args)?)?;

    if args.rabbit_host.is_none() && std::env::var(RABBIT_HOST_ENV).is_err() {
        tracing::warn!(
            host = %config.broker.host,
            "{} is not set, using broker host from configuration",
            RABBIT_HOST_ENV
        );
    }

    tracing::info!(queue = %config.broker.queue, "Starting publisher");
    tracing::debug!(?config, "Loaded configuration");

    let connector = Arc::new(AmqpConnector::new(&config.broker));
    let listener = bind(&config.server).await?;
    let cancel_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel_token.clone()));

    serve_publisher(&config, connector, listener, cancel_token).await?;

    tracing::info!("Publisher stopped");
    Ok(())
}

/// `relay consumer`
pub async fn run_consumer(args: BrokerServeArgs) -> Result<(), Box<dyn Error>> {
    let config = prepare(load_broker_config(&args)?)?;

    tracing::info!(queue = %config.broker.queue, "Starting consumer");
    tracing::debug!(?config, "Loaded configuration");

    let connector = Arc::new(AmqpConnector::new(&config.broker));
    let listener = bind(&config.server).await?;
    let cancel_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel_token.clone()));

    serve_consumer(&config, connector, listener, cancel_token).await?;

    tracing::info!("Consumer stopped");
    Ok(())
}

/// `relay dashboard`
pub async fn run_dashboard(args: DashboardArgs) -> Result<(), Box<dyn Error>> {
    let mut config = load_config_with_overrides(&args.serve)?;
    if let Some(ref url) = args.report_url {
        config.dashboard.report_url = url.clone();
    }
    let config = prepare(config)?;

    tracing::info!(report_url = %config.dashboard.report_url, "Starting dashboard");
    tracing::debug!(?config, "Loaded configuration");

    let snapshot = Arc::new(Snapshot::new());
    let poller = ReportPoller::new(&config.dashboard, Arc::clone(&snapshot))?;
    let state = Arc::new(DashboardState::new(
        snapshot,
        config.dashboard.report_url.clone(),
    ));

    let listener = bind(&config.server).await?;
    let cancel_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel_token.clone()));

    serve_dashboard(poller, state, listener, cancel_token).await?;

    tracing::info!("Dashboard stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::MemoryBroker;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn args(config: PathBuf) -> ServeArgs {
        ServeArgs {
            config,
            port: None,
            host: None,
            log_level: None,
        }
    }

    async fn local_listener() -> TcpListener {
        TcpListener::bind("127.0.0.1:0").await.unwrap()
    }

    fn fast_config() -> RelayConfig {
        let mut config = RelayConfig::default();
        config.broker.connect_attempts = 2;
        config.broker.connect_delay_seconds = 0;
        config
    }

    #[test]
    fn test_config_loading_from_file() {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "[broker]\nqueue = \"otra\"").unwrap();

        let config = load_config_with_overrides(&args(temp.path().to_path_buf())).unwrap();
        assert_eq!(config.broker.queue, "otra");
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let config =
            load_config_with_overrides(&args(PathBuf::from("/nonexistent/relay.toml"))).unwrap();
        assert_eq!(config.broker.queue, "hello");
    }

    #[test]
    fn test_cli_args_override_file() {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "[server]\nport = 8080\nhost = \"0.0.0.0\"").unwrap();

        let args = ServeArgs {
            port: Some(9000),
            host: Some("127.0.0.1".to_string()),
            log_level: Some("debug".to_string()),
            ..args(temp.path().to_path_buf())
        };

        let config = load_config_with_overrides(&args).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_rabbit_host_flag_overrides_broker_host() {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "[broker]\nhost = \"from-file\"").unwrap();

        let args = BrokerServeArgs {
            serve: args(temp.path().to_path_buf()),
            rabbit_host: Some("rabbit".to_string()),
        };

        let config = load_broker_config(&args).unwrap();
        assert_eq!(config.broker.host, "rabbit");
    }

    #[test]
    fn test_invalid_config_file_is_an_error() {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "[server\nport = ").unwrap();

        assert!(load_config_with_overrides(&args(temp.path().to_path_buf())).is_err());
    }

    #[tokio::test]
    async fn test_serve_until_cancelled_stops() {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(serve_until_cancelled(
            local_listener().await,
            Router::new(),
            cancel.clone(),
        ));

        cancel.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_signal_returns_when_already_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), shutdown_signal(cancel))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_consumer_fails_when_broker_unreachable() {
        let broker = MemoryBroker::new();
        broker.fail_next_connects(10);
        let cancel = CancellationToken::new();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            serve_consumer(
                &fast_config(),
                Arc::new(broker.clone()),
                local_listener().await,
                cancel.clone(),
            ),
        )
        .await
        .unwrap();

        assert!(result.is_err());
        assert_eq!(broker.connect_attempts(), 2);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_consumer_stops_cleanly_on_cancel() {
        let broker = MemoryBroker::new();
        let cancel = CancellationToken::new();
        let config = fast_config();
        let listener = local_listener().await;

        let stopper = {
            let broker = broker.clone();
            let cancel = cancel.clone();
            async move {
                while !broker.is_consumed("hello") {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                cancel.cancel();
            }
        };

        let (result, _) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(
                serve_consumer(&config, Arc::new(broker.clone()), listener, cancel.clone()),
                stopper
            )
        })
        .await
        .unwrap();

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_publisher_stops_on_cancel() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            serve_publisher(
                &fast_config(),
                Arc::new(MemoryBroker::new()),
                local_listener().await,
                cancel,
            ),
        )
        .await
        .unwrap();

        assert!(result.is_ok());
    }
}
