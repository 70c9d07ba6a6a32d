//! HTTP entry point for the EPrints lookup service.
//!
//! # Responsibility
//! - Load settings, start logging and hand every request to
//!   `eprint_core::dispatch` on the blocking pool.
//! - Close every repository pool on ctrl-c or SIGTERM.
//!
//! # Invariants
//! - No routing or lookup logic lives here; all paths go through one
//!   fallback handler.

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use clap::Parser;
use eprint_core::db::bootstrap::{install_schema, REFERENCE_SCHEMA};
use eprint_core::db::open_db;
use eprint_core::{
    dispatch, init_logging, init_stderr_logging, Config, Reply, Request, ServiceContext,
};
use log::{error, info};
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "eprint_apid", version, about = "Lookup service over EPrints SQLite repositories")]
struct Args {
    /// JSON settings document.
    #[arg(default_value = "settings.json")]
    settings: String,

    /// Install the reference schema into every configured repository, then exit.
    #[arg(long)]
    init_schema: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let config = match Config::load(&args.settings) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("eprint_apid: {}: {err}", args.settings);
            return ExitCode::FAILURE;
        }
    };

    let logfile = config.logfile.trim();
    let logging = if logfile.is_empty() {
        init_stderr_logging(&config.log_level)
    } else {
        init_logging(&config.log_level, logfile)
    };
    if let Err(err) = logging {
        eprintln!("eprint_apid: {err}");
        return ExitCode::FAILURE;
    }

    if args.init_schema {
        return init_schema(&config);
    }
    serve(config).await
}

fn init_schema(config: &Config) -> ExitCode {
    let mut status = ExitCode::SUCCESS;
    for (id, repository) in &config.repositories {
        let result = open_db(&repository.dsn)
            .and_then(|mut conn| install_schema(&mut conn, REFERENCE_SCHEMA));
        match result {
            Ok(()) => info!(
                "event=schema_init module=apid status=ok repository={id} dsn={}",
                repository.dsn
            ),
            Err(err) => {
                error!(
                    "event=schema_init module=apid status=error repository={id} error_code=install_failed error={err}"
                );
                eprintln!("eprint_apid: {id}: {err}");
                status = ExitCode::FAILURE;
            }
        }
    }
    status
}

async fn serve(config: Config) -> ExitCode {
    let hostname = config.hostname.clone();
    let ctx = match tokio::task::spawn_blocking(move || ServiceContext::build(config)).await {
        Ok(ctx) => Arc::new(ctx),
        Err(err) => {
            error!("event=service_build module=apid status=error error_code=build_panicked error={err}");
            return ExitCode::FAILURE;
        }
    };

    let listener = match tokio::net::TcpListener::bind(hostname.as_str()).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(
                "event=http_listen module=apid status=error hostname={hostname} error_code=bind_failed error={err}"
            );
            eprintln!("eprint_apid: cannot listen on {hostname}: {err}");
            ctx.close();
            return ExitCode::FAILURE;
        }
    };
    info!("event=http_listen module=apid status=ok hostname={hostname}");

    let app = Router::new().fallback(handle).with_state(Arc::clone(&ctx));
    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    ctx.close();
    match served {
        Ok(()) => {
            info!("event=http_stop module=apid status=ok");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("event=http_stop module=apid status=error error_code=serve_failed error={err}");
            ExitCode::FAILURE
        }
    }
}

async fn handle(
    State(ctx): State<Arc<ServiceContext>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let request = Request {
        method: method.as_str().to_string(),
        path: uri.path().to_string(),
        content_type,
        body: body.to_vec(),
        remote_addr: remote.to_string(),
    };

    match tokio::task::spawn_blocking(move || dispatch(&ctx, &request)).await {
        Ok(reply) => reply_response(reply),
        Err(err) => {
            error!("event=http_request module=apid status=500 error_code=handler_panicked error={err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "ERROR: 500 Internal Server Error",
            )
                .into_response()
        }
    }
}

fn reply_response(reply: Reply) -> Response {
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static(reply.content_type))],
        reply.body,
    )
        .into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("event=shutdown_signal module=apid status=error signal=ctrl_c error={err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!("event=shutdown_signal module=apid status=error signal=sigterm error={err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("event=shutdown_signal module=apid status=ok");
}
