use inkwell::api;
use inkwell::logger::*;
use inkwell::server::*;
use inkwell::settings::*;
use std::fs;
use std::sync::Arc;
use tokio::signal;
use warp::Filter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    info!(?project_settings);
    logger.reload_from_config(&LogConfig::from(&project_settings.log))?;

    let address: std::net::SocketAddr = project_settings.http.address.parse()?;
    let tls = match (&project_settings.http.cert_path, &project_settings.http.key_path) {
        (Some(cert), Some(key)) => {
            for path in [cert, key] {
                if !fs::metadata(path)?.is_file() {
                    return Err(anyhow::anyhow!("TLS file is not a regular file: {:?}", path));
                }
            }
            Some((cert.clone(), key.clone()))
        }
        (None, None) => None,
        _ => return Err(anyhow::anyhow!("http.cert_path and http.key_path go together")),
    };

    fs::create_dir_all(&project_settings.upload.dir)?;
    let server = Arc::new(Server::try_new(&project_settings).await?);

    let api_v1 = warp::path("api")
        .and(warp::path("v1"))
        .and(api::v1::routes(server.clone()));
    let uploads = warp::path("uploads").and(warp::fs::dir(project_settings.upload.dir.clone()));

    // parse_settings has already validated the origin
    let cors = match &project_settings.http.cors_origin {
        Some(origin) => warp::cors().allow_origin(origin.as_str()),
        None => warp::cors().allow_any_origin(),
    }
    .allow_credentials(true)
    .allow_methods(["GET", "POST", "PUT", "DELETE", "OPTIONS"])
    .allow_headers(["authorization", "content-type"]);

    let routes = api_v1
        .or(uploads)
        .recover(api::v1::recover_error)
        .with(cors)
        .with(warp::trace::request());

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("could not listen for SIGINT: {}", e);
        }
    };
    info!(%address, tls = tls.is_some(), "listening");
    match tls {
        Some((cert, key)) => {
            warp::serve(routes)
                .tls()
                .cert_path(cert)
                .key_path(key)
                .bind_with_graceful_shutdown(address, shutdown)
                .1
                .await
        }
        None => {
            warp::serve(routes)
                .bind_with_graceful_shutdown(address, shutdown)
                .1
                .await
        }
    }

    let shutdown_timeout = std::time::Duration::from_secs(100);
    match tokio::time::timeout(shutdown_timeout, server.shutdown()).await {
        Ok(_) => info!("server shutdown successfully"),
        Err(_) => error!("server shutdown timed out"),
    }

    Ok(())
}
