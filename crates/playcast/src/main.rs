use std::sync::Arc;

use dirsource::DirSource;
use streamer::{SourceProvider, StreamServer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let root =
        std::env::var("PLAYCAST_DIR").expect("PLAYCAST_DIR must be set to the directory to serve");
    let host = std::env::var("PLAYCAST_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PLAYCAST_PORT")
        .unwrap_or_else(|_| "1337".to_string())
        .parse()
        .expect("PLAYCAST_PORT must be a port number");
    let path = std::env::var("PLAYCAST_PATH").unwrap_or_else(|_| "/".to_string());

    let source = Arc::new(DirSource::new(root));
    source.spawn_scan();

    let mut builder = SourceProvider::builder();

    // Optional MIME prefix filter, e.g. PLAYCAST_MIME_FILTER=video/ keeps
    // only entries that guess to a video type.
    if let Ok(prefix) = std::env::var("PLAYCAST_MIME_FILTER") {
        builder = builder.with_filter(move |entry| {
            mime_guess::from_path(&entry.name)
                .first()
                .map(|mime| mime.essence_str().starts_with(&prefix))
                .unwrap_or(false)
        });
    }

    let provider = builder.build(source);

    tracing::info!(
        "open the stream in a media player: http://localhost:{}{}",
        port,
        path
    );

    if let Err(e) = StreamServer::new(Arc::new(provider))
        .with_path(path)
        .serve(&host, port)
        .await
    {
        tracing::error!("server exited: {}", e);
    }
}
