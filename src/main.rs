use polyport::{Config, Server};
use serde::Serialize;
use tokio::io::AsyncWriteExt;

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = match std::env::var("POLYPORT_CONFIG") {
        Ok(path) => Config::from_yaml_file(path)?,
        Err(_) => Config::load()?,
    };

    let mut server = Server::from_config(&cfg)?;
    server
        .get("/health", |_req, res| async move {
            res.json(&Health { status: "ok" })?;
            Ok(())
        })
        .post("/echo", |req, res| async move {
            res.send(req.body.to_vec());
            Ok(())
        })
        .on_socket(|conn| {
            let peer = conn.peer();
            let Some(stream) = conn.take() else {
                return;
            };
            tokio::spawn(async move {
                // Raw clients get their bytes back, sniffed prefix included.
                let (mut reader, mut writer) = tokio::io::split(stream);
                if let Err(e) = tokio::io::copy(&mut reader, &mut writer).await {
                    tracing::warn!(peer = %peer, error = %e, "Raw echo ended");
                }
                let _ = writer.shutdown().await;
            });
        })
        .on_error(|err| tracing::error!(error = %err, "Server error"));

    tokio::select! {
        res = server.start(|addr| tracing::info!("Ready on {}", addr)) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
