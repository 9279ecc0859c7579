use dsm_cluster::cluster::config::ClusterConfig;
use dsm_cluster::cluster::node::DsmNode;
use dsm_cluster::cluster::types::NodeId;
use dsm_cluster::net::handlers::router;
use dsm_cluster::net::http::HttpMessenger;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 5 {
        eprintln!("Usage: {} --node-id <n> --config <path>", args[0]);
        eprintln!("Example: {} --node-id 0 --config cluster.conf", args[0]);
        std::process::exit(1);
    }

    let mut node_id: Option<u32> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--node-id" => {
                node_id = Some(args[i + 1].parse()?);
                i += 2;
            }
            "--config" => {
                config_path = Some(args[i + 1].clone().into());
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    let Some(node_id) = node_id.map(NodeId) else {
        anyhow::bail!("--node-id is required");
    };
    let Some(config_path) = config_path else {
        anyhow::bail!("--config is required");
    };

    let config = ClusterConfig::load(&config_path)?;
    let identity = config.identity_for(node_id)?;
    let my_port = config
        .get(node_id)
        .map(|info| info.port)
        .unwrap_or_default();

    tracing::info!(
        "Starting DSM node {} of {}",
        node_id,
        config.total_nodes()
    );
    for info in config.nodes.values() {
        if info.id != node_id {
            tracing::info!("  peer {} at {}", info.id, info.address());
        }
    }

    // The messenger owns a blocking HTTP client; build it off the async
    // runtime, where it will also be used.
    let node = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || -> anyhow::Result<Arc<DsmNode>> {
            let messenger = Arc::new(HttpMessenger::new(node_id, &config)?);
            Ok(Arc::new(DsmNode::new(identity, messenger)))
        })
        .await??
    };

    // Periodic stats reporter.
    let stats_node = node.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(5));

        loop {
            interval.tick().await;
            let snapshot = stats_node.snapshot();
            tracing::info!("Local store: {} object(s)", snapshot.len());
            for (key, bytes) in snapshot {
                let role = stats_node.role_for(&key.as_str().into());
                tracing::info!("  - '{}' {} ({} bytes)", key, role, bytes.len());
            }
        }
    });

    let bind_addr: SocketAddr = format!("0.0.0.0:{}", my_port).parse()?;
    tracing::info!("HTTP server listening on {}", bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, router(node)).await?;

    Ok(())
}
