use futures::StreamExt;
use mimalloc::MiMalloc;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use upstairs::admin::ConnectionsPanel;
use upstairs::config::{BrowsePath, Config};
use upstairs::tree::{ExpansionTracker, LazyTreeDataSource, LoadState, NodeKey, TreeNode};
use upstairs::utils::logging::init_tracing;
use upstairs::{UpstairsClient, UpstairsError};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load()?;
    init_tracing(&cfg.basic.loglevel);

    info!(
        api_root = %cfg.basic.api_root,
        api_token = if cfg.basic.api_token.is_some() { "<set>" } else { "<none>" },
        proxy = %cfg.backend.proxy.as_ref().map_or("<none>", |u| u.as_str()),
        enable_multiplexing = cfg.backend.enable_multiplexing,
        loglevel = %cfg.basic.loglevel,
        expand = ?cfg.browser.expand,
    );

    let client = UpstairsClient::from_config(&cfg)?;
    let tracker = ExpansionTracker::new();
    let tree = LazyTreeDataSource::spawn(Arc::new(client.clone()), tracker.clone()).await?;

    let result = tokio::select! {
        result = browse(&cfg, client, &tree) => result,
        () = shutdown_signal() => {
            info!("Interrupted, shutting down.");
            Ok(())
        }
    };

    tree.detach().await?;
    tree.stop();
    result?;
    Ok(())
}

async fn browse(
    cfg: &Config,
    client: UpstairsClient,
    tree: &LazyTreeDataSource,
) -> Result<(), UpstairsError> {
    let mut snapshots = tree.connect(futures::stream::pending())?;
    // Initial (empty) list.
    snapshots.next().await;

    let mut connections = ConnectionsPanel::new(client, tree.clone());
    connections.load().await?;

    let timeout = cfg.browser.settle_timeout();
    for path in cfg.browser.paths() {
        if let Err(e) = expand_path(tree, &path, timeout).await {
            warn!(path = %path.key(), error = %e, "Could not expand browser path");
        }
    }

    let snapshot = tree.snapshot().await?;
    print_tree(&snapshot, tree.tracker());
    Ok(())
}

async fn expand_path(
    tree: &LazyTreeDataSource,
    path: &BrowsePath,
    timeout: std::time::Duration,
) -> Result<(), UpstairsError> {
    let mut keys = vec![NodeKey::database(&path.database)];
    if path.schema.is_some() {
        keys.push(path.key());
    }

    for key in keys {
        tree.tracker().expand(key.clone());
        let node = tree.wait_until_settled(&key, timeout).await?;
        if let LoadState::Failed(message) = node.state {
            return Err(UpstairsError::UnexpectedError(message));
        }
    }
    Ok(())
}

fn print_tree(nodes: &[TreeNode], tracker: &ExpansionTracker) {
    for node in nodes {
        let marker = match (node.is_expandable(), tracker.is_expanded(&node.key())) {
            (false, _) => ' ',
            (true, true) => '-',
            (true, false) => '+',
        };
        let suffix = match &node.state {
            LoadState::Loading => " (loading)".to_string(),
            LoadState::Failed(message) => format!(" (failed: {message})"),
            LoadState::Idle | LoadState::Loaded => String::new(),
        };
        println!(
            "{:indent$}{marker} {}{suffix}",
            "",
            node.display_name(),
            indent = node.level() * 2
        );
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
