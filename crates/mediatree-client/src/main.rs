use mediatree_client::app::{session_path, App};
use mediatree_client::logging;
use mediatree_proto::{config::Config, platform};
use tracing::{info, warn};

/// `mediatree [server-address [renderer]]`; arguments override the config file.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = Config::load()?;
    let mut args = std::env::args().skip(1);
    if let Some(address) = args.next() {
        config.server.address = address;
    }
    if let Some(renderer) = args.next() {
        config.player.renderer = renderer;
    }

    std::fs::create_dir_all(platform::data_dir())?;
    let log_rx = logging::init(&platform::log_path())?;
    info!("mediatree starting, server {}", config.server.address);

    let token = match std::fs::read_to_string(session_path()) {
        Ok(token) => token.trim().to_string(),
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("could not read session: {}", e);
            }
            String::new()
        }
    };

    App::new(config, &token).run(log_rx).await
}
