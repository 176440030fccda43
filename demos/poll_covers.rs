//! Example: Poll two sunblinds and drive them through a failing hub.
//!
//! Run with: `RUST_LOG=debug cargo run --example poll_covers`

use iqtec_cover::{IntegrationConfig, MockController, SunblindController, setup};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const CONFIG: &str = r#"
[[iqtec]]
host = "192.168.1.20"
friendly_name = "living_room"

[[iqtec.covers]]
address = "SUNBLIND_1"
friendly_name = "south window"

[[iqtec.covers]]
address = "SUNBLIND_2"
"#;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (optional)
    env_logger::init();

    // Use a config file if one is given
    let config = match std::env::args().nth(1) {
        Some(path) => IntegrationConfig::load(path)?,
        None => IntegrationConfig::from_toml_str(CONFIG)?,
    };

    let hub = Arc::new(MockController::new("living_room"));
    let integration = setup(&config, |_| Ok(hub.clone() as Arc<dyn SunblindController>))?;

    let shutdown = CancellationToken::new();
    let pollers = integration.spawn_pollers(&shutdown);

    if let Some(cover) = integration.cover("SUNBLIND_1") {
        cover.set_cover_position(30)?;
        cover.set_cover_tilt_position(50)?;
    }
    tokio::time::sleep(Duration::from_millis(1500)).await;
    print_covers(&integration);

    println!("Hub goes offline...");
    hub.fail_refresh("connection refused");
    tokio::time::sleep(Duration::from_secs(2)).await;
    print_covers(&integration);

    hub.recover();
    tokio::time::sleep(Duration::from_secs(1)).await;
    print_covers(&integration);

    shutdown.cancel();
    for poller in pollers {
        poller.await?;
    }
    Ok(())
}

fn print_covers(integration: &iqtec_cover::Integration) {
    for cover in integration.covers() {
        match cover.state() {
            Some(state) => println!(
                "{} ({}): position={}%, tilt={}%, available={}",
                cover.name(),
                cover.address(),
                state.position,
                state.tilt,
                cover.available()
            ),
            None => println!("{} ({}): no state yet", cover.name(), cover.address()),
        }
    }
}
