//! IQtec sunblind covers for home automation hosts.
//!
//! This crate exposes motorized sunblinds connected to an IQtec controller as
//! cover entities with position and tilt control. Talking to the hardware is
//! left to a controller library behind the [`SunblindController`] trait; this
//! crate converts between the host's percentages and the device's native
//! units, polls the controller for state and dispatches cover commands.
//!
//! # Units
//!
//! The host side uses 0-100 with 100 meaning fully open. The device uses
//! 0-1000 for position and 0-[`SUNBLIND_FULL_TILT`] for tilt, with 0 meaning
//! fully open. See [`codec`].
//!
//! # Example
//!
//! ```no_run
//! use iqtec_cover::{setup, IntegrationConfig, MockController, SunblindController};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = IntegrationConfig::load("iqtec.toml")?;
//!
//!     // Build the controller handle for each configured hub
//!     let integration = setup(&config, |c| {
//!         Ok(Arc::new(MockController::new(&c.friendly_name)) as Arc<dyn SunblindController>)
//!     })?;
//!
//!     let shutdown = CancellationToken::new();
//!     let pollers = integration.spawn_pollers(&shutdown);
//!
//!     if let Some(cover) = integration.cover("SUNBLIND_1") {
//!         cover.set_cover_position(50)?;
//!         cover.set_cover_tilt_position(100)?;
//!     }
//!
//!     shutdown.cancel();
//!     for poller in pollers {
//!         poller.await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! Use [`MockController`] to test code without a controller on the network:
//!
//! ```
//! use iqtec_cover::{IqtecCover, MockController, UpdateCoordinator};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let mock = Arc::new(MockController::new("hub"));
//! let coordinator = Arc::new(UpdateCoordinator::new(mock.clone(), Duration::from_secs(1)));
//! let cover = IqtecCover::new(&coordinator, "SB1", "kitchen").unwrap();
//!
//! cover.close_cover().unwrap();
//! coordinator.tick().unwrap();
//! assert_eq!(cover.is_closed(), Some(true));
//! ```

#![warn(missing_docs)]

pub mod codec;
mod config;
mod controller;
mod cover;
mod error;
mod mock;
mod poller;
mod setup;
mod state;

// Re-export public API
pub use codec::SUNBLIND_FULL_TILT;
pub use config::{ControllerConfig, CoverConfig, IntegrationConfig};
pub use controller::SunblindController;
pub use cover::{CoverFeatures, DeviceClass, IqtecCover};
pub use error::{ConfigError, ControllerError, SetupError, UpdateFailed};
pub use mock::{MockCommand, MockController};
pub use poller::{DEFAULT_UPDATE_INTERVAL, PollPhase, UpdateCoordinator, UpdateListener};
pub use setup::{ControllerEntry, Integration, setup};
pub use state::{CoverState, SunblindState};
