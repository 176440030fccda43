//! Composition of controllers, coordinators and covers from configuration.

use crate::config::{ControllerConfig, IntegrationConfig};
use crate::controller::SunblindController;
use crate::cover::IqtecCover;
use crate::error::{ControllerError, SetupError};
use crate::poller::UpdateCoordinator;

use log::{debug, error, info};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A controller that was set up, with its coordinator and covers.
pub struct ControllerEntry {
    host: String,
    coordinator: Arc<UpdateCoordinator>,
    covers: Vec<Arc<IqtecCover>>,
}

impl ControllerEntry {
    /// Host address from the configuration.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The controller's poll coordinator.
    pub fn coordinator(&self) -> &Arc<UpdateCoordinator> {
        &self.coordinator
    }

    /// Covers attached to this controller, in configuration order.
    pub fn covers(&self) -> &[Arc<IqtecCover>] {
        &self.covers
    }
}

/// The composed object graph handed to the host.
pub struct Integration {
    controllers: Vec<ControllerEntry>,
}

impl Integration {
    /// Every controller that was set up, in configuration order.
    pub fn controllers(&self) -> &[ControllerEntry] {
        &self.controllers
    }

    /// Every cover of every controller.
    pub fn covers(&self) -> impl Iterator<Item = &Arc<IqtecCover>> {
        self.controllers.iter().flat_map(|c| c.covers.iter())
    }

    /// First cover with the given device address.
    pub fn cover(&self, address: &str) -> Option<&Arc<IqtecCover>> {
        self.covers().find(|c| c.address() == address)
    }

    /// Spawn one poll loop per controller on the current tokio runtime.
    ///
    /// The loops stop when `shutdown` is cancelled.
    pub fn spawn_pollers(&self, shutdown: &CancellationToken) -> Vec<JoinHandle<()>> {
        self.controllers
            .iter()
            .map(|entry| {
                tokio::spawn(entry.coordinator.clone().run(shutdown.clone()))
            })
            .collect()
    }
}

/// Set up every configured controller.
///
/// `connect` builds the controller handle for one controller configuration.
/// A controller whose connection or cover registration fails is logged and
/// skipped; the others are still set up.
///
/// # Errors
///
/// [`SetupError::NoControllers`] if no controller could be set up.
///
/// # Example
///
/// ```
/// use iqtec_cover::{setup, IntegrationConfig, MockController, SunblindController};
/// use std::sync::Arc;
///
/// let config = IntegrationConfig::from_toml_str(r#"
///     [[iqtec]]
///     host = "10.0.0.5"
///     covers = [{ address = "SB1" }, { address = "SB2" }]
/// "#).unwrap();
///
/// let integration = setup(&config, |c| {
///     Ok(Arc::new(MockController::new(&c.friendly_name)) as Arc<dyn SunblindController>)
/// }).unwrap();
/// assert_eq!(integration.covers().count(), 2);
/// ```
pub fn setup<F>(config: &IntegrationConfig, mut connect: F) -> Result<Integration, SetupError>
where
    F: FnMut(&ControllerConfig) -> Result<Arc<dyn SunblindController>, ControllerError>,
{
    let mut controllers = Vec::with_capacity(config.controllers.len());

    for controller_config in &config.controllers {
        match setup_controller(controller_config, &mut connect) {
            Ok(entry) => {
                debug!(
                    "IQtec controller {} is set to: {}",
                    entry.host,
                    controllers.len()
                );
                controllers.push(entry);
            }
            Err(e) => {
                error!(
                    "Unable to setup controller {}: {}",
                    controller_config.host, e
                );
            }
        }
    }

    if controllers.is_empty() {
        return Err(SetupError::NoControllers);
    }
    info!("IQtec integration set up with {} controller(s)", controllers.len());
    Ok(Integration { controllers })
}

fn setup_controller<F>(
    config: &ControllerConfig,
    connect: &mut F,
) -> Result<ControllerEntry, ControllerError>
where
    F: FnMut(&ControllerConfig) -> Result<Arc<dyn SunblindController>, ControllerError>,
{
    let controller = connect(config)?;
    let coordinator = Arc::new(UpdateCoordinator::new(controller, config.poll_interval()));

    let covers = config
        .covers
        .iter()
        .map(|cover| IqtecCover::new(&coordinator, &cover.address, &cover.friendly_name))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ControllerEntry {
        host: config.host.clone(),
        coordinator,
        covers,
    })
}
