use std::sync::Arc;

use shutter_service::ShutterService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<ShutterService>,
}
impl AppState {
	pub fn new(config: shutter_config::Config) -> color_eyre::Result<Self> {
		let service = ShutterService::new(config)?;

		Ok(Self { service: Arc::new(service) })
	}

	pub fn from_service(service: Arc<ShutterService>) -> Self {
		Self { service }
	}
}
