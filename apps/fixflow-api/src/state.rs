use std::sync::Arc;

use fixflow_service::FixflowService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<FixflowService>,
}
impl AppState {
	/// Loads the embedding model and opens the store. Either failing aborts startup.
	pub async fn new(config: fixflow_config::Config) -> color_eyre::Result<Self> {
		let service = FixflowService::connect(config).await?;

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: FixflowService) -> Self {
		Self { service: Arc::new(service) }
	}
}
