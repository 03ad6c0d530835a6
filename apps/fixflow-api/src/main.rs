use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = fixflow_api::Args::parse();

	fixflow_api::run(args).await
}
