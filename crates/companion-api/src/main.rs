use companion_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (registry, storage, routes)
    let (_state, router) = companion_api::setup::initialize_app(config.clone()).await?;

    // Start the server
    companion_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
