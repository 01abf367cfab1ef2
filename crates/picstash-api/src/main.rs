mod api_doc;
mod constants;
mod error;
mod handlers;
mod middleware;
mod services;
mod setup;
mod state;
mod task_handlers;
mod telemetry;
mod utils;

use picstash_core::Config;

// Use mimalloc as the global allocator for better performance and lower fragmentation,
// especially when running on musl-based systems inside containers.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (database, storage, services, queue, routes)
    let (_state, router, queue) = crate::setup::initialize_app(config.clone()).await?;

    // Start the server; returns after graceful shutdown and queue drain
    crate::setup::server::start_server(&config, router, queue).await?;

    Ok(())
}
