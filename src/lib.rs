pub mod assistant;
pub mod cli;
pub mod config;
pub mod history;
pub mod llm;
pub mod models;
pub mod server;
pub mod upload;

use assistant::Assistant;
use cli::Args;
use llm::chat::new_client as new_chat_client;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let llm_config = args.llm_config()?;

    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Chat LLM Type: {}", llm_config.llm_type);
    info!(
        "Chat Base URL: {}",
        llm_config.base_url.as_deref().unwrap_or(llm_config.llm_type.default_base_url())
    );
    info!("Model: {}", args.model_name);
    info!("Request Timeout: {}s", args.request_timeout_secs);
    info!("Max Upload Bytes: {}", args.max_upload_bytes);
    info!("Max Body Bytes: {}", args.max_body_bytes);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let chat_client = new_chat_client(&llm_config)?;
    let assistant = Arc::new(Assistant::new(chat_client, args.max_upload_bytes));

    let addr = args.server_addr.clone();
    let server = Server::new(addr, assistant, args.clone());
    server.run().await?;

    Ok(())
}
