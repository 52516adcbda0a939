mod bot_flow;
mod error;
mod knowledge;
mod provider;
mod router;
mod sessions;
mod settings;
mod transport;

use std::net::SocketAddr;
use std::sync::Arc;

use dotenv::dotenv;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::Dispatcher;
use teloxide::{Bot, dptree};

use crate::error::StartupError;
use crate::knowledge::KnowledgeBase;
use crate::provider::DashScopeClient;
use crate::router::ConversationRouter;
use crate::sessions::InMemorySessions;
use crate::settings::AppConfig;
use crate::transport::Webhook;

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    dotenv().ok();
    pretty_env_logger::init();

    log::info!("reading cfg, loading FAQ, doing initialization mumbo-jumbo...");

    let config = AppConfig::from_env()?;
    let knowledge = KnowledgeBase::load(&config.faq_path).await?;
    let provider = DashScopeClient::new(
        &config.dashscope_base_url,
        config.dashscope_api_key.clone(),
        config.dashscope_app_id.clone(),
    );

    let router = ConversationRouter::new(
        Arc::new(knowledge),
        Arc::new(provider),
        Arc::new(InMemorySessions::new()),
    );

    let webhook = Webhook {
        url: config.webhook_url()?,
        address: SocketAddr::from(([0, 0, 0, 0], config.port)),
        secret_token: config.webhook_secret_token.clone(),
    };

    let bot = Bot::new(&config.telegram_bot_token);

    log::info!("consultant bot started...");

    let dispatcher = Dispatcher::builder(bot.clone(), bot_flow::schema())
        .dependencies(dptree::deps![router])
        .error_handler(LoggingErrorHandler::with_custom_text(
            "Exception while handling an update",
        ))
        .enable_ctrlc_handler()
        .build();

    webhook.run(dispatcher, bot).await?;

    log::info!("consultant bot stopped...");
    Ok(())
}
