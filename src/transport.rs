use std::convert::Infallible;
use std::net::SocketAddr;

use axum::Router;
use axum::routing::get;
use teloxide::Bot;
use teloxide::dispatching::{DefaultKey, Dispatcher};
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::update_listeners::{UpdateListener, webhooks};
use url::Url;

use crate::error::StartupError;

type BotError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Telegram posts updates to `url`; we listen for them on `address`.
pub struct Webhook {
    pub url: Url,
    pub address: SocketAddr,
    pub secret_token: Option<String>,
}

impl Webhook {
    pub async fn run(
        self,
        mut dispatcher: Dispatcher<Bot, BotError, DefaultKey>,
        bot: Bot,
    ) -> Result<(), StartupError> {
        let listener = webhook_listener(bot, self.url, self.address, self.secret_token).await?;
        dispatcher
            .dispatch_with_listener(
                listener,
                LoggingErrorHandler::with_custom_text("An error from the update listener"),
            )
            .await;

        Ok(())
    }
}

pub fn health_routes() -> Router {
    Router::new().route("/health", get(|| async { "ok" }))
}

fn webhook_options(url: Url, address: SocketAddr, secret_token: Option<String>) -> webhooks::Options {
    let options = webhooks::Options::new(address, url);
    match secret_token {
        Some(token) => options.secret_token(token),
        None => options,
    }
}

/// Registers `url` with Telegram, replacing whatever webhook was there before,
/// and serves it on `address` from a separate task. Pending updates are kept.
/// Without a configured secret token teloxide generates a random one.
async fn webhook_listener(
    bot: Bot,
    url: Url,
    address: SocketAddr,
    secret_token: Option<String>,
) -> Result<impl UpdateListener<Err = Infallible>, StartupError> {
    let options = webhook_options(url.clone(), address, secret_token);
    let (mut listener, stop_flag, app) = webhooks::axum_to_router(bot, options).await?;
    log::info!("webhook set to {}", url);

    let stop_token = listener.stop_token();
    let app = app.merge(health_routes());

    tokio::spawn(async move {
        log::info!("listening on {}", address);
        let served = axum::Server::bind(&address)
            .serve(app.into_make_service())
            .with_graceful_shutdown(stop_flag)
            .await;

        if let Err(err) = served {
            log::error!("webhook listener failed: {}", err);
            stop_token.stop();
        }
    });

    Ok(listener)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hook_url() -> Url {
        Url::parse("https://bot.example.com/webhook").unwrap()
    }

    #[test]
    fn keeps_updates_queued_while_down() {
        let options = webhook_options(hook_url(), SocketAddr::from(([0, 0, 0, 0], 8080)), None);

        assert!(!options.drop_pending_updates);
        assert_eq!(options.url, hook_url());
        assert_eq!(options.address.port(), 8080);
    }

    #[test]
    fn passes_configured_secret_token() {
        let options = webhook_options(
            hook_url(),
            SocketAddr::from(([0, 0, 0, 0], 8080)),
            Some("s3cret".to_string()),
        );

        assert_eq!(options.secret_token.as_deref(), Some("s3cret"));
        assert!(!options.drop_pending_updates);
    }

    #[tokio::test]
    async fn health_answers_ok() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::Server::from_tcp(listener)
                .unwrap()
                .serve(health_routes().into_make_service())
                .await
                .unwrap();
        });

        let body = reqwest::get(format!("http://{}/health", address))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();

        assert_eq!(body, "ok");
    }
}
