use teloxide::Bot;
use teloxide::dispatching::UpdateHandler;
use teloxide::macros::BotCommands;
use teloxide::prelude::*;

use crate::router::ConversationRouter;

pub const GREETING: &str = "Привет! Я бот ОО 'Белорусский союз дизайнеров'. Как я могу помочь?";

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    Start,
}

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

pub fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    use dptree::case;

    dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .branch(case![Command::Start].endpoint(start)),
        )
        .branch(
            Update::filter_message()
                .filter(|msg: Message| is_plain_text(msg.text()))
                .endpoint(chat_msg),
        )
}

/// Text that isn't a command. Stickers, photos and unknown commands are left unanswered.
fn is_plain_text(text: Option<&str>) -> bool {
    text.map_or(false, |txt| !txt.starts_with('/'))
}

pub async fn chat_msg(bot: Bot, msg: Message, router: ConversationRouter) -> HandlerResult {
    let msg_txt = msg.text().unwrap_or("");
    log::info!("msg from {}: {}", msg.chat.id, msg_txt);

    let reply = router.reply_to(msg.chat.id, msg_txt).await?;
    bot.send_message(msg.chat.id, reply).await?;

    Ok(())
}

pub async fn start(bot: Bot, msg: Message) -> HandlerResult {
    let user_name = msg.from().map(|u| u.full_name()).unwrap_or("unknown".to_string());
    log::info!("{} {} started", user_name, msg.chat.id);

    bot.send_message(msg.chat.id, GREETING).await?;
    Ok(())
}
