use teloxide::prelude::*;
use teloxide::types::{ButtonRequest, KeyboardButton, KeyboardMarkup, WebAppInfo};
use teloxide::utils::command::BotCommands;

use crate::bot::commands::{bookings, Command};
use crate::bot::handlers::BotContext;

const WELCOME: &str = "📚 Welcome!\n\nTap the button below to pick a date and time for your lesson.\nUse /mybookings to see your bookings and /help for all commands.";

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    ctx: BotContext,
) -> ResponseResult<()> {
    match cmd {
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string()).await?;
        }
        Command::Start => {
            handle_start(bot, msg, &ctx).await?;
        }
        Command::MyBookings => {
            bookings::handle_my_bookings(bot, msg, &ctx).await?;
        }
        Command::Cancel { booking_id } => {
            bookings::handle_cancel(bot, msg, booking_id, &ctx).await?;
        }
    }
    Ok(())
}

async fn handle_start(bot: Bot, msg: Message, ctx: &BotContext) -> ResponseResult<()> {
    let mut request = bot.send_message(msg.chat.id, WELCOME);

    // Only a reply-keyboard Web App button makes Telegram deliver `web_app_data`
    if let Some(raw_url) = &ctx.webapp_url {
        match raw_url.parse() {
            Ok(url) => {
                let button = KeyboardButton::new("📅 Book a lesson")
                    .request(ButtonRequest::WebApp(WebAppInfo { url }));
                request = request.reply_markup(KeyboardMarkup::new(vec![vec![button]]));
            }
            Err(e) => tracing::warn!("WEBAPP_URL '{}' is not a valid URL: {}", raw_url, e),
        }
    }

    request.await?;
    Ok(())
}
