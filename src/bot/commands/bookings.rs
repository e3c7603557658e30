use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::bot::handlers::BotContext;
use crate::utils::markup::{booking_list_message, ledger_error_message};

pub async fn handle_my_bookings(bot: Bot, msg: Message, ctx: &BotContext) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let owner_id = user.id.0 as i64;

    tracing::info!("My bookings requested by user {} in chat {}", owner_id, msg.chat.id.0);

    match ctx.ledger.list_for_owner(owner_id, ctx.clock.now()).await {
        Ok(bookings) => {
            bot.send_message(msg.chat.id, booking_list_message(&bookings))
                .parse_mode(ParseMode::Html)
                .await?;
        }
        Err(e) => {
            tracing::error!("Failed to list bookings for user {}: {}", owner_id, e);
            bot.send_message(msg.chat.id, ledger_error_message(&e)).await?;
        }
    }

    Ok(())
}

pub async fn handle_cancel(
    bot: Bot,
    msg: Message,
    booking_id: String,
    ctx: &BotContext,
) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let owner_id = user.id.0 as i64;
    let booking_id = booking_id.trim();

    if booking_id.is_empty() {
        bot.send_message(msg.chat.id, "Usage: /cancel <booking_id>\nSee /mybookings for ids.")
            .await?;
        return Ok(());
    }

    match ctx.ledger.cancel(booking_id, owner_id).await {
        // The notifier confirms to the owner, so no extra reply here
        Ok(booking) => ctx.notifier.booking_cancelled(&booking).await,
        Err(e) => {
            bot.send_message(msg.chat.id, ledger_error_message(&e)).await?;
        }
    }

    Ok(())
}
