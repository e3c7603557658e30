use serde::Deserialize;
use teloxide::prelude::*;
use teloxide::types::{MessageKind, MessageWebAppData};

use crate::bot::handlers::BotContext;
use crate::services::api::{BookingPayload, UserPayload};
use crate::utils::markup::ledger_error_message;

/// Body the mini-app posts through `Telegram.WebApp.sendData`.
#[derive(Debug, Deserialize)]
pub struct WebAppBooking {
    #[serde(default)]
    pub booking: BookingPayload,
}

/// Raw `sendData` string carried by a service message, if this is one.
pub fn web_app_payload(msg: &Message) -> Option<&str> {
    match &msg.kind {
        MessageKind::WebAppData(MessageWebAppData { web_app_data }) => Some(&web_app_data.data),
        _ => None,
    }
}

pub fn parse_web_app_booking(data: &str) -> Result<WebAppBooking, serde_json::Error> {
    serde_json::from_str(data)
}

/// Books the slot sent from the mini-app keyboard button on behalf of the sender.
pub async fn web_app_data_handler(bot: Bot, msg: Message, ctx: BotContext) -> ResponseResult<()> {
    let (Some(data), Some(user)) = (web_app_payload(&msg), msg.from()) else {
        return Ok(());
    };

    tracing::info!(
        "Web app booking received from user {} in chat {}",
        user.id.0,
        msg.chat.id.0
    );

    let payload = match parse_web_app_booking(data) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("Malformed web app payload from user {}: {}", user.id.0, e);
            bot.send_message(msg.chat.id, "❌ Could not read the booking form, please try again.")
                .await?;
            return Ok(());
        }
    };

    let owner = UserPayload {
        id: Some(user.id.0 as i64),
        first_name: Some(user.first_name.clone()),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
    };

    let new = match payload.booking.into_new_booking(owner) {
        Ok(new) => new,
        Err(e) => {
            bot.send_message(msg.chat.id, format!("❌ {e}")).await?;
            return Ok(());
        }
    };

    match ctx.ledger.reserve(new, ctx.clock.now()).await {
        Ok(booking) => ctx.notifier.booking_created(&booking).await,
        Err(e) => {
            bot.send_message(msg.chat.id, ledger_error_message(&e)).await?;
        }
    }

    Ok(())
}
