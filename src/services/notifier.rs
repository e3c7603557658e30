use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::database::models::Booking;
use crate::utils::markup::{
    admin_cancelled_message, admin_created_message, admin_updated_message,
    user_cancelled_message, user_created_message, user_updated_message,
};

/// Sends booking state changes to the owner and the admin chat.
///
/// Delivery failures are logged and swallowed; a booking never fails because
/// a chat message could not be sent.
#[derive(Clone)]
pub struct Notifier {
    bot: Option<Bot>,
    admin_chat_id: Option<ChatId>,
}

impl Notifier {
    pub fn new(bot: Bot, admin_chat_id: Option<i64>) -> Self {
        Self {
            bot: Some(bot),
            admin_chat_id: admin_chat_id.map(ChatId),
        }
    }

    /// A notifier with no bot behind it, for tests and headless runs of the API.
    /// Every message is dropped with a debug log line.
    pub fn disabled() -> Self {
        Self {
            bot: None,
            admin_chat_id: None,
        }
    }

    async fn send(&self, chat_id: ChatId, text: String) -> bool {
        let Some(bot) = &self.bot else {
            tracing::debug!("Notifications disabled, dropping message for chat {}", chat_id.0);
            return false;
        };

        match bot.send_message(chat_id, text).parse_mode(ParseMode::Html).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Failed to send notification to chat {}: {}", chat_id.0, e);
                false
            }
        }
    }

    async fn notify(&self, booking: &Booking, user_text: String, admin_text: String) {
        self.send(ChatId(booking.owner_id), user_text).await;
        if let Some(admin) = self.admin_chat_id {
            self.send(admin, admin_text).await;
        }
    }

    pub async fn booking_created(&self, booking: &Booking) {
        self.notify(booking, user_created_message(booking), admin_created_message(booking))
            .await;
    }

    pub async fn booking_updated(&self, booking: &Booking) {
        self.notify(booking, user_updated_message(booking), admin_updated_message(booking))
            .await;
    }

    pub async fn booking_cancelled(&self, booking: &Booking) {
        self.notify(
            booking,
            user_cancelled_message(booking),
            admin_cancelled_message(booking),
        )
        .await;
    }
}
