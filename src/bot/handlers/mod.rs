pub mod message;
pub mod web_app;

use std::sync::Arc;
use teloxide::{dispatching::UpdateHandler, prelude::*};

use crate::services::ledger::SlotLedger;
use crate::services::notifier::Notifier;
use crate::utils::datetime::Clock;

pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Everything a bot endpoint needs to act on bookings.
#[derive(Clone)]
pub struct BotContext {
    pub ledger: SlotLedger,
    pub notifier: Notifier,
    pub clock: Arc<dyn Clock>,
    pub webapp_url: Option<String>,
}

pub struct BotHandler {
    pub ctx: BotContext,
}

impl BotHandler {
    pub fn new(ctx: BotContext) -> Self {
        Self { ctx }
    }

    pub fn schema(&self) -> UpdateHandler<HandlerError> {
        let ctx = self.ctx.clone();
        let ctx_web_app = self.ctx.clone();

        dptree::entry()
            .branch(
                Update::filter_message()
                    .filter_command::<crate::bot::commands::Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: crate::bot::commands::Command| {
                        let ctx = ctx.clone();
                        async move {
                            message::command_handler(bot, msg, cmd, ctx).await?;
                            Ok::<(), HandlerError>(())
                        }
                    }),
            )
            .branch(
                Update::filter_message()
                    .filter(|msg: Message| web_app::web_app_payload(&msg).is_some())
                    .endpoint(move |bot: Bot, msg: Message| {
                        let ctx = ctx_web_app.clone();
                        async move {
                            web_app::web_app_data_handler(bot, msg, ctx).await?;
                            Ok::<(), HandlerError>(())
                        }
                    }),
            )
    }
}
