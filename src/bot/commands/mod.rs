pub mod bookings;

use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Booking bot commands:")]
pub enum Command {
    #[command(description = "Display this help message")]
    Help,
    #[command(description = "Open the booking app")]
    Start,
    #[command(description = "List your bookings")]
    MyBookings,
    #[command(description = "Cancel a booking by its id")]
    Cancel { booking_id: String },
}
