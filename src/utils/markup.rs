//! HTML message bodies sent to Telegram.
//!
//! Every user-supplied value goes through [`escape`] because messages are sent
//! with `ParseMode::Html`.

use teloxide::utils::html::escape;

use crate::database::models::{Booking, BookingView};
use crate::error::LedgerError;
use crate::utils::datetime::format_date;

fn comment_or_none(comment: Option<&str>) -> String {
    match comment.map(str::trim) {
        Some(c) if !c.is_empty() => escape(c),
        _ => "none".to_string(),
    }
}

fn booking_lines(booking: &Booking) -> String {
    format!(
        "📚 Subject: {}\n📅 Date: {}\n⏰ Time: {}\n📋 Service: {}\n💬 Comment: {}",
        escape(&booking.subject),
        format_date(&booking.date),
        escape(&booking.time),
        escape(&booking.service),
        comment_or_none(booking.comment.as_deref()),
    )
}

fn owner_line(booking: &Booking) -> String {
    let name = [booking.first_name.as_deref(), booking.last_name.as_deref()]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let username = booking
        .username
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .map(|u| format!("@{}", escape(u)))
        .unwrap_or_else(|| "none".to_string());

    format!(
        "👤 User: {} (id {})\n📞 Username: {}",
        escape(&name),
        booking.owner_id,
        username
    )
}

pub fn user_created_message(booking: &Booking) -> String {
    format!("✅ <b>You are booked!</b>\n{}", booking_lines(booking))
}

pub fn admin_created_message(booking: &Booking) -> String {
    format!(
        "🎉 <b>New booking</b>\n{}\n{}\n🆔 <code>{}</code>",
        owner_line(booking),
        booking_lines(booking),
        escape(&booking.id)
    )
}

pub fn user_updated_message(booking: &Booking) -> String {
    format!("✏️ <b>Your booking was changed</b>\n{}", booking_lines(booking))
}

pub fn admin_updated_message(booking: &Booking) -> String {
    format!(
        "✏️ <b>Booking changed</b>\n{}\n{}\n🆔 <code>{}</code>",
        owner_line(booking),
        booking_lines(booking),
        escape(&booking.id)
    )
}

pub fn user_cancelled_message(booking: &Booking) -> String {
    format!(
        "❌ <b>Your booking was cancelled</b>\n📅 {} ⏰ {}\n📚 {}",
        format_date(&booking.date),
        escape(&booking.time),
        escape(&booking.subject)
    )
}

pub fn admin_cancelled_message(booking: &Booking) -> String {
    format!(
        "❌ <b>Booking cancelled</b>\n{}\n📅 {} ⏰ {}\n📚 {}",
        owner_line(booking),
        format_date(&booking.date),
        escape(&booking.time),
        escape(&booking.subject)
    )
}

pub fn booking_list_message(bookings: &[BookingView]) -> String {
    if bookings.is_empty() {
        return "📭 You have no bookings yet.".to_string();
    }

    let mut text = String::from("📋 <b>Your bookings</b>\n\n");
    for view in bookings {
        let marker = if view.can_modify { "🟢" } else { "⚪" };
        text.push_str(&format!(
            "{} {} {} · {} ({})\n🆔 <code>{}</code>\n\n",
            marker,
            format_date(&view.booking.date),
            escape(&view.booking.time),
            escape(&view.booking.subject),
            escape(&view.booking.service),
            escape(&view.booking.id)
        ));
    }
    text.push_str("💡 Cancel with /cancel &lt;id&gt;");
    text
}

/// Plain-text reply for a failed bot request.
pub fn ledger_error_message(error: &LedgerError) -> String {
    match error {
        LedgerError::Validation(e) => format!("❌ {e}"),
        LedgerError::Conflict { date, time } => format!(
            "⛔ {} at {} is already taken. Please choose another time.",
            format_date(date),
            time
        ),
        LedgerError::NotFound(_) => "❌ Booking not found.".to_string(),
        LedgerError::Forbidden(_) => "❌ You can only change your own bookings.".to_string(),
        LedgerError::Timeout(_) => "⏳ The service is busy, please try again.".to_string(),
        LedgerError::Database(_) => "❌ Something went wrong, please try again later.".to_string(),
    }
}
