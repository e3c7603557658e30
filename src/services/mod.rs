pub mod api;
pub mod health;
pub mod ledger;
pub mod notifier;
