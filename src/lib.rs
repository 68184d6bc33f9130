pub mod clients;
pub mod ops;

mod app;
pub mod commands;
pub mod commit;
pub mod config;
pub mod error;
pub mod lock;
pub mod status;
pub mod sync;

pub use app::App;
pub use app::CONFLICT_ALERT_TITLE;
pub use app::RealApp;
pub use app::Settings;
pub use config::Config;
pub use error::SyncError;
pub use sync::SyncOutcome;

// Disable colors for all tests to get clean output
#[cfg(test)]
#[ctor::ctor]
fn init_tests() {
    colored::control::set_override(false);
}
