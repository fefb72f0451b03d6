pub mod auth;
pub mod dashboard;
pub mod navigation;
pub mod report;
pub mod row;
pub mod sync;
pub mod validate;

pub use auth::{AuthAction, AuthForm, AuthOutcome};
pub use dashboard::{AddOutcome, DashboardController, DashboardState, DeleteOutcome, MountOutcome, Phase};
pub use navigation::{Navigator, RecordingNavigator, Route};
pub use row::{Liveness, ViewRow};
pub use sync::{SyncOutcome, synchronize};
pub use validate::{ValidationError, validate_target_url};

pub fn print_banner() {
    use colored::Colorize;

    let banner = r#"
  _   _ ______        ___  _____ ____ _   _
 | | | |  _ \ \      / / \|_   _/ ___| | | |
 | | | | |_) \ \ /\ / / _ \ | || |   | |_| |
 | |_| |  __/ \ V  V / ___ \| || |___|  _  |
  \___/|_|     \_/\_/_/   \_\_| \____|_| |_|
"#;
    println!("{}", banner.bright_green().bold());
    println!(
        "  {} {}\n",
        "site uptime monitor".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
