pub mod handlers;

pub use handlers::{CliNavigator, Context, NOT_LOGGED_IN, ReportFormat};
