pub mod aggregate;
pub mod app;
pub mod config;
pub mod duplicates;
pub mod errors;
pub mod fetcher;
pub mod handlers;
pub mod models;
pub mod owners;
pub mod refresh;
pub mod state;
pub mod ui;
pub mod window;

pub use app::router;
pub use config::AppConfig;
pub use refresh::refresh;
pub use state::AppState;
