pub mod config;
pub mod countdown;
pub mod feed;
pub mod format;
pub mod http_client;
pub mod lists;
pub mod rank;
pub mod state;
pub mod throttle;
pub mod torn_api;
pub mod view;
