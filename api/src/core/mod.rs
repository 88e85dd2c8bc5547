pub mod app_state;
pub mod health;
pub mod http;
