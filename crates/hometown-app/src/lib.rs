pub mod app;
pub mod fetch;
pub mod present;
