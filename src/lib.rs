mod app;
pub mod application;
pub mod domain;
pub mod infrastructure;
mod interfaces;

pub use app::run;
