pub mod app;
pub mod formatters;
