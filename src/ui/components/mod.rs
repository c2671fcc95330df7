pub mod date_input;
pub mod notice;
pub mod popup;
