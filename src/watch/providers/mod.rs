pub mod listing_html;
pub mod scripted;
