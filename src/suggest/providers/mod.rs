pub mod google;

pub use google::GoogleSuggestProvider;
