pub mod book;
pub mod contacts;
pub mod error;
pub mod photos;
pub mod router;
pub mod store;
