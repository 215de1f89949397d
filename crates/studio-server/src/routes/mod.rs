pub mod apps;
pub mod chat;
