pub(crate) mod chat;
pub(crate) mod config;
pub(crate) mod orders;
pub(crate) mod serve;
