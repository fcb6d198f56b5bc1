pub(crate) mod ar_session;
pub(crate) mod config;
pub(crate) mod notify;
pub(crate) mod status;
pub(crate) mod tracking;
