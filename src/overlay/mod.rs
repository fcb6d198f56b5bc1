pub(crate) mod binding;
pub(crate) mod strategy;
