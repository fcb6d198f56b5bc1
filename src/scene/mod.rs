pub(crate) mod graph;
pub(crate) mod plane;
pub(crate) mod queue;
