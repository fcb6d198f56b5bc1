pub(crate) mod compositor;
pub(crate) mod dual_band;
