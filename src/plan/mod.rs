pub(crate) mod scales;
pub(crate) mod tiling;
