//! 逐切片的掩模与激活图叠加层.

mod brush;
mod mask;
mod mirror;
mod overlay;

pub use brush::BrushIter;
pub use mask::SliceMask;
pub use mirror::{CompactMask, MaskMirror};
pub use overlay::SliceOverlay;
