//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d};

pub use crate::command::{Action, Command, Outcome};
pub use crate::config::{Palette, ViewConfig};
pub use crate::data::rotate::{rot270, rot90};
pub use crate::data::{IntensityWindow, NiftiHeaderAttr, NiftiIo, NiiVolume, VolumeIo};
pub use crate::error::{EditError, EditResult};
pub use crate::slice::{SliceMask, SliceOverlay};
pub use crate::stack::{BrushMode, SessionState, VolumeStack};

pub use crate::consts::mask::{KEPT, REMOVED};
