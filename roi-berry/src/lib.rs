#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 在 nii 模板体数据上逐切片手工编辑二值 ROI 掩模, 可选叠加激活图.
//!
//! 该 crate 不依赖任何 GUI 框架. UI 层负责事件循环, 通过
//! [`VolumeStack`] 的同步方法 (或 [`command`] 中的命令分发) 驱动编辑.
//!
//! # 注意
//!
//! 1. 掩模位于显示坐标系, 即 nifti 平面逆时针旋转 90 度, 形状为 `(Y, X)`.
//!   导出时再旋转回 nifti 平面.
//! 2. 激活约束 ([`VolumeStack::make_overlap`]) 与导出时的取反严格按照
//!   `|v - 1|` 代数实现, 不做语义上的 "修正".
//! 3. 所有可恢复的错误都以 [`EditError`] 返回; 出错后会话保持原状.
//!
//! # 开发计划
//!
//! ### 模板 / 激活图加载与形状校验 ✅
//!
//! 实现位于 `roi-berry/src/data`.
//!
//! ### 画笔 (方形邻域, 越界裁剪) ✅
//!
//! 实现位于 `roi-berry/src/slice/brush.rs`.
//!
//! ### 激活约束与掩模导出 ✅
//!
//! 实现位于 `roi-berry/src/stack.rs`.
//!
//! ### 切片合成与缩放 ✅
//!
//! 灰度底图, 红色激活高亮, 蓝色掩模高亮.
//!
//! 实现位于 `roi-berry/src/compose.rs`.
//!
//! ### 撤销 ✅
//!
//! 每个切片保留若干份压缩快照.
//!
//! ### 命令分发 ✅
//!
//! 实现位于 `roi-berry/src/command.rs`.

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// nii 体数据与 I/O.
pub mod data;

/// 单切片掩模与叠加层.
pub mod slice;

pub mod command;
pub mod compose;
pub mod config;
pub mod consts;
pub mod error;
pub mod prelude;
pub mod stack;

pub use command::{Action, Command, Outcome};
pub use compose::SliceCompositor;
pub use config::{Palette, ViewConfig};
pub use data::{IntensityWindow, NiftiHeaderAttr, NiftiIo, NiiVolume, VolumeIo};
pub use error::{EditError, EditResult, LoadError, WriteError};
pub use slice::{CompactMask, SliceMask, SliceOverlay};
pub use stack::{BrushMode, SessionState, SliceModel, VolumeStack};
