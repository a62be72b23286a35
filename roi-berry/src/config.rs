//! 显示与编辑参数.

use crate::consts::{self, rgba};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 合成图像使用的两种高亮色.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    /// 激活区域的颜色 (RGBA). alpha 通道决定覆盖强度.
    pub activation: [u8; 4],

    /// 掩模被涂抹区域的颜色 (RGBA), 绘制在激活色之上.
    pub mask: [u8; 4],
}

impl Default for Palette {
    #[inline]
    fn default() -> Self {
        Self {
            activation: rgba::ACTIVATION_RED,
            mask: rgba::MASK_BLUE,
        }
    }
}

/// 一次编辑会话的参数集合.
///
/// 该结构对用户完全透明, 修改后应调用 [`ViewConfig::validate`] 检查.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ViewConfig {
    /// 画笔半径 (网格像素). 半径 `r` 覆盖 `(2r + 1)²` 邻域.
    pub brush_radius: usize,

    /// 缩放倍率下限. 缩放操作不会越过该值.
    pub min_scale: f64,

    /// 缩放倍率上限. 缩放操作不会越过该值.
    pub max_scale: f64,

    /// 单步放大倍率.
    pub zoom_in_step: f64,

    /// 单步缩小倍率.
    pub zoom_out_step: f64,

    /// 每个切片保留的撤销步数. 为 0 时禁用撤销.
    pub undo_depth: usize,

    /// 高亮色.
    pub palette: Palette,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            brush_radius: consts::DEFAULT_BRUSH_RADIUS,
            min_scale: consts::MIN_SCALE,
            max_scale: consts::MAX_SCALE,
            zoom_in_step: consts::ZOOM_IN_STEP,
            zoom_out_step: consts::ZOOM_OUT_STEP,
            undo_depth: consts::DEFAULT_UNDO_DEPTH,
            palette: Palette::default(),
        }
    }
}

impl ViewConfig {
    /// 检查参数是否合理. 不合理时返回对应的说明.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(self.min_scale.is_finite() && self.min_scale > 0.0) {
            return Err("缩放下限必须为正数");
        }
        if !(self.max_scale.is_finite() && self.max_scale >= self.min_scale) {
            return Err("缩放上限必须不小于下限");
        }
        if !self.scale_in_range(1.0) {
            return Err("缩放区间必须包含原始尺寸 1");
        }
        if !(self.zoom_in_step > 1.0 && self.zoom_in_step.is_finite()) {
            return Err("放大倍率必须大于 1");
        }
        if !(0.0 < self.zoom_out_step && self.zoom_out_step < 1.0) {
            return Err("缩小倍率必须位于 (0, 1)");
        }
        Ok(())
    }

    /// 倍率 `scale` 是否位于允许的缩放区间内.
    #[inline]
    pub fn scale_in_range(&self, scale: f64) -> bool {
        (self.min_scale..=self.max_scale).contains(&scale)
    }
}
