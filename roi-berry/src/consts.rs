//! 通用常量.

/// 掩模像素取值.
pub mod mask {
    /// 掩模中 "保留" (可见, 尚未被涂抹) 的像素值. 切片创建时所有像素均为该值.
    pub const KEPT: f32 = 1.0;

    /// 掩模中 "被涂抹" (移除) 的像素值.
    pub const REMOVED: f32 = 0.0;

    /// 导出体数据时写入 header 的 `cal_min`.
    pub const CAL_MIN: f32 = 0.0;

    /// 导出体数据时写入 header 的 `cal_max`.
    pub const CAL_MAX: f32 = 1.0;

    /// 像素是否处于保留状态?
    #[inline]
    pub fn is_kept(p: f32) -> bool {
        p == KEPT
    }

    /// 像素是否已被涂抹?
    #[inline]
    pub fn is_removed(p: f32) -> bool {
        p == REMOVED
    }
}

/// RGBA 颜色.
pub mod rgba {
    /// 激活图高亮色 (红色, 不透明).
    pub const ACTIVATION_RED: [u8; 4] = [255, 0, 0, 255];

    /// 掩模高亮色 (蓝色, 不透明).
    pub const MASK_BLUE: [u8; 4] = [0, 0, 255, 255];

    /// 不透明黑色.
    pub const BLACK: [u8; 4] = [0, 0, 0, 255];
}

/// 画笔默认半径. 半径为 1 时覆盖 3 × 3 邻域.
pub const DEFAULT_BRUSH_RADIUS: usize = 1;

/// 缩放倍率下限.
pub const MIN_SCALE: f64 = 0.5;

/// 缩放倍率上限.
pub const MAX_SCALE: f64 = 2.0;

/// 单步放大倍率 (+25%).
pub const ZOOM_IN_STEP: f64 = 1.25;

/// 单步缩小倍率.
pub const ZOOM_OUT_STEP: f64 = 0.8;

/// 每个切片默认保留的撤销步数.
pub const DEFAULT_UNDO_DEPTH: usize = 16;
