//! 切片合成: 灰度底图, 激活高亮, 掩模高亮, 最后按倍率缩放.

use crate::config::Palette;
use crate::data::rotate::flip;
use crate::data::{max_finite, IntensityWindow};
use crate::slice::{SliceMask, SliceOverlay};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use itertools::izip;
use ndarray::{Array2, ArrayView2};

/// 切片合成器.
///
/// 除构造时给定的全局最大强度和高亮色外, 输出完全由输入决定.
#[derive(Copy, Clone, Debug)]
pub struct SliceCompositor {
    global_max: f32,
    palette: Palette,
}

/// 叠加权重, 取值 `[0, 1]`. NaN 视为 0.
#[inline]
fn weight(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// 以 `w * alpha` 的不透明度把 `color` 混合到 `px` 上. `px` 始终保持不透明.
#[inline]
fn blend(px: &mut [u8; 4], color: [u8; 4], w: f32) {
    let alpha = w * color[3] as f32 / 255.0;
    if alpha <= 0.0 {
        return;
    }
    for c in 0..3 {
        let mixed = px[c] as f32 * (1.0 - alpha) + color[c] as f32 * alpha;
        px[c] = mixed.round().clamp(0.0, 255.0) as u8;
    }
}

/// 缩放后的图像尺寸: `max(1, round(scale * d))`.
///
/// 与单纯的 `round(scale * d)` 不同, 每条边至少保留 1 个像素, 以免产生空图像.
pub fn scaled_dims((width, height): (u32, u32), scale: f64) -> (u32, u32) {
    let f = |d: u32| (d as f64 * scale).round().max(1.0) as u32;
    (f(width), f(height))
}

impl SliceCompositor {
    /// `global_max` 为整个体数据的最大强度, 在切片自身最大值为 0 时用于归一化.
    #[inline]
    pub fn new(global_max: f32, palette: Palette) -> Self {
        Self {
            global_max,
            palette,
        }
    }

    /// 全局最大强度.
    #[inline]
    pub fn global_max(&self) -> f32 {
        self.global_max
    }

    /// 高亮色.
    #[inline]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// 选择灰度归一化窗口: 切片自身最大值非零时使用它, 否则使用全局最大值.
    /// 两者都无法构成合法窗口 (如全零体数据) 时返回 `None`, 此时底图为全黑.
    pub fn window_for(&self, intensity: ArrayView2<'_, f32>) -> Option<IntensityWindow> {
        let plane_max = max_finite(intensity.iter());
        let max = if plane_max != 0.0 {
            plane_max
        } else {
            self.global_max
        };
        IntensityWindow::from_max(max)
    }

    /// 合成并按 `scale` 缩放. 输出尺寸见 [`scaled_dims`]:
    /// 一般为 `round(scale * d)`, 但每条边至少为 1 像素, 即使 `round` 的结果为 0.
    ///
    /// `intensity`, `overlay` 与 `mask` 须位于同一显示坐标系, 形状不一致时 panic.
    pub fn render(
        &self,
        intensity: ArrayView2<'_, f32>,
        overlay: Option<&SliceOverlay>,
        mask: &SliceMask,
        scale: f64,
    ) -> RgbaImage {
        debug_assert!(scale > 0.0);
        let img = self.compose(intensity, overlay, mask);
        let (nw, nh) = scaled_dims(img.dimensions(), scale);
        if (nw, nh) == img.dimensions() {
            img
        } else {
            imageops::resize(&img, nw, nh, FilterType::Nearest)
        }
    }

    /// 以原始分辨率合成. 激活高亮在下, 掩模高亮在上.
    pub fn compose(
        &self,
        intensity: ArrayView2<'_, f32>,
        overlay: Option<&SliceOverlay>,
        mask: &SliceMask,
    ) -> RgbaImage {
        assert_eq!(intensity.dim(), mask.shape(), "强度平面与掩模形状不一致");
        let (height, width) = mask.shape();
        let window = self.window_for(intensity);
        let activation = match overlay {
            Some(ov) => {
                assert_eq!(ov.shape(), mask.shape(), "叠加层与掩模形状不一致");
                ov.activation()
            }
            None => Array2::zeros(mask.shape()),
        };

        let mut buf = RgbaImage::new(width as u32, height as u32);
        for (((h, w), &v), &a, &m) in izip!(intensity.indexed_iter(), activation.iter(), mask.iter())
        {
            let gray = window.and_then(|win| win.eval(v)).unwrap_or(0);
            let mut px = [gray, gray, gray, u8::MAX];
            blend(&mut px, self.palette.activation, weight(a));
            blend(&mut px, self.palette.mask, weight(flip(m)));
            buf.put_pixel(w as u32, h as u32, Rgba(px));
        }
        buf
    }
}
