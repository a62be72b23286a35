use super::SliceMask;
use crate::data::rotate::{flip, invert_in_place, rot90};
use crate::Idx2d;
use ndarray::{Array2, ArrayView2, Zip};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 单个切片的激活图叠加层, 与 [`SliceMask`] 共享显示坐标系.
///
/// 存储值为 `|a - 1|`, 其中 `a` 为旋转后的激活强度. 因此激活越弱, 存储值越接近 1.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct SliceOverlay {
    data: Array2<f32>,
}

impl SliceOverlay {
    /// 由 nifti 平面 (形状 `(X, Y)`) 构造叠加层: 先逆时针旋转 90 度, 再逐像素取 `|v - 1|`.
    pub fn from_activation(plane: ArrayView2<'_, f32>) -> Self {
        let mut data = rot90(plane);
        invert_in_place(&mut data);
        Self { data }
    }

    /// 还原激活强度 (再次取 `|v - 1|`).
    #[inline]
    pub fn activation(&self) -> Array2<f32> {
        self.data.mapv(flip)
    }

    /// 以叠加层与 `mask` 合成新的掩模:
    ///
    /// `|(|overlay - 1| * |mask - 1|) - 1|`.
    ///
    /// 对二值输入而言, 被涂抹且位于激活区域内的像素保持涂抹状态,
    /// 其余像素均恢复为保留. 该运算是幂等的.
    ///
    /// 若 `mask` 形状与叠加层不一致, 则程序 panic.
    pub fn overlap_into(&self, mask: &SliceMask) -> SliceMask {
        assert_eq!(self.shape(), mask.shape(), "叠加层与掩模形状不一致");
        let mut out = Array2::zeros(self.shape());
        Zip::from(&mut out)
            .and(&self.data)
            .and(mask.array_view())
            .for_each(|o, &ov, &m| *o = flip(flip(ov) * flip(m)));
        SliceMask::from_raw(out)
    }

    /// 获得底层数据的一份不可变 shallow copy.
    #[inline]
    pub fn array_view(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }

    /// 叠加层的形状 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }
}
