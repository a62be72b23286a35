use super::brush::BrushIter;
use super::mirror::{CompactMask, MaskMirror};
use crate::consts::mask::*;
use crate::Idx2d;
use ndarray::iter::Iter;
use ndarray::{Array2, ArrayView2, Ix2};
use std::ops::Index;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 单个切片的二值掩模, 位于 **显示坐标系** (nifti 平面逆时针旋转 90 度).
///
/// 形状为 `(高, 宽) = (Y, X)`. 像素值 [`KEPT`] 代表保留, [`REMOVED`] 代表已被涂抹.
/// 创建时所有像素均为 [`KEPT`].
///
/// 掩模仅接受 **未缩放** 的网格坐标, 屏幕坐标到网格坐标的换算由调用方负责.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct SliceMask {
    data: Array2<f32>,
}

impl Index<Idx2d> for SliceMask {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl SliceMask {
    /// 创建宽 `width`, 高 `height` 的全保留掩模.
    #[inline]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: Array2::from_elem((height, width), KEPT),
        }
    }

    /// 直接初始化.
    #[inline]
    pub(crate) fn from_raw(data: Array2<f32>) -> Self {
        Self { data }
    }

    /// 以 `(x, y)` 为中心, 把半径为 `radius` 的方形邻域全部设置为 `value`.
    /// `x` 为列, `y` 为行. 越界部分被静默跳过.
    ///
    /// 返回实际被写入的像素个数.
    pub fn stamp(&mut self, x: isize, y: isize, radius: usize, value: f32) -> usize {
        let mut cnt = 0usize;
        for pos in BrushIter::new((x, y), radius, self.shape()) {
            self.data[pos] = value;
            cnt += 1;
        }
        cnt
    }

    /// 涂抹: 把邻域设置为 [`REMOVED`]. 返回实际被写入的像素个数.
    #[inline]
    pub fn paint(&mut self, x: isize, y: isize, radius: usize) -> usize {
        self.stamp(x, y, radius, REMOVED)
    }

    /// 擦除: 把邻域恢复为 [`KEPT`]. 返回实际被写入的像素个数.
    #[inline]
    pub fn erase(&mut self, x: isize, y: isize, radius: usize) -> usize {
        self.stamp(x, y, radius, KEPT)
    }

    /// 获得底层数据的一份不可变 shallow copy.
    #[inline]
    pub fn array_view(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }

    /// 获取可以迭代像素的迭代器 (行优先).
    #[inline]
    pub fn iter(&self) -> Iter<'_, f32, Ix2> {
        self.data.iter()
    }

    /// 获取给定位置 (行, 列) 的像素值. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, pos: Idx2d) -> Option<&f32> {
        self.data.get(pos)
    }

    /// 掩模的形状 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }

    /// 掩模的宽 (nifti 的 X).
    #[inline]
    pub fn width(&self) -> usize {
        self.shape().1
    }

    /// 掩模的高 (nifti 的 Y).
    #[inline]
    pub fn height(&self) -> usize {
        self.shape().0
    }

    /// 像素个数.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 被涂抹的像素个数.
    #[inline]
    pub fn count_removed(&self) -> usize {
        self.iter().filter(|p| is_removed(**p)).count()
    }

    /// 是否所有像素都处于保留状态?
    #[inline]
    pub fn is_pristine(&self) -> bool {
        self.iter().copied().all(is_kept)
    }

    /// 获取拥有所有权的镜像, 供以后可能的恢复.
    #[inline]
    pub fn mirror(&self) -> MaskMirror {
        self.into()
    }

    /// 用 `mirror` 覆写原本 `self` 的内容.
    ///
    /// 如果 `mirror` 大小与 `self.size()` 不符, 则程序 panic.
    pub fn resume(&mut self, mirror: &MaskMirror) {
        assert_eq!(self.size(), mirror.0.len(), "镜像大小不符");
        for (r, w) in mirror.0.iter().zip(self.data.iter_mut()) {
            *w = *r;
        }
    }

    /// 压缩存储.
    #[inline]
    pub fn compress(&self) -> CompactMask {
        CompactMask::compress(self)
    }

    /// 直接获得底层数据.
    #[inline]
    pub fn into_raw(self) -> Array2<f32> {
        self.data
    }
}
