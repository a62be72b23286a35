//! 切片平面的旋转与极性翻转.
//!
//! nifti 平面以 `(x, y)` 索引. 显示平面由其逆时针旋转 90 度得到,
//! 形状为 `(Y, X)`, 即 `out[(r, c)] = plane[(c, Y - 1 - r)]`.

use ndarray::{Array2, ArrayView2, Axis};

/// 将平面逆时针旋转 90 度. 结果为标准 (行优先) 布局.
pub fn rot90<A: Clone>(plane: ArrayView2<'_, A>) -> Array2<A> {
    let mut v = plane.reversed_axes();
    v.invert_axis(Axis(0));
    v.as_standard_layout().into_owned()
}

/// 将平面顺时针旋转 90 度 (即连续三次 [`rot90`]), 抵消一次 [`rot90`].
pub fn rot270<A: Clone>(plane: ArrayView2<'_, A>) -> Array2<A> {
    let mut v = plane.reversed_axes();
    v.invert_axis(Axis(1));
    v.as_standard_layout().into_owned()
}

/// 就地执行 `v -> |v - 1|`.
#[inline]
pub fn invert_in_place(plane: &mut Array2<f32>) {
    plane.mapv_inplace(flip);
}

/// `|v - 1|`. 对 {0, 1} 取值即为逻辑非.
#[inline]
pub fn flip(v: f32) -> f32 {
    (v - 1.0).abs()
}
