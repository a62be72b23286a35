use crate::Idx2d;

/// 画笔邻域迭代器.
///
/// 以行优先规则迭代以 `(x, y)` 为中心、半径为 `radius` 的方形邻域中,
/// **落在网格内** 的所有 `(行, 列)` 索引. 越界部分在构造时即被裁剪,
/// 因此迭代过程不会产生任何越界索引.
#[derive(Debug, Clone)]
pub struct BrushIter {
    cur_h: usize,
    cur_w: usize,
    h_lo: usize,
    w_lo: usize,
    h_hi: usize,
    w_hi: usize,
}

/// 将 `[c - r, c + r]` 与 `[0, len)` 求交. 交集为空时返回 `None`.
#[inline]
fn clip(c: isize, r: usize, len: usize) -> Option<(usize, usize)> {
    let r = r.min(isize::MAX as usize) as isize;
    let lo = c.saturating_sub(r).max(0);
    let hi = c.saturating_add(r).min(len as isize - 1);
    (len > 0 && lo <= hi).then_some((lo as usize, hi as usize))
}

impl BrushIter {
    /// 在形状为 `(height, width)` 的网格上构造以 `(x, y)` 为中心的邻域迭代器.
    /// `x` 为列, `y` 为行.
    pub fn new((x, y): (isize, isize), radius: usize, (height, width): Idx2d) -> Self {
        match (clip(y, radius, height), clip(x, radius, width)) {
            (Some((h_lo, h_hi)), Some((w_lo, w_hi))) => Self {
                cur_h: h_lo,
                cur_w: w_lo,
                h_lo,
                w_lo,
                h_hi,
                w_hi,
            },
            // 空迭代器.
            _ => Self {
                cur_h: 1,
                cur_w: 0,
                h_lo: 0,
                w_lo: 0,
                h_hi: 0,
                w_hi: 0,
            },
        }
    }
}

impl Iterator for BrushIter {
    type Item = Idx2d;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cur_h > self.h_hi {
            return None;
        }
        let ret_pos = (self.cur_h, self.cur_w);
        if self.cur_w == self.w_hi {
            self.cur_w = self.w_lo;
            self.cur_h += 1;
        } else {
            self.cur_w += 1;
        }
        Some(ret_pos)
    }
}
