//! 编辑会话. 统一管理模板体数据以及每个切片的掩模和叠加层.
//!
//! 会话的生命周期为 `Closed -> TemplateLoaded [-> ActivationLoaded] -> Closed`.
//! 需要已打开会话的操作在 `Closed` 状态下返回 [`EditError::NotLoaded`].

use std::collections::VecDeque;
use std::path::Path;

use image::RgbaImage;
use log::{debug, info, warn};

use crate::compose::SliceCompositor;
use crate::config::ViewConfig;
use crate::consts::mask::{CAL_MAX, CAL_MIN, KEPT, REMOVED};
use crate::data::rotate::{flip, rot270};
use crate::data::{NiftiHeaderAttr, NiftiIo, NiiVolume, VolumeIo};
use crate::error::{EditError, EditResult};
use crate::slice::{CompactMask, SliceMask, SliceOverlay};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 会话状态. 所有 "某操作是否可用" 的判断都只由它导出.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// 未打开模板.
    Closed,

    /// 已打开模板, 未加载激活图.
    TemplateLoaded,

    /// 已打开模板并加载了激活图.
    ActivationLoaded,
}

impl SessionState {
    /// 是否已打开模板 (无论是否有激活图).
    #[inline]
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }
}

/// 画笔模式. 两者互斥.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum BrushMode {
    /// 涂抹 (置为移除).
    #[default]
    Paint,

    /// 擦除 (恢复为保留).
    Erase,
}

/// 单个切片的全部编辑状态.
#[derive(Clone, Debug)]
pub struct SliceModel {
    mask: SliceMask,
    overlay: Option<SliceOverlay>,
    history: VecDeque<CompactMask>,
}

impl SliceModel {
    fn new(width: usize, height: usize) -> Self {
        Self {
            mask: SliceMask::new(width, height),
            overlay: None,
            history: VecDeque::new(),
        }
    }

    /// 当前掩模.
    #[inline]
    pub fn mask(&self) -> &SliceMask {
        &self.mask
    }

    /// 当前叠加层. 未加载激活图时为 `None`.
    #[inline]
    pub fn overlay(&self) -> Option<&SliceOverlay> {
        self.overlay.as_ref()
    }

    /// 可撤销的步数.
    #[inline]
    pub fn undo_len(&self) -> usize {
        self.history.len()
    }

    /// 记录一次快照, 最多保留 `depth` 份.
    fn checkpoint(&mut self, depth: usize) {
        if depth == 0 {
            return;
        }
        while self.history.len() >= depth {
            self.history.pop_front();
        }
        self.history.push_back(self.mask.compress());
    }
}

/// 已打开的会话.
#[derive(Debug)]
struct Session {
    template: NiiVolume,
    slices: Vec<SliceModel>,
    activation: bool,
    compositor: SliceCompositor,
    dirty: Vec<bool>,
}

impl Session {
    fn slice_mut(&mut self, index: usize) -> EditResult<&mut SliceModel> {
        let len = self.slices.len();
        self.slices
            .get_mut(index)
            .ok_or(EditError::SliceOutOfRange { index, len })
    }

    fn mark_all(&mut self) {
        self.dirty.fill(true);
    }
}

/// 体数据编辑栈: 一个模板体数据, 以及沿第三轴每个切片一组 (掩模, 叠加层).
///
/// 所有操作都是同步的; 需要并发访问时, 调用方应自行串行化可变操作.
#[derive(Debug)]
pub struct VolumeStack<Io: VolumeIo = NiftiIo> {
    io: Io,
    config: ViewConfig,
    session: Option<Session>,
    scale: f64,
    brush: BrushMode,
}

impl Default for VolumeStack<NiftiIo> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl VolumeStack<NiftiIo> {
    /// 使用 nifti I/O 和默认参数创建处于 `Closed` 状态的编辑栈.
    #[inline]
    pub fn new() -> Self {
        Self::with_io(NiftiIo, ViewConfig::default())
    }
}

impl<Io: VolumeIo> VolumeStack<Io> {
    /// 使用给定的 I/O 协作者和参数创建处于 `Closed` 状态的编辑栈.
    pub fn with_io(io: Io, config: ViewConfig) -> Self {
        debug_assert_eq!(config.validate(), Ok(()));
        Self {
            io,
            config,
            session: None,
            scale: 1.0,
            brush: BrushMode::default(),
        }
    }

    /// 参数.
    #[inline]
    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// I/O 协作者.
    #[inline]
    pub fn io(&self) -> &Io {
        &self.io
    }

    /// 当前会话状态.
    pub fn state(&self) -> SessionState {
        match &self.session {
            None => SessionState::Closed,
            Some(s) if s.activation => SessionState::ActivationLoaded,
            Some(_) => SessionState::TemplateLoaded,
        }
    }

    fn session(&self) -> EditResult<&Session> {
        self.session.as_ref().ok_or(EditError::NotLoaded)
    }

    fn session_mut(&mut self) -> EditResult<&mut Session> {
        self.session.as_mut().ok_or(EditError::NotLoaded)
    }

    /// 从 `path` 加载模板并开始新会话. 加载失败时原会话保持不变.
    pub fn open_template<P: AsRef<Path>>(&mut self, path: P) -> EditResult<()> {
        let volume = self.io.load(path.as_ref())?;
        info!("loaded template {}", path.as_ref().display());
        self.open_template_volume(volume);
        Ok(())
    }

    /// 以内存中的体数据开始新会话: 丢弃旧会话, 为每个切片创建全保留掩模, 倍率复位为 1.
    pub fn open_template_volume(&mut self, template: NiiVolume) {
        let (x, y, z) = template.shape();
        let slices = (0..z).map(|_| SliceModel::new(x, y)).collect();
        let compositor = SliceCompositor::new(template.max_intensity(), self.config.palette);
        info!("template session opened, shape = {:?}", (x, y, z));
        self.session = Some(Session {
            template,
            slices,
            activation: false,
            compositor,
            dirty: vec![true; z],
        });
        self.scale = 1.0;
    }

    /// 当前模板.
    pub fn template(&self) -> EditResult<&NiiVolume> {
        Ok(&self.session()?.template)
    }

    /// 从 `path` 加载激活图. 加载失败或形状不一致时会话保持不变.
    pub fn open_activation<P: AsRef<Path>>(&mut self, path: P) -> EditResult<()> {
        self.session()?;
        let volume = self.io.load(path.as_ref())?;
        self.open_activation_volume(volume)
    }

    /// 以内存中的体数据作为激活图. 激活强度先取绝对值, 再逐切片构造叠加层.
    ///
    /// 形状与模板不一致时返回 [`EditError::DimensionMismatch`].
    pub fn open_activation_volume(&mut self, mut activation: NiiVolume) -> EditResult<()> {
        let session = self.session_mut()?;
        let template_shape = session.template.shape();
        if activation.shape() != template_shape {
            warn!(
                "activation shape {:?} rejected, template is {:?}",
                activation.shape(),
                template_shape
            );
            return Err(EditError::DimensionMismatch {
                template: template_shape,
                activation: activation.shape(),
            });
        }

        activation.abs_in_place();
        for (z, slice) in session.slices.iter_mut().enumerate() {
            slice.overlay = Some(SliceOverlay::from_activation(activation.plane_at(z)));
        }
        session.activation = true;
        session.mark_all();
        info!("activation overlay loaded");
        Ok(())
    }

    /// 清除所有切片的叠加层. 模板和掩模保持不变.
    pub fn remove_activation(&mut self) -> EditResult<()> {
        let session = self.session_mut()?;
        if session.activation {
            session.slices.iter_mut().for_each(|s| s.overlay = None);
            session.activation = false;
            session.mark_all();
            info!("activation overlay removed");
        }
        Ok(())
    }

    /// 丢弃整个会话, 回到 `Closed` 状态. 对已关闭的会话无效果.
    pub fn close_display(&mut self) {
        if self.session.take().is_some() {
            info!("session closed");
        }
        self.scale = 1.0;
    }

    /// 切片个数. 会话关闭时为 0.
    #[inline]
    pub fn len(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.slices.len())
    }

    /// 是否没有任何切片?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 获取第 `index` 个切片.
    pub fn slice(&self, index: usize) -> EditResult<&SliceModel> {
        let session = self.session()?;
        session.slices.get(index).ok_or(EditError::SliceOutOfRange {
            index,
            len: session.slices.len(),
        })
    }

    /// 当前画笔模式.
    #[inline]
    pub fn brush_mode(&self) -> BrushMode {
        self.brush
    }

    /// 切换画笔模式.
    #[inline]
    pub fn set_brush_mode(&mut self, mode: BrushMode) {
        self.brush = mode;
    }

    /// 把缩放后的屏幕坐标换算为网格坐标: `round(d / scale)`.
    /// 非有限值返回 `None`.
    fn to_grid(&self, d: f64) -> Option<isize> {
        let g = (d / self.scale).round();
        g.is_finite().then_some(g as isize)
    }

    /// 以 `value` 在第 `index` 个切片的屏幕坐标 `(x, y)` 处落笔.
    fn apply_brush(&mut self, index: usize, x: f64, y: f64, value: f32) -> EditResult<usize> {
        let radius = self.config.brush_radius;
        let grid = self.to_grid(x).zip(self.to_grid(y));
        let session = self.session_mut()?;
        let slice = session.slice_mut(index)?;
        let Some((gx, gy)) = grid else {
            return Ok(0);
        };
        let cnt = slice.mask.stamp(gx, gy, radius, value);
        if cnt > 0 {
            session.dirty[index] = true;
        }
        Ok(cnt)
    }

    /// 在第 `index` 个切片的屏幕坐标 `(x, y)` 处涂抹. 返回被写入的像素个数.
    ///
    /// 邻域越界部分被静默裁剪, 不会报错.
    #[inline]
    pub fn paint(&mut self, index: usize, x: f64, y: f64) -> EditResult<usize> {
        self.apply_brush(index, x, y, REMOVED)
    }

    /// 在第 `index` 个切片的屏幕坐标 `(x, y)` 处擦除. 返回被写入的像素个数.
    #[inline]
    pub fn erase(&mut self, index: usize, x: f64, y: f64) -> EditResult<usize> {
        self.apply_brush(index, x, y, KEPT)
    }

    /// 按当前画笔模式落笔.
    pub fn stroke(&mut self, index: usize, x: f64, y: f64) -> EditResult<usize> {
        match self.brush {
            BrushMode::Paint => self.paint(index, x, y),
            BrushMode::Erase => self.erase(index, x, y),
        }
    }

    /// 开始一笔 (如按下鼠标): 为第 `index` 个切片记录撤销快照.
    pub fn begin_stroke(&mut self, index: usize) -> EditResult<()> {
        let depth = self.config.undo_depth;
        self.session_mut()?.slice_mut(index)?.checkpoint(depth);
        Ok(())
    }

    /// 撤销第 `index` 个切片的最近一笔. 没有可撤销内容时返回 `Ok(false)`.
    pub fn undo(&mut self, index: usize) -> EditResult<bool> {
        let session = self.session_mut()?;
        let slice = session.slice_mut(index)?;
        let Some(snapshot) = slice.history.pop_back() else {
            return Ok(false);
        };
        match snapshot.decompress() {
            Ok(mask) if mask.shape() == slice.mask.shape() => {
                slice.mask = mask;
                session.dirty[index] = true;
                debug!("undo on slice {index}");
                Ok(true)
            }
            _ => {
                warn!("discarding unreadable undo snapshot on slice {index}");
                Ok(false)
            }
        }
    }

    /// 对每个有叠加层的切片执行 `mask <- overlay.overlap_into(mask)`, 并刷新所有切片.
    ///
    /// 该操作只为掩模实际发生变化的切片记录撤销快照.
    pub fn make_overlap(&mut self) -> EditResult<()> {
        let depth = self.config.undo_depth;
        let session = self.session_mut()?;
        let mut touched = 0usize;
        for slice in session.slices.iter_mut() {
            let Some(overlay) = slice.overlay.as_ref() else {
                continue;
            };
            let merged = overlay.overlap_into(&slice.mask);
            if merged == slice.mask {
                continue;
            }
            slice.checkpoint(depth);
            slice.mask = merged;
            touched += 1;
        }
        session.mark_all();
        debug!("overlap applied to {touched} slices");
        Ok(())
    }

    /// 生成待导出的掩模体数据 (不写盘).
    ///
    /// 每个切片的掩模先取 `|m - 1|`, 再顺时针旋转 90 度回到 nifti 平面,
    /// 写入模板的一份拷贝. header 的 `cal_min`, `cal_max` 分别置为 0 和 1.
    pub fn mask_volume(&self) -> EditResult<NiiVolume> {
        let session = self.session()?;
        let mut out = session.template.clone();
        for (z, slice) in session.slices.iter().enumerate() {
            let inverted = slice.mask.array_view().mapv(flip);
            out.plane_at_mut(z).assign(&rot270(inverted.view()));
        }
        out.refresh_max();
        out.set_calibration(CAL_MIN, CAL_MAX);
        Ok(out)
    }

    /// 导出掩模到 `path`. 目标不可写时返回 [`EditError::Write`].
    pub fn export_mask<P: AsRef<Path>>(&mut self, path: P) -> EditResult<()> {
        let volume = self.mask_volume()?;
        self.io.save(&volume, path.as_ref())?;
        info!("mask exported to {}", path.as_ref().display());
        Ok(())
    }

    /// 当前缩放倍率.
    #[inline]
    pub fn scale_factor(&self) -> f64 {
        self.scale
    }

    /// 设置缩放倍率. 倍率必须为正的有限值, 且位于 `[min_scale, max_scale]` 之内.
    pub fn set_scale_factor(&mut self, value: f64) -> EditResult<()> {
        let session = self.session.as_mut().ok_or(EditError::NotLoaded)?;
        if !(value.is_finite() && value > 0.0 && self.config.scale_in_range(value)) {
            return Err(EditError::InvalidScale(value));
        }
        session.mark_all();
        self.scale = value;
        Ok(())
    }

    /// 是否还能放大一步?
    pub fn can_zoom_in(&self) -> bool {
        self.state().is_open() && self.config.scale_in_range(self.scale * self.config.zoom_in_step)
    }

    /// 是否还能缩小一步?
    pub fn can_zoom_out(&self) -> bool {
        self.state().is_open() && self.config.scale_in_range(self.scale * self.config.zoom_out_step)
    }

    /// 放大一步. 超出倍率上限时不做任何修改并返回 `Ok(false)`.
    pub fn zoom_in(&mut self) -> EditResult<bool> {
        self.session()?;
        if !self.can_zoom_in() {
            return Ok(false);
        }
        let next = self.scale * self.config.zoom_in_step;
        self.set_scale_factor(next)?;
        debug!("zoom in, scale = {next}");
        Ok(true)
    }

    /// 缩小一步. 超出倍率下限时不做任何修改并返回 `Ok(false)`.
    pub fn zoom_out(&mut self) -> EditResult<bool> {
        self.session()?;
        if !self.can_zoom_out() {
            return Ok(false);
        }
        let next = self.scale * self.config.zoom_out_step;
        self.set_scale_factor(next)?;
        debug!("zoom out, scale = {next}");
        Ok(true)
    }

    /// 恢复原始尺寸 (倍率 1).
    #[inline]
    pub fn normal_size(&mut self) -> EditResult<()> {
        self.set_scale_factor(1.0)
    }

    /// 取出自上次调用以来需要重绘的切片索引 (升序).
    pub fn take_dirty(&mut self) -> Vec<usize> {
        let Some(session) = self.session.as_mut() else {
            return vec![];
        };
        let ans = session
            .dirty
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.then_some(i))
            .collect();
        session.dirty.fill(false);
        ans
    }

    /// 按当前倍率合成第 `index` 个切片的显示图像.
    pub fn render(&self, index: usize) -> EditResult<RgbaImage> {
        let session = self.session()?;
        let slice = self.slice(index)?;
        let intensity = session.template.display_plane(index);
        Ok(session
            .compositor
            .render(intensity.view(), slice.overlay(), slice.mask(), self.scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::rotate::rot90;
    use crate::error::{LoadError, WriteError};
    use ndarray::Array3;
    use std::collections::HashMap;
    use std::path::PathBuf;

    /// 内存中的 I/O 替身.
    #[derive(Debug, Default)]
    struct MemoryIo {
        volumes: HashMap<PathBuf, NiiVolume>,
    }

    impl VolumeIo for MemoryIo {
        fn load(&mut self, path: &Path) -> Result<NiiVolume, LoadError> {
            self.volumes.get(path).cloned().ok_or(LoadError::Empty)
        }

        fn save(&mut self, volume: &NiiVolume, path: &Path) -> Result<(), WriteError> {
            self.volumes.insert(path.to_owned(), volume.clone());
            Ok(())
        }
    }

    fn init_log() {
        let _ = simple_logger::SimpleLogger::new().init();
    }

    fn zeros(x: usize, y: usize, z: usize) -> NiiVolume {
        NiiVolume::from_xyz(Array3::zeros((x, y, z))).unwrap()
    }

    fn opened(x: usize, y: usize, z: usize) -> VolumeStack<MemoryIo> {
        let mut stack = VolumeStack::with_io(MemoryIo::default(), ViewConfig::default());
        stack.open_template_volume(zeros(x, y, z));
        stack
    }

    #[test]
    fn test_scenario() {
        init_log();
        let mut stack = opened(10, 10, 3);
        assert_eq!(stack.state(), SessionState::TemplateLoaded);
        assert_eq!(stack.len(), 3);
        for z in 0..3 {
            let mask = stack.slice(z).unwrap().mask();
            assert_eq!(mask.shape(), (10, 10));
            assert!(mask.is_pristine());
        }

        assert_eq!(stack.paint(1, 5.0, 5.0).unwrap(), 9);
        let mask = stack.slice(1).unwrap().mask();
        for ((h, w), &p) in mask.array_view().indexed_iter() {
            let inside = (4..=6).contains(&h) && (4..=6).contains(&w);
            assert_eq!(p, if inside { REMOVED } else { KEPT });
        }
        let snapshot = mask.clone();

        let err = stack.open_activation_volume(zeros(10, 10, 2)).unwrap_err();
        assert!(matches!(
            err,
            EditError::DimensionMismatch {
                template: (10, 10, 3),
                activation: (10, 10, 2)
            }
        ));
        assert_eq!(stack.state(), SessionState::TemplateLoaded);
        assert_eq!(stack.slice(1).unwrap().mask(), &snapshot);

        stack.close_display();
        assert_eq!(stack.state(), SessionState::Closed);
        assert!(matches!(stack.paint(1, 5.0, 5.0), Err(EditError::NotLoaded)));
    }

    #[test]
    fn test_not_loaded() {
        let mut stack = VolumeStack::new();
        assert!(stack.is_empty());
        assert!(matches!(stack.erase(0, 1.0, 1.0), Err(EditError::NotLoaded)));
        assert!(matches!(stack.make_overlap(), Err(EditError::NotLoaded)));
        assert!(matches!(stack.remove_activation(), Err(EditError::NotLoaded)));
        assert!(matches!(stack.mask_volume(), Err(EditError::NotLoaded)));
        assert!(matches!(stack.render(0), Err(EditError::NotLoaded)));
        assert!(matches!(stack.set_scale_factor(1.5), Err(EditError::NotLoaded)));
        assert!(matches!(
            stack.open_activation_volume(zeros(2, 2, 2)),
            Err(EditError::NotLoaded)
        ));
        assert!(!stack.can_zoom_in());
        assert!(stack.take_dirty().is_empty());
        // 重复关闭无效果.
        stack.close_display();
    }

    #[test]
    fn test_slice_out_of_range() {
        let mut stack = opened(4, 4, 2);
        assert!(matches!(
            stack.paint(2, 0.0, 0.0),
            Err(EditError::SliceOutOfRange { index: 2, len: 2 })
        ));
        assert!(matches!(stack.slice(5), Err(EditError::SliceOutOfRange { .. })));
    }

    #[test]
    fn test_border_edits_are_local() {
        let mut stack = opened(6, 5, 3);
        for (x, y) in [(0.0, 0.0), (5.0, 4.0), (-1.0, 3.0), (6.0, 0.0), (-5.0, -5.0)] {
            stack.paint(1, x, y).unwrap();
        }
        assert!(stack.slice(0).unwrap().mask().is_pristine());
        assert!(stack.slice(2).unwrap().mask().is_pristine());
        assert_eq!(stack.slice(1).unwrap().mask().count_removed(), 4 + 4 + 3 + 2);

        assert_eq!(stack.paint(1, f64::NAN, 1.0).unwrap(), 0);
    }

    #[test]
    fn test_paint_erase_round_trip() {
        let mut stack = opened(8, 8, 1);
        let before = stack.slice(0).unwrap().mask().clone();
        stack.paint(0, 3.0, 3.0).unwrap();
        stack.erase(0, 3.0, 3.0).unwrap();
        assert_eq!(stack.slice(0).unwrap().mask(), &before);
    }

    #[test]
    fn test_brush_mode_and_scale() {
        let mut stack = opened(20, 20, 1);
        stack.set_scale_factor(2.0).unwrap();
        stack.stroke(0, 10.0, 10.0).unwrap();
        let mask = stack.slice(0).unwrap().mask();
        assert_eq!(mask[(5, 5)], REMOVED);
        assert_eq!(mask[(4, 6)], REMOVED);
        assert_eq!(mask.count_removed(), 9);

        stack.set_brush_mode(BrushMode::Erase);
        // round(9.2 / 2) = 5
        stack.stroke(0, 9.2, 9.2).unwrap();
        assert!(stack.slice(0).unwrap().mask().is_pristine());
    }

    #[test]
    fn test_invalid_scale() {
        let mut stack = opened(2, 2, 1);
        assert!(matches!(
            stack.set_scale_factor(0.0),
            Err(EditError::InvalidScale(_))
        ));
        assert!(matches!(
            stack.set_scale_factor(-1.0),
            Err(EditError::InvalidScale(_))
        ));
        assert!(stack.set_scale_factor(f64::NAN).is_err());
        assert_eq!(stack.scale_factor(), 1.0);
        stack.set_scale_factor(2.0).unwrap();
        assert_eq!(stack.scale_factor(), 2.0);
    }

    #[test]
    fn test_scale_out_of_range() {
        let mut stack = opened(10, 10, 1);
        for v in [1e10, 3.0, 0.25, f64::INFINITY] {
            assert!(matches!(
                stack.set_scale_factor(v),
                Err(EditError::InvalidScale(_))
            ));
        }
        assert_eq!(stack.scale_factor(), 1.0);
        assert_eq!(stack.render(0).unwrap().dimensions(), (10, 10));

        stack.set_scale_factor(0.5).unwrap();
        assert_eq!(stack.render(0).unwrap().dimensions(), (5, 5));
    }

    #[test]
    fn test_zoom() {
        let mut stack = opened(2, 2, 1);
        assert!(stack.zoom_in().unwrap()); // 1.25
        assert!(stack.zoom_in().unwrap()); // 1.5625
        assert!(stack.zoom_in().unwrap()); // 1.953125
        assert!(!stack.can_zoom_in());
        assert!(!stack.zoom_in().unwrap());
        assert_eq!(stack.scale_factor(), 1.953125);

        stack.normal_size().unwrap();
        assert!(stack.zoom_out().unwrap()); // 0.8
        assert!(stack.zoom_out().unwrap()); // 0.64
        assert!(stack.zoom_out().unwrap()); // 0.512
        assert!(!stack.zoom_out().unwrap());
        assert!((stack.scale_factor() - 0.512).abs() < 1e-12);

        // 重新打开模板时倍率复位.
        stack.open_template_volume(zeros(2, 2, 1));
        assert_eq!(stack.scale_factor(), 1.0);
    }

    /// 模板 4 × 3 × 2, 激活图在 x == 0 的一整列为 -1 (取绝对值后为 1).
    fn with_activation() -> VolumeStack<MemoryIo> {
        let mut stack = opened(4, 3, 2);
        let act = Array3::from_shape_fn((4, 3, 2), |(x, _, _)| if x == 0 { -1.0 } else { 0.0 });
        stack
            .open_activation_volume(NiiVolume::from_xyz(act).unwrap())
            .unwrap();
        stack
    }

    #[test]
    fn test_activation_overlay() {
        let mut stack = with_activation();
        assert_eq!(stack.state(), SessionState::ActivationLoaded);
        let ov = stack.slice(1).unwrap().overlay().unwrap();
        assert_eq!(ov.shape(), (3, 4));
        // x == 0 对应显示坐标系的第 0 列.
        let act = ov.activation();
        for ((_, w), &a) in act.indexed_iter() {
            assert_eq!(a, if w == 0 { 1.0 } else { 0.0 });
        }

        stack.paint(0, 1.0, 1.0).unwrap();
        let mask = stack.slice(0).unwrap().mask().clone();
        stack.remove_activation().unwrap();
        assert_eq!(stack.state(), SessionState::TemplateLoaded);
        assert!(stack.slice(0).unwrap().overlay().is_none());
        assert_eq!(stack.slice(0).unwrap().mask(), &mask);
        assert_eq!(stack.template().unwrap().shape(), (4, 3, 2));
    }

    #[test]
    fn test_failed_activation_load_keeps_session() {
        let mut stack = opened(3, 3, 1);
        stack.paint(0, 1.0, 1.0).unwrap();
        let res = stack.open_activation("missing.nii");
        assert!(matches!(res, Err(EditError::Load(_))));
        assert_eq!(stack.state(), SessionState::TemplateLoaded);
        assert_eq!(stack.slice(0).unwrap().mask().count_removed(), 9);
    }

    #[test]
    fn test_make_overlap() {
        let mut stack = with_activation();
        // 涂抹 (0..=1, 0..=1): 第 0 列位于激活区域内.
        stack.paint(0, 0.0, 0.0).unwrap();
        stack.make_overlap().unwrap();
        let once = stack.slice(0).unwrap().mask().clone();
        assert_eq!(once[(0, 0)], REMOVED);
        assert_eq!(once[(1, 0)], REMOVED);
        assert_eq!(once[(0, 1)], KEPT);
        assert_eq!(once[(1, 1)], KEPT);
        assert_eq!(once.count_removed(), 2);

        assert_eq!(stack.slice(0).unwrap().undo_len(), 1);

        // 第二次约束不改变掩模, 也不产生新的撤销步骤.
        stack.make_overlap().unwrap();
        assert_eq!(stack.slice(0).unwrap().mask(), &once);
        assert_eq!(stack.slice(0).unwrap().undo_len(), 1);
        assert_eq!(stack.slice(1).unwrap().undo_len(), 0);

        // 撤销一次回到涂抹后的状态.
        assert!(stack.undo(0).unwrap());
        assert_eq!(stack.slice(0).unwrap().mask().count_removed(), 4);
        assert!(!stack.undo(0).unwrap());
    }

    #[test]
    fn test_overlap_without_activation_is_noop() {
        let mut stack = opened(3, 3, 1);
        stack.paint(0, 1.0, 1.0).unwrap();
        let before = stack.slice(0).unwrap().mask().clone();
        stack.make_overlap().unwrap();
        assert_eq!(stack.slice(0).unwrap().mask(), &before);
        assert_eq!(stack.slice(0).unwrap().undo_len(), 0);
    }

    #[test]
    fn test_undo() {
        let mut stack = opened(5, 5, 2);
        assert!(!stack.undo(0).unwrap());

        stack.begin_stroke(0).unwrap();
        stack.paint(0, 2.0, 2.0).unwrap();
        stack.begin_stroke(0).unwrap();
        stack.paint(0, 0.0, 4.0).unwrap();
        assert_eq!(stack.slice(0).unwrap().undo_len(), 2);

        assert!(stack.undo(0).unwrap());
        assert_eq!(stack.slice(0).unwrap().mask().count_removed(), 9);
        assert!(stack.undo(0).unwrap());
        assert!(stack.slice(0).unwrap().mask().is_pristine());
        assert!(!stack.undo(0).unwrap());
    }

    #[test]
    fn test_undo_depth() {
        let config = ViewConfig {
            undo_depth: 2,
            ..Default::default()
        };
        let mut stack = VolumeStack::with_io(MemoryIo::default(), config);
        stack.open_template_volume(zeros(5, 5, 1));
        for i in 0..4 {
            stack.begin_stroke(0).unwrap();
            stack.paint(0, i as f64, 0.0).unwrap();
        }
        assert_eq!(stack.slice(0).unwrap().undo_len(), 2);
    }

    #[test]
    fn test_dirty_tracking() {
        let mut stack = opened(4, 4, 3);
        assert_eq!(stack.take_dirty(), vec![0, 1, 2]);
        assert!(stack.take_dirty().is_empty());

        stack.paint(2, 1.0, 1.0).unwrap();
        stack.paint(2, -9.0, -9.0).unwrap();
        assert_eq!(stack.take_dirty(), vec![2]);

        stack.set_scale_factor(1.5).unwrap();
        assert_eq!(stack.take_dirty(), vec![0, 1, 2]);
    }

    #[test]
    fn test_mask_volume() {
        let mut stack = opened(4, 3, 2);
        stack.paint(1, 3.0, 0.0).unwrap();
        let out = stack.mask_volume().unwrap();
        assert_eq!(out.shape(), (4, 3, 2));
        assert_eq!((out.cal_min(), out.cal_max()), (0.0, 1.0));
        assert_eq!(out.max_intensity(), 1.0);

        // 显示坐标 (row, col) = (r, c) 对应 nifti 的 (x, y) = (c, Y - 1 - r).
        for z in 0..2 {
            for x in 0..4 {
                for y in 0..3 {
                    let row = 3 - 1 - y;
                    let removed = z == 1 && row <= 1 && x >= 2;
                    assert_eq!(out[(x, y, z)], if removed { 1.0 } else { 0.0 }, "{x} {y} {z}");
                }
            }
        }

        // 模板本身不受影响.
        assert_eq!(stack.template().unwrap().max_intensity(), 0.0);
    }

    #[test]
    fn test_export_memory_io() {
        let mut stack = opened(3, 3, 1);
        stack.paint(0, 1.0, 1.0).unwrap();
        stack.export_mask("out.nii").unwrap();
        let saved = &stack.io().volumes[Path::new("out.nii")];
        assert_eq!(saved.cal_max(), 1.0);
        assert!(saved.data_xyz().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_export_round_trip() {
        init_log();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.nii.gz");

        let mut stack = VolumeStack::new();
        let template = Array3::from_shape_fn((6, 4, 3), |(x, y, z)| (x + y + z) as f32);
        stack.open_template_volume(NiiVolume::from_xyz(template).unwrap());
        stack.paint(0, 0.0, 0.0).unwrap();
        stack.paint(2, 5.0, 2.0).unwrap();
        stack.export_mask(&path).unwrap();

        let mut reopened = VolumeStack::new();
        reopened.open_template(&path).unwrap();
        assert_eq!(reopened.template().unwrap().shape(), (6, 4, 3));
        for z in 0..3 {
            assert!(reopened.slice(z).unwrap().mask().is_pristine());
            let back = rot90(reopened.template().unwrap().plane_at(z)).mapv(flip);
            assert_eq!(back, stack.slice(z).unwrap().mask().array_view());
        }
    }

    #[test]
    fn test_export_unwritable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no").join("such").join("dir").join("mask.nii");
        let mut stack = VolumeStack::new();
        stack.open_template_volume(zeros(2, 2, 1));
        assert!(matches!(stack.export_mask(path), Err(EditError::Write(_))));
        assert_eq!(stack.state(), SessionState::TemplateLoaded);
    }

    #[test]
    fn test_open_template_failure_keeps_session() {
        let mut stack = opened(2, 2, 1);
        stack.paint(0, 0.0, 0.0).unwrap();
        assert!(matches!(
            stack.open_template("missing.nii"),
            Err(EditError::Load(_))
        ));
        assert_eq!(stack.slice(0).unwrap().mask().count_removed(), 4);
    }

    #[test]
    fn test_render() {
        let mut stack = with_activation();
        stack.paint(0, 3.0, 2.0).unwrap();
        let img = stack.render(0).unwrap();
        assert_eq!(img.dimensions(), (4, 3));

        stack.set_scale_factor(2.0).unwrap();
        let img = stack.render(1).unwrap();
        assert_eq!(img.dimensions(), (8, 6));
        assert!(matches!(stack.render(2), Err(EditError::SliceOutOfRange { .. })));
    }
}
