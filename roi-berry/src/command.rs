//! 命名动作与命令分发.
//!
//! UI 层拥有事件循环, 只需把菜单项或快捷键映射到 [`Action`],
//! 再携带参数构造 [`Command`] 交给 [`VolumeStack::dispatch`].
//! 动作是否可用只由 [`SessionState`] 导出.

use std::fmt;
use std::path::PathBuf;

use log::debug;

use crate::data::VolumeIo;
use crate::error::{EditError, EditResult};
use crate::stack::{BrushMode, SessionState, VolumeStack};

/// 用户可触发的动作.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// 打开模板.
    OpenTemplate,
    /// 加载激活图.
    OpenActivation,
    /// 移除激活图.
    RemoveActivation,
    /// 关闭会话.
    CloseDisplay,
    /// 涂抹.
    Paint,
    /// 擦除.
    Erase,
    /// 按当前画笔模式落笔.
    Stroke,
    /// 切换画笔模式.
    SetBrushMode,
    /// 开始一笔 (记录撤销快照).
    BeginStroke,
    /// 撤销.
    Undo,
    /// 以激活图约束掩模.
    MakeOverlap,
    /// 导出掩模.
    ExportMask,
    /// 放大.
    ZoomIn,
    /// 缩小.
    ZoomOut,
    /// 原始尺寸.
    NormalSize,
    /// 设置倍率.
    SetScale,
}

impl Action {
    /// 全部动作.
    pub const ALL: [Action; 16] = [
        Action::OpenTemplate,
        Action::OpenActivation,
        Action::RemoveActivation,
        Action::CloseDisplay,
        Action::Paint,
        Action::Erase,
        Action::Stroke,
        Action::SetBrushMode,
        Action::BeginStroke,
        Action::Undo,
        Action::MakeOverlap,
        Action::ExportMask,
        Action::ZoomIn,
        Action::ZoomOut,
        Action::NormalSize,
        Action::SetScale,
    ];

    /// 动作的稳定名称, 用于快捷键表或脚本.
    pub fn name(&self) -> &'static str {
        match self {
            Action::OpenTemplate => "open-template",
            Action::OpenActivation => "open-activation",
            Action::RemoveActivation => "remove-activation",
            Action::CloseDisplay => "close-display",
            Action::Paint => "paint",
            Action::Erase => "erase",
            Action::Stroke => "stroke",
            Action::SetBrushMode => "set-brush-mode",
            Action::BeginStroke => "begin-stroke",
            Action::Undo => "undo",
            Action::MakeOverlap => "make-overlap",
            Action::ExportMask => "export-mask",
            Action::ZoomIn => "zoom-in",
            Action::ZoomOut => "zoom-out",
            Action::NormalSize => "normal-size",
            Action::SetScale => "set-scale",
        }
    }

    /// 由名称查找动作.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }

    /// 在会话状态 `state` 下该动作是否可用?
    pub fn is_enabled(&self, state: SessionState) -> bool {
        match self {
            Action::OpenTemplate | Action::SetBrushMode => true,
            Action::RemoveActivation | Action::MakeOverlap => {
                state == SessionState::ActivationLoaded
            }
            _ => state.is_open(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 携带参数的命令. 坐标均为缩放后的屏幕坐标.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// 打开模板.
    OpenTemplate(PathBuf),
    /// 加载激活图.
    OpenActivation(PathBuf),
    /// 移除激活图.
    RemoveActivation,
    /// 关闭会话.
    CloseDisplay,
    /// 在切片 `slice` 的 `(x, y)` 处涂抹.
    Paint {
        /// 切片索引.
        slice: usize,
        /// 屏幕横坐标.
        x: f64,
        /// 屏幕纵坐标.
        y: f64,
    },
    /// 在切片 `slice` 的 `(x, y)` 处擦除.
    Erase {
        /// 切片索引.
        slice: usize,
        /// 屏幕横坐标.
        x: f64,
        /// 屏幕纵坐标.
        y: f64,
    },
    /// 按当前画笔模式落笔.
    Stroke {
        /// 切片索引.
        slice: usize,
        /// 屏幕横坐标.
        x: f64,
        /// 屏幕纵坐标.
        y: f64,
    },
    /// 切换画笔模式.
    SetBrushMode(BrushMode),
    /// 开始一笔.
    BeginStroke(usize),
    /// 撤销.
    Undo(usize),
    /// 以激活图约束掩模.
    MakeOverlap,
    /// 导出掩模.
    ExportMask(PathBuf),
    /// 放大.
    ZoomIn,
    /// 缩小.
    ZoomOut,
    /// 原始尺寸.
    NormalSize,
    /// 设置倍率.
    SetScale(f64),
}

impl Command {
    /// 命令对应的动作.
    pub fn action(&self) -> Action {
        match self {
            Command::OpenTemplate(_) => Action::OpenTemplate,
            Command::OpenActivation(_) => Action::OpenActivation,
            Command::RemoveActivation => Action::RemoveActivation,
            Command::CloseDisplay => Action::CloseDisplay,
            Command::Paint { .. } => Action::Paint,
            Command::Erase { .. } => Action::Erase,
            Command::Stroke { .. } => Action::Stroke,
            Command::SetBrushMode(_) => Action::SetBrushMode,
            Command::BeginStroke(_) => Action::BeginStroke,
            Command::Undo(_) => Action::Undo,
            Command::MakeOverlap => Action::MakeOverlap,
            Command::ExportMask(_) => Action::ExportMask,
            Command::ZoomIn => Action::ZoomIn,
            Command::ZoomOut => Action::ZoomOut,
            Command::NormalSize => Action::NormalSize,
            Command::SetScale(_) => Action::SetScale,
        }
    }
}

/// 命令执行结果.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// 执行完毕, 无附加信息.
    Done,
    /// 画笔写入的像素个数.
    Brushed(usize),
    /// 缩放是否生效.
    Zoomed(bool),
    /// 是否撤销了一步.
    Undone(bool),
}

impl<Io: VolumeIo> VolumeStack<Io> {
    /// 执行一条命令. 当前状态下不可用的动作返回 [`EditError::NotLoaded`], 不做任何修改.
    pub fn dispatch(&mut self, cmd: Command) -> EditResult<Outcome> {
        let action = cmd.action();
        if !action.is_enabled(self.state()) {
            debug!("{action} is disabled in {:?}", self.state());
            return Err(EditError::NotLoaded);
        }

        let ans = match cmd {
            Command::OpenTemplate(p) => self.open_template(p).map(|_| Outcome::Done)?,
            Command::OpenActivation(p) => self.open_activation(p).map(|_| Outcome::Done)?,
            Command::RemoveActivation => self.remove_activation().map(|_| Outcome::Done)?,
            Command::CloseDisplay => {
                self.close_display();
                Outcome::Done
            }
            Command::Paint { slice, x, y } => Outcome::Brushed(self.paint(slice, x, y)?),
            Command::Erase { slice, x, y } => Outcome::Brushed(self.erase(slice, x, y)?),
            Command::Stroke { slice, x, y } => Outcome::Brushed(self.stroke(slice, x, y)?),
            Command::SetBrushMode(mode) => {
                self.set_brush_mode(mode);
                Outcome::Done
            }
            Command::BeginStroke(slice) => self.begin_stroke(slice).map(|_| Outcome::Done)?,
            Command::Undo(slice) => Outcome::Undone(self.undo(slice)?),
            Command::MakeOverlap => self.make_overlap().map(|_| Outcome::Done)?,
            Command::ExportMask(p) => self.export_mask(p).map(|_| Outcome::Done)?,
            Command::ZoomIn => Outcome::Zoomed(self.zoom_in()?),
            Command::ZoomOut => Outcome::Zoomed(self.zoom_out()?),
            Command::NormalSize => self.normal_size().map(|_| Outcome::Done)?,
            Command::SetScale(v) => self.set_scale_factor(v).map(|_| Outcome::Done)?,
        };
        Ok(ans)
    }
}
