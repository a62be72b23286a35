//! 运行时错误.
//!
//! 所有错误均可恢复: 出错后会话保持出错前的状态, 可以继续使用.

use crate::Idx3d;
use thiserror::Error;

/// 体数据加载错误.
#[derive(Debug, Error)]
pub enum LoadError {
    /// nifti 文件无法解析, 或底层 I/O 错误.
    #[error("无法解析 nifti 文件: {0}")]
    Nifti(#[from] nifti::NiftiError),

    /// 体数据不是三维的. 参数为实际维数.
    #[error("仅支持三维体数据, 但得到了 {0} 维数据")]
    NotVolume3d(usize),

    /// 体数据不含任何体素.
    #[error("体数据为空")]
    Empty,

    /// 某一维长度超出 nifti header 可表示的范围 (`u16`). 参数为该维长度.
    #[error("体数据维度 {0} 超出 nifti header 可表示的范围")]
    TooLarge(usize),
}

/// 体数据写出错误.
#[derive(Debug, Error)]
pub enum WriteError {
    /// nifti 写出失败 (通常是目标路径不可写).
    #[error("无法写出 nifti 文件: {0}")]
    Nifti(#[from] nifti::NiftiError),
}

/// 编辑会话的运行时错误.
#[derive(Debug, Error)]
pub enum EditError {
    /// 模板或激活图加载失败.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// 激活图形状与模板形状不一致. 形状均按 nifti 的 `(X, Y, Z)` 顺序给出.
    #[error("激活图形状 {activation:?} 与模板形状 {template:?} 不一致")]
    DimensionMismatch {
        /// 模板形状.
        template: Idx3d,
        /// 激活图形状.
        activation: Idx3d,
    },

    /// 导出失败.
    #[error(transparent)]
    Write(#[from] WriteError),

    /// 操作需要已打开的会话.
    #[error("尚未打开模板")]
    NotLoaded,

    /// 缩放倍率非正 (或不是有限值).
    #[error("非法缩放倍率: {0}")]
    InvalidScale(f64),

    /// 切片索引越界.
    #[error("切片索引 {index} 越界 (共 {len} 层)")]
    SliceOutOfRange {
        /// 请求的索引.
        index: usize,
        /// 切片总数.
        len: usize,
    },
}

/// 编辑会话运行时结果.
pub type EditResult<T> = Result<T, EditError>;
