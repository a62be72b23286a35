//! 掩模镜像. 用于提取和复原切片掩模.

use super::SliceMask;
use crate::Idx2d;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use ndarray::Array2;
use std::io::{self, Read, Write};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 一个拥有所有权的切片掩模的不透明镜像.
/// 用于临时保存一个掩模的值, 并在随后恢复.
///
/// 注意该结构是被设计来 **快速** 回填原数据的,
/// 因此并不压缩原数据.
#[derive(Clone, Debug)]
pub struct MaskMirror(pub(crate) Vec<f32>);

impl From<&SliceMask> for MaskMirror {
    fn from(value: &SliceMask) -> Self {
        Self(value.iter().copied().collect())
    }
}

/// 压缩存储的 `SliceMask`; 不透明类型.
///
/// 掩模绝大部分像素相同, 压缩率很高, 适合长期保存 (如撤销历史).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompactMask {
    /// 压缩的不透明字节流.
    buf: Vec<u8>,

    /// 形状 (高, 宽).
    sh: Idx2d,
}

impl CompactMask {
    /// 压缩掩模.
    pub fn compress(mask: &SliceMask) -> Self {
        let mut e = ZlibEncoder::new(Vec::with_capacity(64), Compression::best());
        for v in mask.iter() {
            // 写入内存缓冲区不会失败.
            e.write_all(&v.to_le_bytes()).expect("Compression error");
        }
        Self {
            buf: e.finish().expect("Compression error"),
            sh: mask.shape(),
        }
    }

    /// 解压缩数据. 字节流损坏时返回 `Err`.
    pub fn decompress(&self) -> io::Result<SliceMask> {
        let (h, w) = self.sh;
        let mut d = ZlibDecoder::new(self.buf.as_slice());
        let mut bytes = Vec::with_capacity(h * w * 4);
        d.read_to_end(&mut bytes)?;
        if bytes.len() != h * w * 4 {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "掩模大小不符"));
        }
        let buf = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        let data = Array2::from_shape_vec((h, w), buf)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(SliceMask::from_raw(data))
    }

    /// 压缩后的字节数.
    #[inline]
    pub fn compressed_len(&self) -> usize {
        self.buf.len()
    }

    /// 原掩模形状 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.sh
    }
}
