use std::ops::{Index, IndexMut};
use std::path::Path;

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, ArrayViewMut2, Axis, Ix3};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use ordered_float::NotNan;

use crate::error::{LoadError, WriteError};
use crate::{Idx2d, Idx3d};

pub mod rotate;
pub mod window;

pub use window::IntensityWindow;

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// nifti `datatype` 字段中 FLOAT32 的编号.
const DT_FLOAT32: i16 = 16;

/// nii 格式 3D 体数据, 包括 header 和体素强度. 强度以 `f32` 保存.
///
/// 内部按 `(z, y, x)` 行优先存储; 对外报告的形状则沿用 nifti 的 `(X, Y, Z)` 顺序.
#[derive(Debug, Clone)]
pub struct NiiVolume {
    header: BoxedHeader,
    data: Array3<f32>,
    max: f32,
}

/// 从 header 读取 nifti 顺序的 (X, Y, Z).
#[inline]
fn get_shape_from_header(h: &NiftiHeader) -> Idx3d {
    let [_, x, y, z, ..] = h.dim;
    (x as usize, y as usize, z as usize)
}

/// 求所有有限值中的最大者. NaN 被忽略; 若不存在任何非 NaN 值, 返回 0.
pub(crate) fn max_finite<'a, I: IntoIterator<Item = &'a f32>>(it: I) -> f32 {
    it.into_iter()
        .filter_map(|v| NotNan::new(*v).ok())
        .filter(|v| v.is_finite())
        .max()
        .map_or(0.0, NotNan::into_inner)
}

/// 3D nii 文件 header 的共用属性.
pub trait NiftiHeaderAttr {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;

    /// 获取数据形状大小, 按 nifti 的 `(X, Y, Z)` 顺序.
    #[inline]
    fn shape(&self) -> Idx3d {
        get_shape_from_header(self.header())
    }

    /// 获取单个切片 (nifti 平面) 的形状 `(X, Y)`.
    #[inline]
    fn plane_shape(&self) -> Idx2d {
        let (x, y, _) = self.shape();
        (x, y)
    }

    /// 获取切片个数 (第三轴长度).
    #[inline]
    fn len_z(&self) -> usize {
        self.shape().2
    }

    /// 获取数据体素个数.
    #[inline]
    fn size(&self) -> usize {
        let (x, y, z) = self.shape();
        x * y * z
    }

    /// 获取单个体素分辨率, 以毫米为单位, 按 `(X, Y, Z)` 顺序.
    #[inline]
    fn pix_dim(&self) -> [f64; 3] {
        let [_, x, y, z, ..] = self.header().pixdim;
        [x as f64, y as f64, z as f64]
    }

    /// 显示标定下限 `cal_min`.
    #[inline]
    fn cal_min(&self) -> f32 {
        self.header().cal_min
    }

    /// 显示标定上限 `cal_max`.
    #[inline]
    fn cal_max(&self) -> f32 {
        self.header().cal_max
    }
}

impl NiftiHeaderAttr for NiiVolume {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

/// 按 nifti 的 `(x, y, z)` 索引.
impl Index<Idx3d> for NiiVolume {
    type Output = f32;

    #[inline]
    fn index(&self, (x, y, z): Idx3d) -> &Self::Output {
        &self.data[(z, y, x)]
    }
}

impl IndexMut<Idx3d> for NiiVolume {
    #[inline]
    fn index_mut(&mut self, (x, y, z): Idx3d) -> &mut Self::Output {
        &mut self.data[(z, y, x)]
    }
}

impl NiiVolume {
    /// 打开 nii (或 nii.gz) 文件格式的 3D 体数据. `path` 为本地路径.
    /// 如果打开成功, 则返回 `Ok(Self)`, 否则返回 `Err`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let header = Box::new(obj.header().clone());
        let ndim = header.dim[0] as usize;

        // [X, Y, Z] -> [Z, Y, X].
        let data = obj
            .into_volume()
            .into_ndarray::<f32>()?
            .into_dimensionality::<Ix3>()
            .map_err(|_| LoadError::NotVolume3d(ndim))?
            .permuted_axes([2, 1, 0]);

        Self::from_parts(header, data)
    }

    /// 根据 nifti 顺序 `(X, Y, Z)` 的裸数据直接创建体数据, header 为合成的最小 header.
    ///
    /// 数据为空, 或某一维超出 nifti header 可表示的范围时返回 `Err`.
    pub fn from_xyz(data: Array3<f32>) -> Result<Self, LoadError> {
        let mut header = Box::<NiftiHeader>::default();
        // 前 4 项由 `from_parts` 填写.
        header.dim = [3, 1, 1, 1, 1, 1, 1, 1];
        header.pixdim = [1.0; 8];
        header.datatype = DT_FLOAT32;
        header.bitpix = 32;
        Self::from_parts(header, data.permuted_axes([2, 1, 0]))
    }

    /// `data` 按 `(z, y, x)` 组织.
    fn from_parts(mut header: BoxedHeader, data: Array3<f32>) -> Result<Self, LoadError> {
        if data.is_empty() {
            return Err(LoadError::Empty);
        }
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().into_owned()
        };
        debug_assert!(data.is_standard_layout());

        // 以实际数据为准, 修正 header 中可能不一致的形状.
        let (z, y, x) = data.dim();
        let dim = |len: usize| u16::try_from(len).map_err(|_| LoadError::TooLarge(len));
        header.dim[..4].copy_from_slice(&[3, dim(x)?, dim(y)?, dim(z)?]);

        let max = max_finite(data.iter());
        Ok(Self { header, data, max })
    }

    /// 体数据中的最大有限强度值 (NaN 被忽略).
    #[inline]
    pub fn max_intensity(&self) -> f32 {
        self.max
    }

    /// 获取第 `z_index` 个切片的 nifti 平面视图, 形状为 `(X, Y)`.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn plane_at(&self, z_index: usize) -> ArrayView2<'_, f32> {
        self.data.index_axis(Axis(0), z_index).reversed_axes()
    }

    /// 获取第 `z_index` 个切片的可变 nifti 平面视图, 形状为 `(X, Y)`.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn plane_at_mut(&mut self, z_index: usize) -> ArrayViewMut2<'_, f32> {
        self.data.index_axis_mut(Axis(0), z_index).reversed_axes()
    }

    /// 获取第 `z_index` 个切片的显示平面 (nifti 平面逆时针旋转 90 度), 形状为 `(Y, X)`.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn display_plane(&self, z_index: usize) -> Array2<f32> {
        rotate::rot90(self.plane_at(z_index))
    }

    /// 获得 nifti 顺序 `(X, Y, Z)` 的数据视图.
    #[inline]
    pub fn data_xyz(&self) -> ArrayView3<'_, f32> {
        self.data.view().permuted_axes([2, 1, 0])
    }

    /// 设置显示标定字段 `cal_min` 和 `cal_max`.
    #[inline]
    pub fn set_calibration(&mut self, min: f32, max: f32) {
        self.header.cal_min = min;
        self.header.cal_max = max;
    }

    /// 对所有体素取绝对值, 并刷新最大强度.
    pub fn abs_in_place(&mut self) {
        self.data.mapv_inplace(f32::abs);
        self.refresh_max();
    }

    /// 重新计算最大强度. 通过 [`NiiVolume::plane_at_mut`] 或 `IndexMut` 写入后应调用.
    #[inline]
    pub fn refresh_max(&mut self) {
        self.max = max_finite(self.data.iter());
    }

    /// 以当前 header 为参考, 将体数据写出到 `path`. 以 `.gz` 结尾时压缩存储.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), WriteError> {
        WriterOptions::new(path.as_ref())
            .reference_header(&self.header)
            .write_nifti(&self.data_xyz())?;
        Ok(())
    }
}

/// 外部体数据 I/O 协作者.
///
/// 核心逻辑只通过该 trait 读写文件, 具体的磁盘格式对核心不透明.
pub trait VolumeIo {
    /// 从 `path` 加载 3D 体数据.
    fn load(&mut self, path: &Path) -> Result<NiiVolume, LoadError>;

    /// 将 `volume` 写出到 `path`.
    fn save(&mut self, volume: &NiiVolume, path: &Path) -> Result<(), WriteError>;
}

/// 基于 `nifti` crate 的默认 I/O 实现.
#[derive(Copy, Clone, Debug, Default)]
pub struct NiftiIo;

impl VolumeIo for NiftiIo {
    #[inline]
    fn load(&mut self, path: &Path) -> Result<NiiVolume, LoadError> {
        NiiVolume::open(path)
    }

    #[inline]
    fn save(&mut self, volume: &NiiVolume, path: &Path) -> Result<(), WriteError> {
        volume.save(path)
    }
}
