// 该文件是 Wangyue （望岳） 项目的一部分。
// src/frame.rs - 帧与输入张量定义
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::RgbImage;

pub const RGB_CHANNELS: usize = 3;

/// 帧缓冲释放回调。
///
/// 帧来源要求在帧处理完毕后收到释放通知，无论成功还是失败。
/// 回调挂在 Drop 上，任何退出路径（包括错误提前返回与积压丢帧）
/// 都会触发，不可能泄漏。
pub struct ReleaseGuard {
  notify: Option<Box<dyn FnOnce() + Send>>,
}

impl ReleaseGuard {
  pub fn new(notify: impl FnOnce() + Send + 'static) -> Self {
    Self {
      notify: Some(Box::new(notify)),
    }
  }
}

impl Drop for ReleaseGuard {
  fn drop(&mut self) {
    if let Some(notify) = self.notify.take() {
      notify();
    }
  }
}

impl std::fmt::Debug for ReleaseGuard {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ReleaseGuard").finish_non_exhaustive()
  }
}

/// 帧数据
///
/// 来源持有像素缓冲的所有权语义：管线只读消费，处理结束即释放。
#[derive(Debug)]
pub struct Frame {
  /// RGB 图像数据
  image: RgbImage,
  /// 帧索引
  pub index: u64,
  /// 时间戳（毫秒）
  pub timestamp_ms: u64,
  /// 缓冲释放通知
  release: Option<ReleaseGuard>,
}

impl Frame {
  pub fn new(image: RgbImage, index: u64, timestamp_ms: u64) -> Self {
    Self {
      image,
      index,
      timestamp_ms,
      release: None,
    }
  }

  /// 挂接缓冲释放通知，帧被丢弃时回调帧来源
  pub fn with_release(mut self, guard: ReleaseGuard) -> Self {
    self.release = Some(guard);
    self
  }

  pub fn image(&self) -> &RgbImage {
    &self.image
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }
}

/// 模型输入张量
///
/// 平面（planar）排布的浮点缓冲，形状为 3 × 高 × 宽：
/// 先是整片红色通道，然后绿色，最后蓝色，而非逐像素交错。
/// 每个值都归一化到 [0, 1]。张量由单次推理调用独占，推理结束即丢弃。
#[derive(Debug, Clone)]
pub struct InputTensor {
  data: Box<[f32]>,
  width: u32,
  height: u32,
}

impl InputTensor {
  /// 以平面缓冲构造张量，长度必须恰好为 3 × 宽 × 高
  pub(crate) fn from_planar(data: Vec<f32>, width: u32, height: u32) -> Self {
    debug_assert_eq!(data.len(), RGB_CHANNELS * (width as usize) * (height as usize));
    Self {
      data: data.into_boxed_slice(),
      width,
      height,
    }
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  /// 单个通道的像素数
  pub fn area(&self) -> usize {
    (self.width as usize) * (self.height as usize)
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  /// NCHW 形状，批大小固定为 1
  pub fn shape(&self) -> [usize; 4] {
    [1, RGB_CHANNELS, self.height as usize, self.width as usize]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicBool, Ordering};
  use std::sync::Arc;

  #[test]
  fn release_guard_fires_on_drop() {
    let released = Arc::new(AtomicBool::new(false));
    let flag = released.clone();
    let frame = Frame::new(RgbImage::new(4, 4), 0, 0)
      .with_release(ReleaseGuard::new(move || flag.store(true, Ordering::SeqCst)));

    assert!(!released.load(Ordering::SeqCst));
    drop(frame);
    assert!(released.load(Ordering::SeqCst));
  }

  #[test]
  fn tensor_shape_is_nchw() {
    let tensor = InputTensor::from_planar(vec![0.0; 3 * 8 * 6], 8, 6);
    assert_eq!(tensor.shape(), [1, 3, 6, 8]);
    assert_eq!(tensor.area(), 48);
    assert_eq!(tensor.len(), 144);
  }
}
