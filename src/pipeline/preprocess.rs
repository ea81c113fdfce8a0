// 该文件是 Wangyue （望岳） 项目的一部分。
// src/pipeline/preprocess.rs - 帧预处理
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

use thiserror::Error;

use crate::frame::{Frame, InputTensor, RGB_CHANNELS};

/// 像素归一化除数
const IMAGE_STD: f32 = 255.0;

#[derive(Error, Debug)]
pub enum PreprocessError {
  #[error("帧尺寸无效: {width}x{height}")]
  EmptyFrame { width: u32, height: u32 },
  #[error("模型输入分辨率无效: {width}x{height}")]
  EmptyTarget { width: u32, height: u32 },
}

/// 帧预处理器
///
/// 把任意分辨率的 RGB 帧变换成模型要求的固定分辨率平面张量。
pub struct Preprocessor {
  width: u32,
  height: u32,
}

impl Preprocessor {
  /// 目标分辨率即模型输入分辨率
  pub fn new(width: u32, height: u32) -> Self {
    Self { width, height }
  }

  /// 帧 → 输入张量
  ///
  /// 1. 双线性插值缩放到目标分辨率；
  /// 2. 行外列内逐像素取 RGB，除以 255 归一化；
  /// 3. 按平面排布写入：红色在 `w*i + j`，绿色偏移一个通道面积，
  ///    蓝色偏移两个。通道面积 = 宽 × 高。
  ///
  /// 不保留对源帧的任何引用。
  pub fn run(&self, frame: &Frame) -> Result<InputTensor, PreprocessError> {
    if frame.width() == 0 || frame.height() == 0 {
      return Err(PreprocessError::EmptyFrame {
        width: frame.width(),
        height: frame.height(),
      });
    }
    if self.width == 0 || self.height == 0 {
      return Err(PreprocessError::EmptyTarget {
        width: self.width,
        height: self.height,
      });
    }

    let resized = image::imageops::resize(
      frame.image(),
      self.width,
      self.height,
      image::imageops::FilterType::Triangle,
    );

    let width = self.width as usize;
    let area = width * self.height as usize;
    let mut data = vec![0.0f32; RGB_CHANNELS * area];

    // 行序与模型输入排布一致：行外、列内
    for i in 0..self.height {
      for j in 0..self.width {
        let idx = width * (i as usize) + (j as usize);
        let pixel = resized.get_pixel(j, i);

        data[idx] = pixel[0] as f32 / IMAGE_STD;
        data[idx + area] = pixel[1] as f32 / IMAGE_STD;
        data[idx + 2 * area] = pixel[2] as f32 / IMAGE_STD;
      }
    }

    Ok(InputTensor::from_planar(data, self.width, self.height))
  }
}
