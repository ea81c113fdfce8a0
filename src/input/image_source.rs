// 该文件是 Wangyue （望岳） 项目的一部分。
// src/input/image_source.rs - 静态图片帧来源
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

use std::time::Instant;

use anyhow::{Context, Result};
use image::RgbImage;

use super::{InputSource, InputSourceType};
use crate::frame::Frame;

/// 静态图片帧来源
///
/// 把一张图片当作无限帧流循环交付，用于没有摄像头的环境：
/// 配合帧槽可以复现真实来源的到达节奏与积压丢帧行为。
pub struct StillSource {
  image: RgbImage,
  frame_index: u64,
  start_time: Instant,
}

impl StillSource {
  pub fn open(path: &str) -> Result<Self> {
    let image = image::open(path)
      .with_context(|| format!("无法读取图片: {}", path))?
      .to_rgb8();

    Ok(Self {
      image,
      frame_index: 0,
      start_time: Instant::now(),
    })
  }
}

impl Iterator for StillSource {
  type Item = Result<Frame>;

  fn next(&mut self) -> Option<Self::Item> {
    let frame = Frame::new(
      self.image.clone(),
      self.frame_index,
      self.start_time.elapsed().as_millis() as u64,
    );
    self.frame_index += 1;
    Some(Ok(frame))
  }
}

impl InputSource for StillSource {
  fn source_type(&self) -> InputSourceType {
    InputSourceType::Still
  }

  fn width(&self) -> u32 {
    self.image.width()
  }

  fn height(&self) -> u32 {
    self.image.height()
  }

  fn fps(&self) -> Option<f64> {
    None
  }
}
