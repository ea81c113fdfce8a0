// 该文件是 Wangyue （望岳） 项目的一部分。
// src/input/mod.rs - 帧来源模块
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

mod image_source;
#[cfg(feature = "v4l2_input")]
mod v4l2_source;

pub use image_source::StillSource;
#[cfg(feature = "v4l2_input")]
pub use v4l2_source::CameraSource;

use anyhow::Result;

use crate::frame::Frame;

/// 帧来源类型
pub enum InputSourceType {
  /// 循环播放的静态图片
  Still,
  /// V4L2 摄像头
  Camera,
}

/// 帧来源
///
/// 逐帧异步交付，帧的像素缓冲归来源所有；
/// 消费方处理完毕（或丢帧）即通过帧上的释放回调归还。
pub trait InputSource: Iterator<Item = Result<Frame>> {
  /// 获取帧来源类型
  fn source_type(&self) -> InputSourceType;

  /// 获取帧宽度
  fn width(&self) -> u32;

  /// 获取帧高度
  fn height(&self) -> u32;

  /// 获取帧率（如果适用）
  fn fps(&self) -> Option<f64>;
}

/// 从路径创建帧来源
pub fn create_input_source(source: &str) -> Result<Box<dyn InputSource>> {
  #[cfg(feature = "v4l2_input")]
  if source.starts_with("/dev/video") || source.starts_with("v4l2://") {
    let device_path = source.trim_start_matches("v4l2://");
    return Ok(Box::new(CameraSource::open(device_path)?));
  }

  let lower = source.to_lowercase();
  if lower.ends_with(".jpg") || lower.ends_with(".jpeg") || lower.ends_with(".png") {
    return Ok(Box::new(StillSource::open(source)?));
  }

  anyhow::bail!("不支持的帧来源: {}", source)
}
