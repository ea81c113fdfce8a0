// 该文件是 Wangyue （望岳） 项目的一部分。
// src/render.rs - 检测框叠加绘制
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

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::pipeline::Detection;

/// 检测框叠加绘制器
///
/// 消费发布出来的检测列表，在显示帧上画边界框。
/// 类别名与置信度走日志而不上画布。
pub struct Overlay {
  /// 按类别索引取色
  colors: Vec<Rgb<u8>>,
}

impl Default for Overlay {
  fn default() -> Self {
    Self::new(80)
  }
}

impl Overlay {
  /// 为每个类别生成一个色相均匀分布的颜色
  pub fn new(num_classes: usize) -> Self {
    let colors = (0..num_classes.max(1))
      .map(|index| {
        let hue = (index as f32 / num_classes.max(1) as f32) * 360.0;
        hsv_to_rgb(hue, 0.8, 0.9)
      })
      .collect();

    Self { colors }
  }

  /// 在图像上绘制检测框
  pub fn draw(&self, image: &mut RgbImage, detections: &[Detection]) {
    for detection in detections {
      let color = self.colors[detection.class_id % self.colors.len()];

      let x = detection.left.max(0.0) as i32;
      let y = detection.top.max(0.0) as i32;
      let width = detection.width.min(image.width() as f32 - detection.left) as u32;
      let height = detection.height.min(image.height() as f32 - detection.top) as u32;

      if width == 0 || height == 0 {
        continue;
      }

      let rect = Rect::at(x, y).of_size(width, height);
      draw_hollow_rect_mut(image, rect, color);

      // 双层边框，低分辨率下更显眼
      if width > 2 && height > 2 {
        let inner =
          Rect::at(x + 1, y + 1).of_size(width.saturating_sub(2), height.saturating_sub(2));
        draw_hollow_rect_mut(image, inner, color);
      }
    }
  }
}

/// HSV 转 RGB
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb<u8> {
  let c = v * s;
  let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
  let m = v - c;

  let (r, g, b) = if h < 60.0 {
    (c, x, 0.0)
  } else if h < 120.0 {
    (x, c, 0.0)
  } else if h < 180.0 {
    (0.0, c, x)
  } else if h < 240.0 {
    (0.0, x, c)
  } else if h < 300.0 {
    (x, 0.0, c)
  } else {
    (c, 0.0, x)
  };

  Rgb([
    ((r + m) * 255.0) as u8,
    ((g + m) * 255.0) as u8,
    ((b + m) * 255.0) as u8,
  ])
}
