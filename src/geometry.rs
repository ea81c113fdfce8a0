// 该文件是 Wangyue （望岳） 项目的一部分。
// src/geometry.rs - 显示面几何跟踪
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

use crossbeam_utils::atomic::AtomicCell;
use tracing::debug;

/// 从显示面尺寸推导出的坐标换算因子
///
/// 由 UI 布局线程写入、推理线程读取。整体替换，单帧内读到的
/// 三个字段必然来自同一次快照，过期一帧可以接受，撕裂不可接受。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewGeometry {
  /// 横向缩放：显示面宽 / 模型输入宽
  pub scale_x: f32,
  /// 纵向缩放，按固定 16:9 采集宽高比从横向缩放推出
  pub scale_y: f32,
  /// 16:9 画面高度与实际显示面高度的差
  pub vertical_offset: f32,
}

impl Default for ViewGeometry {
  fn default() -> Self {
    Self {
      scale_x: 1.0,
      scale_y: 1.0,
      vertical_offset: 0.0,
    }
  }
}

/// 显示面几何跟踪器
///
/// 仅有一种状态迁移：显示面尺寸变化通知。初始为恒等换算。
pub struct ViewGeometryTracker {
  current: AtomicCell<ViewGeometry>,
  model_width: f32,
}

impl ViewGeometryTracker {
  pub fn new(model_width: u32) -> Self {
    Self {
      current: AtomicCell::new(ViewGeometry::default()),
      model_width: model_width as f32,
    }
  }

  /// 显示面尺寸变化通知
  ///
  /// 管线假定采集画面宽高比固定为 16:9，纵向缩放与偏移都按此推导，
  /// 与显示面的真实宽高比无关。
  pub fn on_surface_resized(&self, view_width: u32, view_height: u32) {
    let scale_x = view_width as f32 / self.model_width;
    let scale_y = scale_x * 9.0 / 16.0;
    let vertical_offset = view_width as f32 * 9.0 / 16.0 - view_height as f32;

    let geometry = ViewGeometry {
      scale_x,
      scale_y,
      vertical_offset,
    };
    debug!(
      "显示面尺寸变化: {}x{}, 几何: {:?}",
      view_width, view_height, geometry
    );
    self.current.store(geometry);
  }

  /// 当前几何快照
  pub fn current(&self) -> ViewGeometry {
    self.current.load()
  }
}
