// 该文件是 Wangyue （望岳） 项目的一部分。
// src/pipeline/postprocess.rs - 检测结果后处理
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

use tracing::warn;

use crate::geometry::ViewGeometry;
use crate::model::{
  ClassList, PRED_BOTTOM, PRED_CLASS_INDEX, PRED_CONFIDENCE, PRED_LEFT, PRED_RIGHT, PRED_TOP,
  RawPrediction,
};

/// 默认置信度阈值
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.45;

/// 检测结果，显示面坐标系
///
/// 构造后不再修改；整帧的检测列表是发布的最小单位。
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  /// 边界框左上角 x 坐标
  pub left: f32,
  /// 边界框左上角 y 坐标
  pub top: f32,
  /// 边界框宽度
  pub width: f32,
  /// 边界框高度
  pub height: f32,
  /// 类别索引
  pub class_id: usize,
  /// 类别名称
  pub class_name: String,
  /// 置信度（百分比）
  pub confidence: f32,
}

/// 检测结果后处理器
///
/// 按置信度过滤候选、解析类别名、把模型输入坐标换算到显示面坐标。
/// 不排序也不做 NMS：单发检测模型内部已对重叠框去重，
/// 每条候选独立成立，输出顺序与候选顺序一致。
pub struct Postprocessor {
  classes: ClassList,
  model_width: f32,
  model_height: f32,
  confidence_threshold: f32,
}

impl Postprocessor {
  pub fn new(classes: ClassList, model_width: u32, model_height: u32) -> Self {
    Self {
      classes,
      model_width: model_width as f32,
      model_height: model_height as f32,
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
    }
  }

  pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
    self.confidence_threshold = threshold;
    self
  }

  /// 候选检测 → 显示面检测列表
  ///
  /// 类别索引越界只丢弃该条候选并记日志，同一帧其余结果不受影响。
  pub fn run(&self, raw: &[RawPrediction], geometry: ViewGeometry) -> Vec<Detection> {
    let mut detections = Vec::new();

    for row in raw {
      let confidence = row[PRED_CONFIDENCE];
      if confidence <= self.confidence_threshold {
        continue;
      }

      let class_id = match usize::try_from(row[PRED_CLASS_INDEX] as i64) {
        Ok(index) => index,
        Err(_) => {
          warn!("忽略一条检测: 类别索引为负 ({})", row[PRED_CLASS_INDEX]);
          continue;
        }
      };
      let class_name = match self.classes.name(class_id) {
        Ok(name) => name.to_string(),
        Err(err) => {
          warn!("忽略一条检测: {}", err);
          continue;
        }
      };

      detections.push(self.to_view_space(row, confidence, class_id, class_name, geometry));
    }

    detections
  }

  /// 单条候选换算到显示面坐标
  ///
  /// 对框尺寸的钳制兜住两类越界：模型预测的框超出自身输入画布，
  /// 以及偏移修正后出现的负尺寸。
  fn to_view_space(
    &self,
    row: &RawPrediction,
    confidence: f32,
    class_id: usize,
    class_name: String,
    geometry: ViewGeometry,
  ) -> Detection {
    let left = (row[PRED_LEFT] * geometry.scale_x).max(0.0);
    let top = (row[PRED_TOP] * geometry.scale_y - geometry.vertical_offset / 2.0).max(0.0);
    let width =
      (row[PRED_RIGHT] - row[PRED_LEFT]).max(0.0).min(self.model_width) * geometry.scale_x;
    let height =
      (row[PRED_BOTTOM] - row[PRED_TOP]).max(0.0).min(self.model_height) * geometry.scale_y;

    Detection {
      left,
      top,
      width,
      height,
      class_id,
      class_name,
      confidence: confidence * 100.0,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::ClassList;

  fn postprocessor() -> Postprocessor {
    let classes = ClassList::new(vec!["a".into(), "b".into(), "person".into()]);
    Postprocessor::new(classes, 640, 640)
  }

  fn geometry(scale_x: f32, scale_y: f32, vertical_offset: f32) -> ViewGeometry {
    ViewGeometry {
      scale_x,
      scale_y,
      vertical_offset,
    }
  }

  #[test]
  fn maps_prediction_to_view_space() {
    let raw = [[10.0, 20.0, 50.0, 80.0, 0.9, 2.0]];
    let result = postprocessor().run(&raw, geometry(1.5, 0.84, 20.0));

    assert_eq!(result.len(), 1);
    let detection = &result[0];
    assert!((detection.left - 15.0).abs() < 1e-4);
    assert!((detection.top - 6.8).abs() < 1e-4);
    assert!((detection.width - 60.0).abs() < 1e-4);
    assert!((detection.height - 50.4).abs() < 1e-4);
    assert_eq!(detection.class_name, "person");
    assert_eq!(detection.class_id, 2);
    assert!((detection.confidence - 90.0).abs() < 1e-4);
  }

  #[test]
  fn subtracts_half_the_vertical_offset() {
    let raw = [[0.0, 20.0, 10.0, 30.0, 0.9, 0.0]];
    let result = postprocessor().run(&raw, geometry(1.5, 0.84, 10.0));
    assert!((result[0].top - (20.0 * 0.84 - 5.0)).abs() < 1e-4);
  }

  #[test]
  fn threshold_filter_is_strict() {
    let raw = [
      [0.0, 0.0, 10.0, 10.0, 0.45, 0.0],
      [0.0, 0.0, 10.0, 10.0, 0.450001, 1.0],
      [0.0, 0.0, 10.0, 10.0, 0.2, 2.0],
    ];
    let result = postprocessor().run(&raw, ViewGeometry::default());

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].class_name, "b");
  }

  #[test]
  fn out_of_range_class_drops_only_that_row() {
    let raw = [
      [0.0, 0.0, 10.0, 10.0, 0.9, 0.0],
      [0.0, 0.0, 10.0, 10.0, 0.9, 99.0],
      [0.0, 0.0, 10.0, 10.0, 0.9, 2.0],
    ];
    let result = postprocessor().run(&raw, ViewGeometry::default());

    assert_eq!(result.len(), 2);
    assert_eq!(result[0].class_name, "a");
    assert_eq!(result[1].class_name, "person");
  }

  #[test]
  fn negative_class_index_is_dropped() {
    let raw = [[0.0, 0.0, 10.0, 10.0, 0.9, -1.0]];
    assert!(postprocessor().run(&raw, ViewGeometry::default()).is_empty());
  }

  #[test]
  fn box_size_is_clamped() {
    // 反向框（右 < 左，下 < 上）以及超出模型画布的框
    let raw = [
      [50.0, 80.0, 10.0, 20.0, 0.9, 0.0],
      [-100.0, -100.0, 2000.0, 2000.0, 0.9, 1.0],
    ];
    let view = geometry(1.5, 0.84, 0.0);
    let result = postprocessor().run(&raw, view);

    assert_eq!(result[0].width, 0.0);
    assert_eq!(result[0].height, 0.0);
    assert!((result[1].width - 640.0 * 1.5).abs() < 1e-3);
    assert!((result[1].height - 640.0 * 0.84).abs() < 1e-3);
    for detection in &result {
      assert!(detection.width >= 0.0 && detection.width <= 640.0 * view.scale_x);
      assert!(detection.height >= 0.0 && detection.height <= 640.0 * view.scale_y);
      assert!(detection.left >= 0.0 && detection.top >= 0.0);
    }
  }

  #[test]
  fn output_preserves_input_order() {
    let raw = [
      [0.0, 0.0, 10.0, 10.0, 0.5, 2.0],
      [0.0, 0.0, 10.0, 10.0, 0.99, 0.0],
      [0.0, 0.0, 10.0, 10.0, 0.7, 1.0],
    ];
    let result = postprocessor().run(&raw, ViewGeometry::default());

    let names: Vec<&str> = result.iter().map(|d| d.class_name.as_str()).collect();
    assert_eq!(names, ["person", "a", "b"]);
  }
}
