// 该文件是 Wangyue （望岳） 项目的一部分。
// src/publish.rs - 检测结果发布
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

use std::sync::Arc;

use parking_lot::RwLock;

use crate::pipeline::Detection;

/// 检测结果发布器
///
/// 持有最近一帧的检测列表。写入方是推理线程，读取方是渲染侧，
/// 二者只通过整个 Arc 的原子替换协调：读到的要么是上一份完整列表，
/// 要么是新一份完整列表，不存在写到一半的状态。
///
/// 克隆发布器得到的是同一份共享状态的新句柄。
#[derive(Clone)]
pub struct DetectionPublisher {
  current: Arc<RwLock<Arc<[Detection]>>>,
}

impl Default for DetectionPublisher {
  fn default() -> Self {
    Self::new()
  }
}

impl DetectionPublisher {
  pub fn new() -> Self {
    Self {
      current: Arc::new(RwLock::new(Vec::new().into())),
    }
  }

  /// 整体替换当前检测列表
  pub fn publish(&self, detections: Vec<Detection>) {
    *self.current.write() = detections.into();
  }

  /// 非阻塞快照
  ///
  /// 返回的 Arc 与后续发布互不影响，消费方可以随意持有。
  pub fn snapshot(&self) -> Arc<[Detection]> {
    self.current.read().clone()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn detection(class_name: &str) -> Detection {
    Detection {
      left: 0.0,
      top: 0.0,
      width: 1.0,
      height: 1.0,
      class_id: 0,
      class_name: class_name.to_string(),
      confidence: 90.0,
    }
  }

  #[test]
  fn starts_empty() {
    let publisher = DetectionPublisher::new();
    assert!(publisher.snapshot().is_empty());
  }

  #[test]
  fn publish_replaces_wholesale() {
    let publisher = DetectionPublisher::new();
    publisher.publish(vec![detection("cat"), detection("dog")]);
    publisher.publish(vec![detection("person")]);

    let snapshot = publisher.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].class_name, "person");
  }

  #[test]
  fn snapshot_survives_later_publishes() {
    let publisher = DetectionPublisher::new();
    publisher.publish(vec![detection("cat")]);

    let snapshot = publisher.snapshot();
    publisher.publish(Vec::new());

    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].class_name, "cat");
    assert!(publisher.snapshot().is_empty());
  }

  #[test]
  fn clones_share_state() {
    let publisher = DetectionPublisher::new();
    let reader = publisher.clone();
    publisher.publish(vec![detection("bus")]);

    assert_eq!(reader.snapshot().len(), 1);
  }
}
