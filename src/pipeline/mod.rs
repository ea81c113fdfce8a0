// 该文件是 Wangyue （望岳） 项目的一部分。
// src/pipeline/mod.rs - 推理管线编排
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

mod postprocess;
mod preprocess;

pub use postprocess::{DEFAULT_CONFIDENCE_THRESHOLD, Detection, Postprocessor};
pub use preprocess::{PreprocessError, Preprocessor};

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use thiserror::Error;
use tracing::debug;

use crate::frame::Frame;
use crate::geometry::ViewGeometryTracker;
use crate::model::{ClassList, InferenceEngine, InferenceError};
use crate::publish::DetectionPublisher;

/// 单帧处理错误
///
/// 任何一种都只作废当前帧：丢帧、释放缓冲、跳过发布，
/// 管线在下一帧自愈，不向上层冒泡。
#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("预处理失败: {0}")]
  Preprocess(#[from] PreprocessError),
  #[error("推理失败: {0}")]
  Inference(#[from] InferenceError),
}

/// 推理管线
///
/// 预处理 → 推理 → 后处理 → 发布，串行执行，同一时刻至多一帧在途。
/// 引擎句柄与类别表在构造时显式注入；模型输入分辨率取自引擎。
pub struct Pipeline<E> {
  engine: E,
  preprocessor: Preprocessor,
  postprocessor: Postprocessor,
  geometry: Arc<ViewGeometryTracker>,
  publisher: DetectionPublisher,
}

impl<E: InferenceEngine> Pipeline<E> {
  pub fn new(
    engine: E,
    classes: ClassList,
    geometry: Arc<ViewGeometryTracker>,
    publisher: DetectionPublisher,
  ) -> Self {
    let (width, height) = engine.input_size();
    Self {
      preprocessor: Preprocessor::new(width, height),
      postprocessor: Postprocessor::new(classes, width, height),
      engine,
      geometry,
      publisher,
    }
  }

  pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
    self.postprocessor = self.postprocessor.with_confidence_threshold(threshold);
    self
  }

  /// 处理一帧，返回发布的检测条数
  ///
  /// 帧按值移入：无论成功还是任何一步出错，函数返回即丢弃帧，
  /// 释放通知随 Drop 触发。输入张量在推理调用结束后立刻丢弃，
  /// 不会被共享给后续任何阶段。
  pub fn process_frame(&self, frame: Frame) -> Result<usize, PipelineError> {
    let tensor = self.preprocessor.run(&frame)?;
    debug!("帧 {} 预处理完成, 张量 {:?}", frame.index, tensor.shape());

    let raw = self.engine.infer(&tensor);
    drop(tensor);
    let raw = raw?;
    debug!("帧 {} 推理完成, {} 条候选", frame.index, raw.len());

    let detections = self.postprocessor.run(&raw, self.geometry.current());
    let count = detections.len();
    self.publisher.publish(detections);

    Ok(count)
  }
}

/// 建立容量为 1、满则覆盖的帧槽
///
/// 帧来源与推理线程之间唯一的交接点：推理忙碌时到达的新帧
/// 顶掉槽里未被消费的旧帧（旧帧随即释放回来源），从不排队，
/// 内存与延迟都有界。
pub fn frame_slot() -> (FrameSender, FrameReceiver) {
  let (tx, rx) = bounded(1);
  (
    FrameSender {
      tx,
      drain: rx.clone(),
    },
    FrameReceiver { rx },
  )
}

/// 帧槽的投递端，单生产者
pub struct FrameSender {
  tx: Sender<Frame>,
  drain: Receiver<Frame>,
}

impl FrameSender {
  /// 投递一帧，槽满时先丢弃旧帧再放入新帧
  ///
  /// 返回 false 表示新帧未能入槽（消费端已不存在），帧已释放。
  pub fn offer(&self, frame: Frame) -> bool {
    match self.tx.try_send(frame) {
      Ok(()) => true,
      Err(TrySendError::Full(frame)) => {
        if let Ok(stale) = self.drain.try_recv() {
          debug!("帧 {} 未被消费, 被新帧顶掉", stale.index);
          drop(stale);
        }
        self.tx.try_send(frame).is_ok()
      }
      Err(TrySendError::Disconnected(_)) => false,
    }
  }
}

/// 帧槽的消费端，由推理线程独占
pub struct FrameReceiver {
  rx: Receiver<Frame>,
}

impl FrameReceiver {
  /// 阻塞等待下一帧；投递端关闭后返回 None
  pub fn recv(&self) -> Option<Frame> {
    self.rx.recv().ok()
  }

  pub fn try_recv(&self) -> Option<Frame> {
    self.rx.try_recv().ok()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::ReleaseGuard;
  use crate::model::{InferenceError, RawPrediction};
  use image::RgbImage;
  use std::sync::Arc;
  use std::sync::atomic::{AtomicBool, Ordering};

  struct MockEngine {
    rows: Vec<RawPrediction>,
  }

  impl InferenceEngine for MockEngine {
    fn input_size(&self) -> (u32, u32) {
      (64, 64)
    }

    fn infer(&self, _tensor: &crate::frame::InputTensor) -> Result<Vec<RawPrediction>, InferenceError> {
      Ok(self.rows.clone())
    }
  }

  struct FailingEngine;

  impl InferenceEngine for FailingEngine {
    fn input_size(&self) -> (u32, u32) {
      (64, 64)
    }

    fn infer(&self, _tensor: &crate::frame::InputTensor) -> Result<Vec<RawPrediction>, InferenceError> {
      Err(InferenceError::Backend("模拟后端故障".to_string()))
    }
  }

  fn tracked_frame(index: u64, released: &Arc<AtomicBool>) -> Frame {
    let flag = released.clone();
    Frame::new(RgbImage::new(32, 32), index, 0)
      .with_release(ReleaseGuard::new(move || flag.store(true, Ordering::SeqCst)))
  }

  fn pipeline_with<E: InferenceEngine>(engine: E) -> (Pipeline<E>, DetectionPublisher) {
    let publisher = DetectionPublisher::new();
    let geometry = Arc::new(ViewGeometryTracker::new(engine.input_size().0));
    let pipeline = Pipeline::new(
      engine,
      ClassList::new(vec!["a".into(), "b".into(), "person".into()]),
      geometry,
      publisher.clone(),
    );
    (pipeline, publisher)
  }

  #[test]
  fn frame_flows_through_to_publisher() {
    let engine = MockEngine {
      rows: vec![
        [1.0, 2.0, 5.0, 8.0, 0.9, 2.0],
        [0.0, 0.0, 4.0, 4.0, 0.1, 0.0],
      ],
    };
    let (pipeline, publisher) = pipeline_with(engine);

    let released = Arc::new(AtomicBool::new(false));
    let count = pipeline
      .process_frame(tracked_frame(1, &released))
      .unwrap();

    assert_eq!(count, 1);
    assert!(released.load(Ordering::SeqCst));

    let snapshot = publisher.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].class_name, "person");
  }

  #[test]
  fn inference_failure_skips_publish_and_releases_frame() {
    let (pipeline, publisher) = pipeline_with(FailingEngine);
    publisher.publish(vec![Detection {
      left: 0.0,
      top: 0.0,
      width: 1.0,
      height: 1.0,
      class_id: 0,
      class_name: "a".to_string(),
      confidence: 50.0,
    }]);

    let released = Arc::new(AtomicBool::new(false));
    let result = pipeline.process_frame(tracked_frame(2, &released));

    assert!(matches!(result, Err(PipelineError::Inference(_))));
    assert!(released.load(Ordering::SeqCst));
    // 上一份发布结果保持不变
    assert_eq!(publisher.snapshot().len(), 1);
  }

  #[test]
  fn zero_size_frame_is_dropped_without_publish() {
    let (pipeline, publisher) = pipeline_with(MockEngine { rows: Vec::new() });

    let released = Arc::new(AtomicBool::new(false));
    let flag = released.clone();
    let frame = Frame::new(RgbImage::new(0, 0), 3, 0)
      .with_release(ReleaseGuard::new(move || flag.store(true, Ordering::SeqCst)));

    assert!(matches!(
      pipeline.process_frame(frame),
      Err(PipelineError::Preprocess(_))
    ));
    assert!(released.load(Ordering::SeqCst));
    assert!(publisher.snapshot().is_empty());
  }

  #[test]
  fn slot_keeps_only_latest_frame() {
    let (sender, receiver) = frame_slot();

    let flags: Vec<Arc<AtomicBool>> =
      (0..3).map(|_| Arc::new(AtomicBool::new(false))).collect();
    for (index, flag) in flags.iter().enumerate() {
      assert!(sender.offer(tracked_frame(index as u64, flag)));
    }

    // 前两帧未经处理即被释放，只有最新一帧存活
    assert!(flags[0].load(Ordering::SeqCst));
    assert!(flags[1].load(Ordering::SeqCst));
    assert!(!flags[2].load(Ordering::SeqCst));

    let frame = receiver.try_recv().unwrap();
    assert_eq!(frame.index, 2);
    assert!(receiver.try_recv().is_none());
  }

  #[test]
  fn receiver_ends_when_sender_dropped() {
    let (sender, receiver) = frame_slot();
    drop(sender);
    assert!(receiver.recv().is_none());
  }
}
