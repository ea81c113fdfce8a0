// 该文件是 Wangyue （望岳） 项目的一部分。
// src/task.rs - 推理线程任务
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

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::frame::Frame;
use crate::model::InferenceEngine;
use crate::pipeline::{FrameReceiver, Pipeline};

/// 启动专用推理线程
///
/// 线程对帧槽里的帧串行执行 预处理 → 推理 → 后处理 → 发布，
/// 单帧出错只记日志并继续下一帧；已开始的帧总是跑到完成，
/// 不支持中途取消。投递端关闭后线程自行退出。
pub fn spawn_worker<E>(pipeline: Pipeline<E>, frames: FrameReceiver) -> JoinHandle<()>
where
  E: InferenceEngine + Send + 'static,
{
  std::thread::spawn(move || {
    info!("推理线程启动");
    while let Some(frame) = frames.recv() {
      let index = frame.index;
      let now = Instant::now();
      match pipeline.process_frame(frame) {
        Ok(count) => {
          info!("第 {} 帧处理完成, {} 条检测, 耗时 {:.2?}", index, count, now.elapsed());
        }
        Err(err) => {
          warn!("第 {} 帧作废: {}", index, err);
        }
      }
    }
    info!("帧来源关闭, 推理线程退出");
  })
}

/// 重复推理同源帧，返回平均单帧耗时
///
/// 前几轮算预热不计入平均。帧由工厂逐轮新建，
/// 与真实管线一样每轮独占自己的帧与张量。
pub fn repeat_shot<E, F>(pipeline: &Pipeline<E>, make_frame: F, rounds: usize) -> Option<Duration>
where
  E: InferenceEngine,
  F: Fn(u64) -> Frame,
{
  const WARMUP_ROUNDS: usize = 2;

  let mut times = Vec::with_capacity(rounds);
  for round in 0..rounds {
    let now = Instant::now();
    match pipeline.process_frame(make_frame(round as u64)) {
      Ok(count) => {
        let elapsed = now.elapsed();
        debug!("({}) 推理完成, {} 条检测, 耗时: {:.2?}", round, count, elapsed);
        times.push(elapsed);
      }
      Err(err) => warn!("({}) 推理失败: {}", round, err),
    }
  }

  if times.len() <= WARMUP_ROUNDS {
    return None;
  }
  Some(times.iter().skip(WARMUP_ROUNDS).sum::<Duration>() / (times.len() - WARMUP_ROUNDS) as u32)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::InputTensor;
  use crate::geometry::ViewGeometryTracker;
  use crate::model::{ClassList, InferenceError, RawPrediction};
  use crate::pipeline::frame_slot;
  use crate::publish::DetectionPublisher;
  use image::RgbImage;
  use std::sync::Arc;

  struct OnePersonEngine;

  impl InferenceEngine for OnePersonEngine {
    fn input_size(&self) -> (u32, u32) {
      (32, 32)
    }

    fn infer(&self, _tensor: &InputTensor) -> Result<Vec<RawPrediction>, InferenceError> {
      Ok(vec![[1.0, 1.0, 10.0, 10.0, 0.9, 0.0]])
    }
  }

  fn pipeline() -> (Pipeline<OnePersonEngine>, DetectionPublisher) {
    let publisher = DetectionPublisher::new();
    let pipeline = Pipeline::new(
      OnePersonEngine,
      ClassList::new(vec!["person".into()]),
      Arc::new(ViewGeometryTracker::new(32)),
      publisher.clone(),
    );
    (pipeline, publisher)
  }

  #[test]
  fn worker_drains_slot_until_disconnect() {
    let (pipeline, publisher) = pipeline();
    let (sender, receiver) = frame_slot();
    let worker = spawn_worker(pipeline, receiver);

    for index in 0..5 {
      sender.offer(Frame::new(RgbImage::new(16, 16), index, 0));
      std::thread::sleep(Duration::from_millis(10));
    }

    drop(sender);
    worker.join().unwrap();

    let snapshot = publisher.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].class_name, "person");
  }

  #[test]
  fn repeat_shot_reports_average() {
    let (pipeline, _publisher) = pipeline();
    let average = repeat_shot(
      &pipeline,
      |index| Frame::new(RgbImage::new(16, 16), index, 0),
      10,
    );
    assert!(average.is_some());
  }

  #[test]
  fn repeat_shot_needs_enough_rounds() {
    let (pipeline, _publisher) = pipeline();
    let average = repeat_shot(
      &pipeline,
      |index| Frame::new(RgbImage::new(16, 16), index, 0),
      2,
    );
    assert!(average.is_none());
  }
}
