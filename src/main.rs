// 该文件是 Wangyue （望岳） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use wangyue::geometry::ViewGeometryTracker;
use wangyue::input::create_input_source;
use wangyue::model::{ClassList, InferenceEngine, NullEngine};
use wangyue::pipeline::{Pipeline, frame_slot};
use wangyue::publish::DetectionPublisher;
use wangyue::render::Overlay;
use wangyue::task::spawn_worker;

/// 静态图片来源没有自带节奏，按约 30fps 投喂
const STILL_FRAME_INTERVAL: Duration = Duration::from_millis(33);

#[cfg(feature = "model_onnx")]
fn build_engine(model: Option<&str>) -> Result<Box<dyn InferenceEngine + Send>> {
  match model {
    Some(path) => Ok(Box::new(wangyue::model::OnnxEngine::load(path)?)),
    None => {
      warn!("未指定模型, 使用空引擎（只跑管线, 不产生检测）");
      Ok(Box::new(NullEngine::new(640, 640)))
    }
  }
}

#[cfg(not(feature = "model_onnx"))]
fn build_engine(model: Option<&str>) -> Result<Box<dyn InferenceEngine + Send>> {
  if let Some(path) = model {
    anyhow::bail!("未启用 model_onnx 特性, 无法加载模型: {}", path);
  }
  warn!("使用空引擎（只跑管线, 不产生检测）");
  Ok(Box::new(NullEngine::new(640, 640)))
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("帧来源: {}", args.input);
  info!("置信度阈值: {}", args.confidence);
  info!("显示面: {}x{}", args.view_width, args.view_height);

  // 模型与类别表都在启动时加载一次，失败即退出
  let engine = build_engine(args.model.as_deref())?;
  let classes = match &args.classes {
    Some(path) => ClassList::from_path(path)?,
    None => ClassList::coco(),
  };
  info!("类别表: {} 类", classes.len());

  let geometry = Arc::new(ViewGeometryTracker::new(engine.input_size().0));
  geometry.on_surface_resized(args.view_width, args.view_height);

  let publisher = DetectionPublisher::new();
  let pipeline = Pipeline::new(engine, classes, geometry.clone(), publisher.clone())
    .with_confidence_threshold(args.confidence);

  let mut source = create_input_source(&args.input)?;
  info!("帧来源已打开: {}x{}", source.width(), source.height());

  let (sender, receiver) = frame_slot();
  let worker = spawn_worker(pipeline, receiver);

  let (stop_tx, stop_rx) = std::sync::mpsc::channel();
  ctrlc::set_handler(move || {
    let _ = stop_tx.send(());
  })
  .expect("Error setting Ctrl-C handler");

  let throttle = source.fps().is_none();
  let mut frame_count = 0u64;
  let mut last_image = None;

  for frame_result in &mut source {
    if args.max_frames > 0 && frame_count >= args.max_frames {
      info!("已达到最大帧数限制: {}", args.max_frames);
      break;
    }
    if stop_rx.try_recv().is_ok() {
      warn!("收到中断信号, 停止采集");
      break;
    }

    let frame = frame_result?;
    frame_count += 1;
    if args.output.is_some() {
      last_image = Some(frame.image().clone());
    }

    // 满槽即顶掉旧帧：推理忙碌时新帧永不排队
    sender.offer(frame);

    if frame_count % 30 == 0 {
      let snapshot = publisher.snapshot();
      info!("第 {} 帧, 当前发布 {} 条检测", frame_count, snapshot.len());
      for detection in snapshot.iter() {
        info!(
          "  - {}: {:.2}% at ({:.0}, {:.0}, {:.0}x{:.0})",
          detection.class_name,
          detection.confidence,
          detection.left,
          detection.top,
          detection.width,
          detection.height
        );
      }
    }

    if throttle {
      std::thread::sleep(STILL_FRAME_INTERVAL);
    }
  }

  // 关闭帧槽，让推理线程处理完手头一帧后退出
  drop(sender);
  let _ = worker.join();

  if let (Some(output), Some(mut image)) = (args.output, last_image) {
    let snapshot = publisher.snapshot();
    Overlay::default().draw(&mut image, &snapshot);
    image.save(&output)?;
    info!("叠加结果已保存: {} ({} 条检测)", output, snapshot.len());
  }

  info!("处理完成, 共 {} 帧", frame_count);
  Ok(())
}
