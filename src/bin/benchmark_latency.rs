// 该文件是 Wangyue （望岳） 项目的一部分。
// src/bin/benchmark_latency.rs - 管线延迟基准
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

use anyhow::Result;
use clap::Parser;
use image::{Rgb, RgbImage};
use tracing::{info, warn};

use wangyue::frame::Frame;
use wangyue::geometry::ViewGeometryTracker;
use wangyue::model::{ClassList, NullEngine};
use wangyue::pipeline::Pipeline;
use wangyue::publish::DetectionPublisher;
use wangyue::task::repeat_shot;

/// Wangyue 管线延迟基准参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 合成帧宽度
  #[arg(long, default_value = "1280", value_name = "PIXELS")]
  pub width: u32,

  /// 合成帧高度
  #[arg(long, default_value = "720", value_name = "PIXELS")]
  pub height: u32,

  /// 重复轮数
  #[arg(long, default_value = "300", value_name = "COUNT")]
  pub rounds: usize,
}

/// 渐变合成帧，避免纯色被编码器或缓存抄了近路
fn synthetic_image(width: u32, height: u32) -> RgbImage {
  RgbImage::from_fn(width, height, |x, y| {
    Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
  })
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  info!(
    "延迟基准: {}x{} 合成帧, {} 轮, 空引擎",
    args.width, args.height, args.rounds
  );

  let engine = NullEngine::new(640, 640);
  let geometry = Arc::new(ViewGeometryTracker::new(640));
  let pipeline = Pipeline::new(
    engine,
    ClassList::coco(),
    geometry,
    DetectionPublisher::new(),
  );

  let image = synthetic_image(args.width, args.height);
  let average = repeat_shot(
    &pipeline,
    |index| Frame::new(image.clone(), index, 0),
    args.rounds,
  );

  match average {
    Some(average) => warn!("平均单帧耗时: {:.2?}", average),
    None => warn!("轮数太少, 无法统计平均耗时"),
  }

  Ok(())
}
