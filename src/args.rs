// 该文件是 Wangyue （望岳） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;

/// Wangyue 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 帧来源（V4L2 设备路径或图片文件）
  /// 支持格式:
  /// - V4L2: /dev/video0 或 v4l2:///dev/video0
  /// - 图片: *.jpg, *.jpeg, *.png（循环播放）
  #[arg(long, value_name = "SOURCE")]
  pub input: String,

  /// ONNX 模型文件路径（需要 model_onnx 特性）
  /// 不指定时使用空引擎，只跑管线不产生检测
  #[arg(long, value_name = "FILE")]
  pub model: Option<String>,

  /// 类别文件路径（逐行一个类别名），缺省使用内置 COCO 表
  #[arg(long, value_name = "FILE")]
  pub classes: Option<String>,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.45", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// 显示面宽度（像素）
  #[arg(long, default_value = "1280", value_name = "PIXELS")]
  pub view_width: u32,

  /// 显示面高度（像素）
  #[arg(long, default_value = "720", value_name = "PIXELS")]
  pub view_height: u32,

  /// 最大处理帧数（0 表示无限制）
  #[arg(long, default_value = "0", value_name = "COUNT")]
  pub max_frames: u64,

  /// 把最后一帧的叠加结果存成图片（可选）
  #[arg(long, value_name = "OUTPUT")]
  pub output: Option<String>,
}
