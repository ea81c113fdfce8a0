// 该文件是 Wangyue （望岳） 项目的一部分。
// src/input/v4l2_source.rs - V4L2 摄像头帧来源
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

use std::pin::Pin;
use std::time::Instant;

use anyhow::{Context, Result};
use image::RgbImage;
use tracing::{info, warn};
use v4l::FourCC;
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

use super::{InputSource, InputSourceType};
use crate::frame::Frame;

/// 采集分辨率固定按 16:9 请求，与几何换算的宽高比假设一致
const CAPTURE_WIDTH: u32 = 1280;
const CAPTURE_HEIGHT: u32 = 720;
const CAPTURE_FPS: u32 = 30;

/// 低延迟优先：映射缓冲给两个就够，旧帧本来就该被顶掉
const STREAM_BUFFERS: u32 = 2;

/// V4L2 摄像头帧来源
///
/// v4l 的 Stream 持有对 Device 的引用，两者又要放进同一个结构体，
/// 因此 Device 用 Pin<Box> 固定住内存地址。
pub struct CameraSource {
  /// V4L2 设备（Pin<Box> 固定内存位置）
  device: Pin<Box<Device>>,
  /// 捕获流（生命周期与 device 关联）
  stream: Option<Stream<'static>>,
  frame_index: u64,
  width: u32,
  height: u32,
  fps: Option<f64>,
  start_time: Instant,
}

impl CameraSource {
  /// 打开摄像头设备并协商 YUYV 采集格式
  pub fn open(device_path: &str) -> Result<Self> {
    let device = Box::pin(
      Device::with_path(device_path)
        .with_context(|| format!("无法打开摄像头设备: {}", device_path))?,
    );

    let mut format = device.format()?;
    format.width = CAPTURE_WIDTH;
    format.height = CAPTURE_HEIGHT;
    format.fourcc = FourCC::new(b"YUYV");
    let format = device.set_format(&format)?;
    if &format.fourcc.repr != b"YUYV" {
      anyhow::bail!("设备不支持 YUYV 采集格式: {}", format.fourcc);
    }
    if format.width != CAPTURE_WIDTH || format.height != CAPTURE_HEIGHT {
      warn!(
        "设备不接受 {}x{}, 实际采集 {}x{}",
        CAPTURE_WIDTH, CAPTURE_HEIGHT, format.width, format.height
      );
    }

    let fps = match device.set_params(&v4l::video::capture::Parameters::with_fps(CAPTURE_FPS)) {
      Ok(params) => {
        let interval = params.interval;
        (interval.numerator > 0)
          .then(|| interval.denominator as f64 / interval.numerator as f64)
      }
      Err(err) => {
        warn!("设置采集帧率失败: {}", err);
        None
      }
    };

    info!(
      "摄像头已打开: {} {}x{} @ {:?}fps",
      device_path, format.width, format.height, fps
    );

    let mut source = Self {
      device,
      stream: None,
      frame_index: 0,
      width: format.width,
      height: format.height,
      fps,
      start_time: Instant::now(),
    };

    // SAFETY: device 被 Pin<Box> 固定在堆上不会移动；stream 与 device
    // 存于同一结构体，Drop 里先 take 掉 stream 再轮到 device，
    // 所以把引用延长到 'static 不会悬垂。
    let device_ref: &Device = &source.device;
    let stream = unsafe {
      let device_static: &'static Device = std::mem::transmute(device_ref);
      Stream::with_buffers(device_static, Type::VideoCapture, STREAM_BUFFERS)
        .context("无法创建捕获流")?
    };

    source.stream = Some(stream);
    Ok(source)
  }

  /// YUYV → RGB
  ///
  /// 每 4 字节承载两个像素：Y0 U Y1 V，色度分量两像素共享。
  fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Vec<u8> {
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);

    let push_pixel = |rgb: &mut Vec<u8>, y: f32, u: f32, v: f32| {
      let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
      let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
      let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
      rgb.extend_from_slice(&[r, g, b]);
    };

    for chunk in yuyv.chunks_exact(4) {
      let u = chunk[1] as f32 - 128.0;
      let v = chunk[3] as f32 - 128.0;
      push_pixel(&mut rgb, chunk[0] as f32, u, v);
      push_pixel(&mut rgb, chunk[2] as f32, u, v);
    }

    rgb
  }
}

impl Drop for CameraSource {
  fn drop(&mut self) {
    // stream 必须先于 device 结束
    self.stream.take();
  }
}

impl Iterator for CameraSource {
  type Item = Result<Frame>;

  fn next(&mut self) -> Option<Self::Item> {
    let stream = self.stream.as_mut()?;

    match stream.next() {
      Ok((buffer, _meta)) => {
        let rgb_data = Self::yuyv_to_rgb(buffer, self.width, self.height);
        let image = match RgbImage::from_raw(self.width, self.height, rgb_data) {
          Some(image) => image,
          None => return Some(Err(anyhow::anyhow!("采集缓冲尺寸与协商格式不符"))),
        };

        let frame = Frame::new(
          image,
          self.frame_index,
          self.start_time.elapsed().as_millis() as u64,
        );
        self.frame_index += 1;
        Some(Ok(frame))
      }
      Err(err) => Some(Err(anyhow::anyhow!("无法捕获帧: {}", err))),
    }
  }
}

impl InputSource for CameraSource {
  fn source_type(&self) -> InputSourceType {
    InputSourceType::Camera
  }

  fn width(&self) -> u32 {
    self.width
  }

  fn height(&self) -> u32 {
    self.height
  }

  fn fps(&self) -> Option<f64> {
    self.fps
  }
}
