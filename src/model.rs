// 该文件是 Wangyue （望岳） 项目的一部分。
// src/model.rs - 推理引擎契约与类别表
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

use std::io::BufRead;
use std::path::Path;

use thiserror::Error;

use crate::frame::InputTensor;

/// 单条候选检测，模型输入坐标系
///
/// 字段排布固定为 [左, 上, 右, 下, 置信度, 类别索引]。
pub type RawPrediction = [f32; 6];

pub const PRED_LEFT: usize = 0;
pub const PRED_TOP: usize = 1;
pub const PRED_RIGHT: usize = 2;
pub const PRED_BOTTOM: usize = 3;
pub const PRED_CONFIDENCE: usize = 4;
pub const PRED_CLASS_INDEX: usize = 5;

/// 每条候选检测的字段数
pub const PRED_FIELDS: usize = 6;

/// 推理引擎错误
#[derive(Error, Debug)]
pub enum InferenceError {
  #[error("模型加载错误: {0}")]
  ModelLoad(#[from] std::io::Error),
  #[error("输入张量形状不匹配: 期望 {expected:?}, 实际 {actual:?}")]
  ShapeMismatch {
    expected: [usize; 4],
    actual: [usize; 4],
  },
  #[error("推理后端错误: {0}")]
  Backend(String),
}

/// 推理引擎
///
/// 对管线而言引擎是不透明的同步调用：张量进，候选检测出。
/// 引擎在管线构造时显式注入，同一引擎实例会被反复调用，
/// 每次调用使用新分配的张量。
pub trait InferenceEngine {
  /// 模型要求的输入分辨率 (宽, 高)
  fn input_size(&self) -> (u32, u32);

  fn infer(&self, tensor: &InputTensor) -> Result<Vec<RawPrediction>, InferenceError>;
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for Box<E> {
  fn input_size(&self) -> (u32, u32) {
    (**self).input_size()
  }

  fn infer(&self, tensor: &InputTensor) -> Result<Vec<RawPrediction>, InferenceError> {
    (**self).infer(tensor)
  }
}

/// 类别索引越界
///
/// 只丢弃该条检测，不影响同一帧的其余结果。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("类别索引越界: {index}, 类别总数 {len}")]
pub struct ClassIndexError {
  pub index: usize,
  pub len: usize,
}

/// 类别名称表
///
/// 启动时从逐行文本文件读入一次，之后只读。
#[derive(Debug, Clone)]
pub struct ClassList {
  names: Vec<String>,
}

impl ClassList {
  pub fn new(names: Vec<String>) -> Self {
    Self { names }
  }

  /// 从逐行排列的类别文件读取，空行跳过
  pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
    let file = std::fs::File::open(path)?;
    let mut names = Vec::new();
    for line in std::io::BufReader::new(file).lines() {
      let line = line?;
      let name = line.trim();
      if !name.is_empty() {
        names.push(name.to_string());
      }
    }
    Ok(Self { names })
  }

  /// 内置的 COCO 80 类表
  pub fn coco() -> Self {
    Self {
      names: COCO_CLASSES.iter().map(|s| s.to_string()).collect(),
    }
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  /// 按索引取类别名
  pub fn name(&self, index: usize) -> Result<&str, ClassIndexError> {
    self.names.get(index).map(String::as_str).ok_or(ClassIndexError {
      index,
      len: self.names.len(),
    })
  }
}

/// 空引擎
///
/// 固定输入尺寸、永远返回零条检测，用于管线调试与延迟基准，
/// 不依赖任何模型文件。
pub struct NullEngine {
  width: u32,
  height: u32,
}

impl NullEngine {
  pub fn new(width: u32, height: u32) -> Self {
    Self { width, height }
  }
}

impl InferenceEngine for NullEngine {
  fn input_size(&self) -> (u32, u32) {
    (self.width, self.height)
  }

  fn infer(&self, tensor: &InputTensor) -> Result<Vec<RawPrediction>, InferenceError> {
    let expected = [1, 3, self.height as usize, self.width as usize];
    if tensor.shape() != expected {
      return Err(InferenceError::ShapeMismatch {
        expected,
        actual: tensor.shape(),
      });
    }
    Ok(Vec::new())
  }
}

/// COCO 数据集类别名称
pub const COCO_CLASSES: [&str; 80] = [
  "person",
  "bicycle",
  "car",
  "motorcycle",
  "airplane",
  "bus",
  "train",
  "truck",
  "boat",
  "traffic light",
  "fire hydrant",
  "stop sign",
  "parking meter",
  "bench",
  "bird",
  "cat",
  "dog",
  "horse",
  "sheep",
  "cow",
  "elephant",
  "bear",
  "zebra",
  "giraffe",
  "backpack",
  "umbrella",
  "handbag",
  "tie",
  "suitcase",
  "frisbee",
  "skis",
  "snowboard",
  "sports ball",
  "kite",
  "baseball bat",
  "baseball glove",
  "skateboard",
  "surfboard",
  "tennis racket",
  "bottle",
  "wine glass",
  "cup",
  "fork",
  "knife",
  "spoon",
  "bowl",
  "banana",
  "apple",
  "sandwich",
  "orange",
  "broccoli",
  "carrot",
  "hot dog",
  "pizza",
  "donut",
  "cake",
  "chair",
  "couch",
  "potted plant",
  "bed",
  "dining table",
  "toilet",
  "tv",
  "laptop",
  "mouse",
  "remote",
  "keyboard",
  "cell phone",
  "microwave",
  "oven",
  "toaster",
  "sink",
  "refrigerator",
  "book",
  "clock",
  "vase",
  "scissors",
  "teddy bear",
  "hair drier",
  "toothbrush",
];

#[cfg(feature = "model_onnx")]
mod onnx;
#[cfg(feature = "model_onnx")]
pub use self::onnx::OnnxEngine;
