// 该文件是 Wangyue （望岳） 项目的一部分。
// src/model/onnx.rs - ONNX Runtime 推理引擎
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

use std::path::Path;

use ort::session::{Session, builder::GraphOptimizationLevel};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::frame::InputTensor;
use crate::model::{InferenceEngine, InferenceError, PRED_FIELDS, RawPrediction};

impl From<ort::Error> for InferenceError {
  fn from(err: ort::Error) -> Self {
    InferenceError::Backend(err.to_string())
  }
}

/// ONNX Runtime 推理引擎
///
/// 模型文件启动时读入一次，输入分辨率取自会话元数据而非配置。
/// 输出约定为 [1, N, 6]，每行 [左, 上, 右, 下, 置信度, 类别索引]。
pub struct OnnxEngine {
  session: Mutex<Session>,
  input_name: String,
  width: u32,
  height: u32,
}

impl OnnxEngine {
  /// 从模型文件构建引擎，加载失败对管线初始化是致命的
  pub fn load(model_path: impl AsRef<Path>) -> Result<Self, InferenceError> {
    let model_path = model_path.as_ref();
    info!("加载模型文件: {}", model_path.display());

    let session = Session::builder()?
      .with_optimization_level(GraphOptimizationLevel::Level3)?
      .with_intra_threads(4)?
      .commit_from_file(model_path)?;

    let input = session
      .inputs
      .first()
      .ok_or_else(|| InferenceError::Backend("模型没有输入节点".to_string()))?;
    let input_name = input.name.clone();

    let dims: Vec<i64> = input
      .input_type
      .tensor_dimensions()
      .ok_or_else(|| InferenceError::Backend("模型输入不是张量".to_string()))?
      .collect();
    if dims.len() != 4 {
      return Err(InferenceError::Backend(format!(
        "期望 4 维输入, 实际 {} 维",
        dims.len()
      )));
    }

    // 形状约定 [批, 通道, 高, 宽]
    let height = dims[2] as u32;
    let width = dims[3] as u32;
    if width == 0 || height == 0 {
      return Err(InferenceError::Backend(format!(
        "模型输入分辨率无效: {}x{}",
        width, height
      )));
    }

    info!("模型加载完成, 输入分辨率 {}x{}", width, height);
    Ok(Self {
      session: Mutex::new(session),
      input_name,
      width,
      height,
    })
  }
}

impl InferenceEngine for OnnxEngine {
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

    let value = ort::value::Value::from_array((
      tensor.shape().as_slice(),
      tensor.as_slice().to_vec().into_boxed_slice(),
    ))?;

    debug!("执行模型推理");
    let mut session = self.session.lock();
    let outputs = session.run(ort::inputs![self.input_name.as_str() => value])?;

    let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
    if shape.len() != 3 || shape[2] as usize != PRED_FIELDS {
      return Err(InferenceError::Backend(format!(
        "模型输出形状无效: {:?}, 期望 [1, N, {}]",
        shape, PRED_FIELDS
      )));
    }

    let rows = data
      .chunks_exact(PRED_FIELDS)
      .map(|row| [row[0], row[1], row[2], row[3], row[4], row[5]])
      .collect::<Vec<RawPrediction>>();
    debug!("模型输出 {} 条候选", rows.len());

    Ok(rows)
  }
}
