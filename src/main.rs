// 该文件是 Shoushi （手势） 项目的一部分。
// src/main.rs - 实时检测主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

use shoushi::{
  FromUrl,
  args::DetectArgs,
  frame::RgbFrame,
  input::InputWrapper,
  output::OutputWrapper,
  task::{LiveTask, Task},
};

/// Shoushi 实时检测：忙时丢帧，逐帧输出检测结果
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(flatten)]
  pub detect: DetectArgs,
  /// 输入来源，例如 image:///data/frames 或 blank://640x480?fps=30
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出，例如 log:// 或 folder:///data/records
  #[arg(long, value_name = "OUTPUT", default_value = "log://")]
  pub output: Url,
  /// 读取指定帧数后退出
  #[arg(long, value_name = "COUNT")]
  pub frame_number: Option<usize>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let args = Args::parse();

  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let model = args.detect.build_detector::<RgbFrame>()?;
  let input = InputWrapper::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?;

  LiveTask::default()
    .with_frame_number(args.frame_number)
    .with_interrupt(true)
    .run_task(input, model, output)?;

  Ok(())
}
