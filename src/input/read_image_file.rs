// 该文件是 Shoushi （手势） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::{Path, PathBuf};

use image::ImageReader;
use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{RgbFrame, Rotation},
  input::rotation_from_url,
};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("Invalid rotation: {0}")]
  InvalidRotation(String),
  #[error("No image found in {0}")]
  NoImage(String),
}

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

/// `image:///path/to/a.jpg` 读取单张图片；路径为目录时按文件名顺序逐张读取
pub struct ImageFileInput {
  files: std::vec::IntoIter<PathBuf>,
  rotation: Rotation,
  index: u64,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let rotation = rotation_from_url(url).map_err(ImageFileInputError::InvalidRotation)?;
    let path = PathBuf::from(url.path());
    let files = if path.is_dir() {
      let mut files: Vec<PathBuf> = std::fs::read_dir(&path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| is_image(p))
        .collect();
      files.sort();
      files
    } else {
      vec![path.clone()]
    };

    if files.is_empty() {
      return Err(ImageFileInputError::NoImage(path.display().to_string()));
    }
    debug!("图像输入共 {} 个文件", files.len());

    Ok(ImageFileInput {
      files: files.into_iter(),
      rotation,
      index: 0,
    })
  }
}

fn is_image(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn load_image(path: &Path) -> Result<image::DynamicImage, ImageFileInputError> {
  Ok(ImageReader::open(path)?.decode()?)
}

impl Iterator for ImageFileInput {
  type Item = RgbFrame;

  fn next(&mut self) -> Option<Self::Item> {
    for path in self.files.by_ref() {
      let image = match load_image(&path) {
        Ok(image) => image,
        Err(e) => {
          warn!("跳过无法读取的图像 {}: {}", path.display(), e);
          continue;
        }
      };

      let index = self.index;
      self.index += 1;
      return Some(
        RgbFrame::from(image.to_rgb8())
          .with_index(index, 0)
          .rotate(self.rotation),
      );
    }
    None
  }
}
