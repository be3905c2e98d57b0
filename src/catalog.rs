// 该文件是 Shanan （山南西风） 项目的一部分。
// src/catalog.rs - 类别名称表
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum CatalogError {
  #[error("无法读取类别文件 {}: {source}", .path.display())]
  Unreadable {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("类别文件为空: {}", .0.display())]
  Empty(PathBuf),
  #[error("类别索引越界: {index}，类别数量为 {len}")]
  ClassIndexOutOfRange { index: usize, len: usize },
}

/// 按类别索引排列的名称表，行序即索引
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassCatalog {
  names: Vec<String>,
}

impl From<Vec<String>> for ClassCatalog {
  fn from(names: Vec<String>) -> Self {
    Self { names }
  }
}

impl ClassCatalog {
  pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
    let path = path.as_ref();
    info!("加载类别文件: {}", path.display());

    let content = std::fs::read_to_string(path).map_err(|source| {
      error!("类别文件读取失败: {}", source);
      CatalogError::Unreadable {
        path: path.to_path_buf(),
        source,
      }
    })?;

    let catalog = Self::parse(&content);
    if catalog.is_empty() {
      error!("类别文件中没有任何类别");
      return Err(CatalogError::Empty(path.to_path_buf()));
    }

    debug!("共加载 {} 个类别", catalog.len());
    Ok(catalog)
  }

  /// 每行一个名称，去掉行尾的 `\r`
  pub fn parse(content: &str) -> Self {
    let names = content
      .lines()
      .map(|line| line.trim_end_matches('\r').to_string())
      .collect();
    Self { names }
  }

  pub fn name(&self, index: usize) -> Result<&str, CatalogError> {
    self
      .names
      .get(index)
      .map(String::as_str)
      .ok_or(CatalogError::ClassIndexOutOfRange {
        index,
        len: self.names.len(),
      })
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.names.iter().map(String::as_str)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn test_parse_keeps_order() {
    let catalog = ClassCatalog::parse("person\r\nbicycle\ncar\n");
    let names: Vec<&str> = catalog.iter().collect();
    assert_eq!(names, vec!["person", "bicycle", "car"]);
    assert_eq!(catalog.name(1).unwrap(), "bicycle");
  }

  #[test]
  fn test_out_of_range_index_is_reported() {
    let catalog = ClassCatalog::from(vec!["person".to_string()]);
    match catalog.name(1) {
      Err(CatalogError::ClassIndexOutOfRange { index, len }) => {
        assert_eq!(index, 1);
        assert_eq!(len, 1);
      }
      other => panic!("unexpected result: {:?}", other),
    }
  }

  #[test]
  fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = ClassCatalog::load(dir.path().join("missing.names"));
    assert!(matches!(result, Err(CatalogError::Unreadable { .. })));
  }

  #[test]
  fn test_load_empty_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.flush().unwrap();
    let result = ClassCatalog::load(file.path());
    assert!(matches!(result, Err(CatalogError::Empty(_))));
  }

  #[test]
  fn test_load_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "person").unwrap();
    writeln!(file, "dog").unwrap();
    let catalog = ClassCatalog::load(file.path()).unwrap();
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.name(0).unwrap(), "person");
  }
}
