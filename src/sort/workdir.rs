use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::{Error, Result};

const PREFIX: &str = "ixixx-sort-";

/// 一次排序独占的 run 文件目录
///
/// 总是在基础目录下新建唯一子目录，Drop 时整体删除（成功/失败路径都会执行）。
/// 调用方给定的基础目录本身及其中已有的文件不受影响。
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl WorkDir {
    /// `base` 为 None 时使用系统临时目录；给定时先确保其存在
    pub fn provision(base: Option<&Path>) -> Result<Self> {
        match base {
            Some(base) => {
                std::fs::create_dir_all(base).map_err(|e| Error::open(base, e))?;
                Self::create_in(base)
            }
            None => Self::create_in(&std::env::temp_dir()),
        }
    }

    /// 在已存在的 `base` 下创建私有子目录
    pub fn create_in(base: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(PREFIX)
            .tempdir_in(base)
            .map_err(|e| Error::open(base, e))?;
        tracing::debug!("Provisioned sort work dir {:?}", dir.path());
        Ok(Self {
            path: dir.path().to_path_buf(),
            dir: Some(dir),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                tracing::warn!("Failed to remove sort work dir {:?}: {}", self.path, e);
            }
        }
    }
}
