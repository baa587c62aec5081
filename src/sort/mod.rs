pub mod external;
pub mod system;
pub mod workdir;

use crossbeam::channel::{Receiver, Sender};
use serde::Serialize;

use crate::config::{IndexConfig, SortBackend};
use crate::error::{Error, Result};

pub use external::{external_sort, ExternalSorter};
pub use system::{find_program, SystemSorter};
pub use workdir::WorkDir;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SortStats {
    /// 写出的 run 文件数（系统 sort 后端为 0）
    pub runs: usize,
    pub lines: u64,
}

/// 行排序后端抽象：`sort(stream) -> stream`
///
/// ## 契约
/// - 输出为输入全部行的字节序排列；相同行之间顺序不保证
/// - 输入/输出都是有界通道，下游满时必须阻塞而不是缓存全部数据
/// - 输出端挂断时返回 `Error::Disconnected`，交由编排层定位根因
pub trait LineSorter: Send + Sync {
    fn name(&self) -> &'static str;

    fn sort(&self, input: Receiver<String>, output: Sender<String>) -> Result<SortStats>;
}

/// 按配置选择排序后端
pub fn select_sorter(config: &IndexConfig) -> Result<Box<dyn LineSorter>> {
    let in_process = || -> Box<dyn LineSorter> {
        Box::new(ExternalSorter::new(
            config.work_dir.clone(),
            config.run_size_limit,
        ))
    };

    let sorter: Box<dyn LineSorter> = match config.sort_backend {
        SortBackend::InProcess => in_process(),
        SortBackend::System => match SystemSorter::detect(&config.sort_program) {
            Some(s) => Box::new(s),
            None => {
                return Err(Error::Config(format!(
                    "sort program `{}` not found",
                    config.sort_program
                )))
            }
        },
        SortBackend::Auto => match SystemSorter::detect(&config.sort_program) {
            Some(s) => Box::new(s),
            None => in_process(),
        },
    };
    tracing::info!("Using {} sort backend", sorter.name());
    Ok(sorter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_process_backend_is_always_available() {
        let cfg = IndexConfig {
            sort_backend: SortBackend::InProcess,
            ..IndexConfig::default()
        };
        assert_eq!(select_sorter(&cfg).unwrap().name(), "in-process");
    }

    #[test]
    fn auto_falls_back_when_program_missing() {
        let cfg = IndexConfig {
            sort_backend: SortBackend::Auto,
            sort_program: "ixixx-surely-not-on-path".into(),
            ..IndexConfig::default()
        };
        assert_eq!(select_sorter(&cfg).unwrap().name(), "in-process");
    }

    #[test]
    fn explicit_system_backend_requires_program() {
        let cfg = IndexConfig {
            sort_backend: SortBackend::System,
            sort_program: "ixixx-surely-not-on-path".into(),
            ..IndexConfig::default()
        };
        assert!(matches!(select_sorter(&cfg), Err(Error::Config(_))));
    }
}
