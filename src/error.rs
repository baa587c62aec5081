use std::path::PathBuf;
use std::process::ExitStatus;

/// 索引构建错误
///
/// 任何 I/O 错误都会中止整个流水线，没有内部重试；
/// 调用方需要重新执行完整构建，并丢弃半成品输出文件。
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to spawn sort program `{program}`: {source}")]
    SortSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("sort program `{program}` exited with {status}")]
    SortCommand { program: String, status: ExitStatus },

    /// 排序后端输出的行数与输入不符（例如 sort 输出被截断）
    #[error("{backend} sort returned {sorted} of {fed} lines")]
    SortLineCount { backend: String, fed: u64, sorted: u64 },

    /// 相邻阶段已挂断（通常是下游先失败）
    #[error("pipeline stage `{0}` hung up")]
    Disconnected(&'static str),

    #[error("pipeline stage `{0}` panicked")]
    StagePanicked(&'static str),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl Error {
    /// 是否只是上下游挂断的连锁反应（而非根因）
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Error::Disconnected(_))
    }

    pub(crate) fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Open {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
