use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_RUN_SIZE_LIMIT: usize = 10_000;
/// 64 KiB
pub const DEFAULT_BIN_SIZE: u64 = 64 * 1024;
pub const DEFAULT_MIN_PREFIX_SIZE: usize = 5;
pub const DEFAULT_MAX_PREFIX_SIZE: usize = 40;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 8192;

/// 排序后端选择
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortBackend {
    /// 检测到系统 `sort` 则使用它，否则回退到进程内外排
    #[default]
    Auto,
    System,
    InProcess,
}

impl std::str::FromStr for SortBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(SortBackend::Auto),
            "system" => Ok(SortBackend::System),
            "in-process" | "inprocess" => Ok(SortBackend::InProcess),
            other => Err(Error::Config(format!("unknown sort backend `{other}`"))),
        }
    }
}

/// 分词方式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenizerKind {
    /// 按空白切分，每个 token 一个词
    #[default]
    Whitespace,
    /// 按字符类扫描单词：字母数字或 `_` 开头，中间可含 `.` `-`
    WordChars,
}

impl std::str::FromStr for TokenizerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "whitespace" => Ok(TokenizerKind::Whitespace),
            "word-chars" => Ok(TokenizerKind::WordChars),
            other => Err(Error::Config(format!("unknown tokenizer `{other}`"))),
        }
    }
}

/// 索引构建配置（可从 TOML 加载，CLI 参数覆盖）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// 每个排序 run 的最大行数
    pub run_size_limit: usize,
    /// ixx 检查点之间的目标字节跨度
    pub bin_size: u64,
    pub min_prefix_size: usize,
    pub max_prefix_size: usize,
    /// 固定前缀长度；为 None 时自动优化
    pub prefix_size: Option<usize>,
    pub sort_backend: SortBackend,
    pub sort_program: String,
    pub tokenizer: TokenizerKind,
    /// 阶段间有界缓冲的容量（行）
    pub channel_capacity: usize,
    /// 排序 run 文件的基础目录；None 时使用系统临时目录
    pub work_dir: Option<PathBuf>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            run_size_limit: DEFAULT_RUN_SIZE_LIMIT,
            bin_size: DEFAULT_BIN_SIZE,
            min_prefix_size: DEFAULT_MIN_PREFIX_SIZE,
            max_prefix_size: DEFAULT_MAX_PREFIX_SIZE,
            prefix_size: None,
            sort_backend: SortBackend::Auto,
            sort_program: "sort".to_string(),
            tokenizer: TokenizerKind::Whitespace,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            work_dir: None,
        }
    }
}

impl IndexConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::open(path, e))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let cfg: IndexConfig = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.run_size_limit == 0 {
            return Err(Error::Config("run_size_limit must be >= 1".into()));
        }
        if self.bin_size == 0 {
            return Err(Error::Config("bin_size must be >= 1".into()));
        }
        if self.min_prefix_size == 0 || self.min_prefix_size > self.max_prefix_size {
            return Err(Error::Config(format!(
                "prefix size range {}..{} is empty",
                self.min_prefix_size, self.max_prefix_size
            )));
        }
        if self.prefix_size == Some(0) {
            return Err(Error::Config("prefix_size must be >= 1".into()));
        }
        if self.channel_capacity == 0 {
            return Err(Error::Config("channel_capacity must be >= 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg = IndexConfig::from_toml("").unwrap();
        assert_eq!(cfg, IndexConfig::default());
    }

    #[test]
    fn toml_overrides_selected_fields() {
        let cfg = IndexConfig::from_toml(
            r#"
            run_size_limit = 3
            sort_backend = "in-process"
            tokenizer = "word-chars"
            prefix_size = 8
            "#,
        )
        .unwrap();
        assert_eq!(cfg.run_size_limit, 3);
        assert_eq!(cfg.sort_backend, SortBackend::InProcess);
        assert_eq!(cfg.tokenizer, TokenizerKind::WordChars);
        assert_eq!(cfg.prefix_size, Some(8));
        assert_eq!(cfg.bin_size, DEFAULT_BIN_SIZE);
    }

    #[test]
    fn zero_run_size_is_rejected() {
        let err = IndexConfig::from_toml("run_size_limit = 0").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn inverted_prefix_range_is_rejected() {
        let err = IndexConfig::from_toml("min_prefix_size = 10\nmax_prefix_size = 4").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn unknown_backend_is_a_parse_error() {
        let err = IndexConfig::from_toml("sort_backend = \"quick\"").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
        assert!("quick".parse::<SortBackend>().is_err());
        assert_eq!("system".parse::<SortBackend>().unwrap(), SortBackend::System);
    }
}
