use std::fmt;

use serde::Serialize;

/// 一次 ix + ixx 构建的汇总
#[derive(Clone, Debug, Default, Serialize)]
pub struct BuildReport {
    /// 读入的记录行数（含空行）
    pub input_lines: u64,
    /// tokenizer 产生的 `<word> <id>` 行数
    pub postings: u64,
    /// ix 行数
    pub distinct_words: u64,
    pub ix_bytes: u64,
    pub ixx_entries: u64,
    /// ixx 实际使用的前缀长度（字节）
    pub prefix_size: usize,
    pub sort_backend: String,
    /// 外部排序写出的 run 数（系统 sort 为 0）
    pub sort_runs: usize,
    pub elapsed_ms: u64,
}

pub fn human_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "╔══════════════════════════════════════════════════╗")?;
        writeln!(f, "║              ixixx Build Report                  ║")?;
        writeln!(f, "╠══════════════════════════════════════════════════╣")?;
        writeln!(f, "║ Input:                                           ║")?;
        writeln!(f, "║   records:      {:>10}                       ║", self.input_lines)?;
        writeln!(f, "║   postings:     {:>10}                       ║", self.postings)?;
        writeln!(f, "╠──────────────────────────────────────────────────╣")?;
        writeln!(f, "║ Sort:                                            ║")?;
        writeln!(f, "║   backend:      {:>10}                       ║", self.sort_backend)?;
        writeln!(f, "║   runs:         {:>10}                       ║", self.sort_runs)?;
        writeln!(f, "╠──────────────────────────────────────────────────╣")?;
        writeln!(f, "║ Index:                                           ║")?;
        writeln!(
            f,
            "║   ix words:     {:>10}  ({:>10})          ║",
            self.distinct_words,
            human_bytes(self.ix_bytes)
        )?;
        writeln!(f, "║   ixx entries:  {:>10}                       ║", self.ixx_entries)?;
        writeln!(f, "║   prefix size:  {:>10}                       ║", self.prefix_size)?;
        writeln!(f, "╠──────────────────────────────────────────────────╣")?;
        writeln!(f, "║   elapsed:      {:>8}ms                       ║", self.elapsed_ms)?;
        writeln!(f, "╚══════════════════════════════════════════════════╝")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_bytes_picks_unit() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.00 KB");
        assert_eq!(human_bytes(3 * 1024 * 1024), "3.00 MB");
        assert_eq!(human_bytes(5 * 1024 * 1024 * 1024), "5.00 GB");
    }

    #[test]
    fn report_renders_and_serializes() {
        let r = BuildReport {
            input_lines: 3,
            postings: 10,
            distinct_words: 8,
            ix_bytes: 150,
            ixx_entries: 1,
            prefix_size: 5,
            sort_backend: "in-process".into(),
            sort_runs: 2,
            elapsed_ms: 7,
        };
        let text = r.to_string();
        assert!(text.contains("in-process"));
        assert!(text.contains("150 B"));

        let v: serde_json::Value = serde_json::to_value(&r).unwrap();
        assert_eq!(v["ixx_entries"], 1);
        assert_eq!(v["sort_backend"], "in-process");
    }
}
