use std::io::BufRead;

/// 截取单词的前 `size` 个字符。
///
/// ix 中的单词不含空格，所以截断后的切片相等 ⇔ 补齐后的前缀相等。
pub fn truncate_prefix(word: &str, size: usize) -> &str {
    match word.char_indices().nth(size) {
        Some((end, _)) => &word[..end],
        None => word,
    }
}

/// 定宽前缀：截断后用空格补齐到恰好 `size` 个字符
pub fn padded_prefix(word: &str, size: usize) -> String {
    let cut = truncate_prefix(word, size);
    let mut s = String::with_capacity(cut.len() + size);
    s.push_str(cut);
    for _ in cut.chars().count()..size {
        s.push(' ');
    }
    s
}

/// 取 ix 行的单词（第一个空格之前）
pub(crate) fn word_of(line: &[u8]) -> &[u8] {
    match line.iter().position(|&b| b == b' ') {
        Some(i) => &line[..i],
        None => line,
    }
}

/// 前缀分箱状态机：ixx 构建与前缀长度优化共用
///
/// 逐行喂入 (单词, 该行在 ix 中的字节偏移)。当距上次检查点已累计
/// `bin_size` 字节且当前前缀不同于上次写出的前缀时，产生一个检查点，
/// 其偏移是当前前缀段的起始位置。
#[derive(Clone, Debug)]
pub struct BinTracker {
    prefix_size: usize,
    bin_size: u64,
    last_prefix: Option<String>,
    written_prefix: Option<String>,
    // 初始为 -bin_size，保证第一行必定产生检查点
    written_pos: i64,
    start_prefix_pos: u64,
}

impl BinTracker {
    pub fn new(prefix_size: usize, bin_size: u64) -> Self {
        Self {
            prefix_size,
            bin_size,
            last_prefix: None,
            written_prefix: None,
            written_pos: -(bin_size as i64),
            start_prefix_pos: 0,
        }
    }

    pub fn prefix_size(&self) -> usize {
        self.prefix_size
    }

    /// 返回需要写出的检查点偏移（前缀段起点）
    pub fn observe(&mut self, word: &str, offset: u64) -> Option<u64> {
        let cur = truncate_prefix(word, self.prefix_size);
        if self.last_prefix.as_deref() != Some(cur) {
            self.start_prefix_pos = offset;
            self.last_prefix = Some(cur.to_string());
        }

        if offset as i64 - self.written_pos >= self.bin_size as i64
            && self.written_prefix.as_deref() != Some(cur)
        {
            self.written_pos = offset as i64;
            self.written_prefix = Some(cur.to_string());
            return Some(self.start_prefix_pos);
        }
        None
    }

    /// 最近一次检查点的前缀（未补齐）
    pub fn written_prefix(&self) -> Option<&str> {
        self.written_prefix.as_deref()
    }
}

/// 单个候选前缀长度的分箱统计
#[derive(Clone, Debug)]
struct Candidate {
    tracker: BinTracker,
    last_bin: u64,
    span_total: u64,
    span_count: u64,
    span_max: u64,
}

impl Candidate {
    fn new(size: usize, bin_size: u64) -> Self {
        Self {
            tracker: BinTracker::new(size, bin_size),
            last_bin: 0,
            span_total: 0,
            span_count: 0,
            span_max: 0,
        }
    }

    fn observe(&mut self, word: &str, offset: u64) {
        if let Some(start) = self.tracker.observe(word, offset) {
            let span = start - self.last_bin;
            self.span_total += span;
            self.span_max = self.span_max.max(span);
            self.span_count += 1;
            self.last_bin = start;
        }
    }

    fn acceptable(&self, total_bytes: u64, bin_size: u64) -> bool {
        let avg = if self.span_count == 0 {
            0.0
        } else {
            self.span_total as f64 / self.span_count as f64
        };
        // span_total == 0：全部挤进了第一个箱
        let lumped = self.span_total == 0 && total_bytes > bin_size;
        !(lumped || avg > 3.0 * bin_size as f64 || self.span_max > 10 * bin_size)
    }
}

/// 选出使分箱大小足够均匀的最短前缀长度。
///
/// 候选为 `min..max`，一次扫描中为每个候选维护独立状态；
/// 都不满足时回退到 `max`。
pub fn optimize_prefix_size<R: BufRead>(
    mut ix: R,
    min: usize,
    max: usize,
    bin_size: u64,
) -> std::io::Result<usize> {
    let mut candidates: Vec<Candidate> = (min..max).map(|p| Candidate::new(p, bin_size)).collect();
    if candidates.is_empty() {
        return Ok(max);
    }

    let mut buf = Vec::with_capacity(256);
    let mut bytes = 0u64;
    loop {
        buf.clear();
        if ix.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line_len = if buf.last() == Some(&b'\n') {
            buf.len() - 1
        } else {
            buf.len()
        };
        let word = String::from_utf8_lossy(word_of(&buf[..line_len]));
        for c in candidates.iter_mut() {
            c.observe(&word, bytes);
        }
        bytes += line_len as u64 + 1;
    }

    let chosen = candidates
        .iter()
        .find(|c| c.acceptable(bytes, bin_size))
        .map(|c| c.tracker.prefix_size())
        .unwrap_or(max);
    tracing::info!(
        "Optimized prefix size: {} ({} ix bytes, bin size {})",
        chosen,
        bytes,
        bin_size
    );
    Ok(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_BIN_SIZE, DEFAULT_MAX_PREFIX_SIZE, DEFAULT_MIN_PREFIX_SIZE};
    use std::io::Cursor;

    fn optimize(content: &str) -> usize {
        optimize_prefix_size(
            Cursor::new(content.as_bytes()),
            DEFAULT_MIN_PREFIX_SIZE,
            DEFAULT_MAX_PREFIX_SIZE,
            DEFAULT_BIN_SIZE,
        )
        .unwrap()
    }

    /// 5000 行、每行 22 字节、前 13 个字符全部相同
    fn shared_prefix_ix() -> String {
        (0..5000)
            .map(|i| format!("sameprefix000{:04} x,1\n", i))
            .collect()
    }

    #[test]
    fn prefix_is_padded_and_truncated() {
        assert_eq!(padded_prefix("ab", 5), "ab   ");
        assert_eq!(padded_prefix("verylongword", 10), "verylongwo");
        assert_eq!(padded_prefix("", 3), "   ");
    }

    #[test]
    fn prefix_counts_chars_not_bytes() {
        assert_eq!(truncate_prefix("aé", 2), "aé");
        assert_eq!(truncate_prefix("aéb", 2), "aé");
        assert_eq!(padded_prefix("é", 3), "é  ");
        assert_eq!(padded_prefix("日本語", 2), "日本");
        assert_eq!(padded_prefix("日本語", 4).chars().count(), 4);
    }

    #[test]
    fn multibyte_prefixes_stay_ordered() {
        // "a!" < "aé" < "b"：按字节截断会把 "aé" 退成 "a "，顺序倒退
        let words = ["a!", "aé", "aéz", "b", "ü", "üb", "日本", "日本語"];
        let prefixes: Vec<String> = words.iter().map(|w| padded_prefix(w, 2)).collect();
        for pair in prefixes.windows(2) {
            assert!(pair[0] <= pair[1], "{:?} > {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn small_files_use_minimum() {
        assert_eq!(optimize("apple data1\nbanana data2\ncherry data3\n"), 5);
        assert_eq!(optimize(""), 5);
        assert_eq!(optimize("onlyword somedata\n"), 5);
        let same: String = (0..50).map(|i| format!("sameprefix{} data{}\n", i, i)).collect();
        assert_eq!(optimize(&same), 5);
    }

    #[test]
    fn shared_prefix_grows_until_bins_split() {
        // P<=13 时所有行同一前缀（全部挤进一个箱）；P=14 时切成 5 段、每段 22000 字节
        assert_eq!(optimize(&shared_prefix_ix()), 14);
    }

    #[test]
    fn falls_back_to_max_when_nothing_qualifies() {
        let ix: String = (0..4000).map(|i| format!("{}{:05} x,1\n", "q".repeat(45), i)).collect();
        assert_eq!(optimize(&ix), DEFAULT_MAX_PREFIX_SIZE);
    }

    #[test]
    fn empty_candidate_range_returns_max() {
        let p = optimize_prefix_size(Cursor::new(b"a x,1\n".as_slice()), 8, 8, 16).unwrap();
        assert_eq!(p, 8);
    }

    #[test]
    fn tracker_first_line_always_checkpoints() {
        let mut t = BinTracker::new(5, DEFAULT_BIN_SIZE);
        assert_eq!(t.observe("apple", 0), Some(0));
        assert_eq!(t.written_prefix(), Some("apple"));
        assert_eq!(t.observe("banana", 14), None);
    }

    #[test]
    fn tracker_checkpoint_points_at_prefix_run_start() {
        let mut t = BinTracker::new(2, 10);
        assert_eq!(t.observe("aa1", 0), Some(0));
        assert_eq!(t.observe("bb1", 4), None);
        // 同前缀 "bb" 的第二行跨过了 bin，但偏移指向 "bb" 段起点
        assert_eq!(t.observe("bb2", 12), Some(4));
        // 与上次写出的前缀相同：不重复写
        assert_eq!(t.observe("bb3", 30), None);
        assert_eq!(t.observe("cc1", 40), Some(40));
    }
}
