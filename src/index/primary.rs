use std::io::{BufWriter, Write};

use serde::Serialize;

use crate::error::Result;
use crate::text::Grouper;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IxStats {
    /// 已排序的 posting 行数
    pub postings: u64,
    pub distinct_words: u64,
    pub ix_bytes: u64,
}

/// 把已排序的 `<word> <id>` 行分组写成 ix。
pub fn write_ix<I, W>(sorted: I, out: W) -> Result<IxStats>
where
    I: IntoIterator<Item = String>,
    W: Write,
{
    let mut out = BufWriter::new(out);
    let mut grouper = Grouper::new();
    let mut stats = IxStats::default();

    for line in sorted {
        stats.postings += 1;
        if let Some(group) = grouper.push(&line) {
            out.write_all(group.as_bytes())?;
            stats.ix_bytes += group.len() as u64;
        }
    }
    if let Some(group) = grouper.finish() {
        out.write_all(group.as_bytes())?;
        stats.ix_bytes += group.len() as u64;
    }
    out.flush()?;

    stats.distinct_words = grouper.groups();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_grouped_lines() {
        let mut out = Vec::new();
        let sorted = ["apple id1", "apple id2", "banana id3"].map(String::from);
        let stats = write_ix(sorted, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "apple id1,1 id2,2\nbanana id3,1\n");
        assert_eq!(stats.postings, 3);
        assert_eq!(stats.distinct_words, 2);
        assert_eq!(stats.ix_bytes, text.len() as u64);
    }

    #[test]
    fn empty_stream_writes_nothing() {
        let mut out = Vec::new();
        let stats = write_ix(Vec::<String>::new(), &mut out).unwrap();
        assert!(out.is_empty());
        assert_eq!(stats, IxStats::default());
    }
}
