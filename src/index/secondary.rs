use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::index::prefix::{optimize_prefix_size, padded_prefix, word_of, BinTracker};

/// ixx 记录中偏移量的十六进制位数
pub const ADDRESS_SIZE: usize = 10;
const MAX_ADDRESS: u64 = (1 << (4 * ADDRESS_SIZE)) - 1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IxxStats {
    pub prefix_size: usize,
    pub entries: u64,
    /// 扫描过的 ix 字节数
    pub ix_bytes: u64,
}

/// 定宽 ixx 记录：`<prefix><10 位大写十六进制偏移>\n`，前缀按字符计宽
pub fn format_entry(prefix: &str, prefix_size: usize, offset: u64) -> String {
    format!(
        "{}{:0width$X}\n",
        padded_prefix(prefix, prefix_size),
        offset,
        width = ADDRESS_SIZE
    )
}

/// 扫描已排序的 ix，写出稀疏的 (前缀, 字节偏移) 检查点。
pub fn write_ixx<R: BufRead, W: Write>(
    mut ix: R,
    out: W,
    prefix_size: usize,
    bin_size: u64,
) -> Result<IxxStats> {
    let mut out = BufWriter::new(out);
    let mut tracker = BinTracker::new(prefix_size, bin_size);
    let mut buf = Vec::with_capacity(256);
    let mut bytes = 0u64;
    let mut entries = 0u64;

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
        if let Some(start) = tracker.observe(&word, bytes) {
            if start > MAX_ADDRESS {
                return Err(Error::Io(std::io::Error::other(format!(
                    "ix offset {start} does not fit in {ADDRESS_SIZE} hex digits"
                ))));
            }
            let prefix = tracker.written_prefix().unwrap_or("");
            out.write_all(format_entry(prefix, prefix_size, start).as_bytes())?;
            entries += 1;
        }
        bytes += line_len as u64 + 1;
    }
    out.flush()?;

    Ok(IxxStats {
        prefix_size,
        entries,
        ix_bytes: bytes,
    })
}

fn open_ix(path: &Path) -> Result<BufReader<File>> {
    let f = File::open(path).map_err(|e| Error::open(path, e))?;
    Ok(BufReader::new(f))
}

/// 对 ix 文件运行前缀长度优化
pub fn optimize_ix_file(ix_path: &Path, config: &IndexConfig) -> Result<usize> {
    let p = optimize_prefix_size(
        open_ix(ix_path)?,
        config.min_prefix_size,
        config.max_prefix_size,
        config.bin_size,
    )?;
    Ok(p)
}

/// ix 文件 -> ixx 文件；`prefix_size` 为 None 时先优化前缀长度。
pub fn make_ixx(
    ix_path: &Path,
    ixx_path: &Path,
    prefix_size: Option<usize>,
    config: &IndexConfig,
) -> Result<IxxStats> {
    let prefix_size = match prefix_size {
        Some(p) => p,
        None => optimize_ix_file(ix_path, config)?,
    };

    let out = File::create(ixx_path).map_err(|e| Error::open(ixx_path, e))?;
    let stats = write_ixx(open_ix(ix_path)?, out, prefix_size, config.bin_size)?;
    tracing::info!(
        "Wrote {:?}: {} entries, prefix size {}",
        ixx_path,
        stats.entries,
        prefix_size
    );
    Ok(stats)
}
