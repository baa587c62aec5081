use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::thread::ScopedJoinHandle;
use std::time::Instant;

use crossbeam::channel::{bounded, Sender};

use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::index::primary::{write_ix, IxStats};
use crate::index::secondary::{make_ixx, IxxStats};
use crate::sort::{select_sorter, LineSorter, SortStats};
use crate::stats::BuildReport;
use crate::text::LineTokenizer;

/// 一次 ix 构建的结果
#[derive(Clone, Debug)]
pub struct IxBuild {
    pub input_lines: u64,
    pub ix: IxStats,
    pub sort: SortStats,
    pub backend: &'static str,
}

/// 流水线编排：tokenize -> sort -> group -> ix 文件，再由 ix 生成 ixx
///
/// 各阶段之间是有界通道：下游缓冲满时上游阻塞，消费后自动恢复。
/// 任一阶段出错都会让相邻阶段因通道挂断而退出；最终报告第一个根因错误。
/// 出错后的输出文件不保证有效，调用方应丢弃。
pub struct IndexBuilder {
    config: IndexConfig,
}

impl IndexBuilder {
    pub fn new(config: IndexConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// 输入流 -> ix 文件
    pub fn make_ix<R: Read + Send>(&self, input: R, out_ix: &Path) -> Result<IxBuild> {
        let sorter = select_sorter(&self.config)?;
        self.make_ix_with(sorter.as_ref(), input, out_ix)
    }

    /// 使用指定排序后端构建 ix
    pub fn make_ix_with<R: Read + Send>(
        &self,
        sorter: &dyn LineSorter,
        input: R,
        out_ix: &Path,
    ) -> Result<IxBuild> {
        let out = File::create(out_ix).map_err(|e| Error::open(out_ix, e))?;
        let tokenizer = LineTokenizer::new(self.config.tokenizer);
        let (post_tx, post_rx) = bounded::<String>(self.config.channel_capacity);
        let (sorted_tx, sorted_rx) = bounded::<String>(self.config.channel_capacity);

        let (read, sorted, written) = std::thread::scope(|s| {
            let reader = s.spawn(move || tokenize_stage(input, tokenizer, post_tx));
            let sort = s.spawn(move || sorter.sort(post_rx, sorted_tx));
            let written = write_ix(sorted_rx, out);
            (join(reader, "tokenize"), join(sort, "sort"), written)
        });

        match (read, sorted, written) {
            (Ok(input_lines), Ok(sort), Ok(ix)) => {
                tracing::info!(
                    "Wrote {:?}: {} records, {} postings, {} words",
                    out_ix,
                    input_lines,
                    ix.postings,
                    ix.distinct_words
                );
                Ok(IxBuild {
                    input_lines,
                    ix,
                    sort,
                    backend: sorter.name(),
                })
            }
            (read, sorted, written) => {
                let err = root_cause([read.err(), sorted.err(), written.err()].into_iter().flatten())
                    .unwrap_or(Error::Disconnected("pipeline"));
                tracing::warn!("Building {:?} failed: {}", out_ix, err);
                Err(err)
            }
        }
    }

    /// ix 文件 -> ixx 文件（未配置固定前缀时自动优化）
    pub fn make_ixx(&self, ix: &Path, out_ixx: &Path) -> Result<IxxStats> {
        make_ixx(ix, out_ixx, self.config.prefix_size, &self.config)
    }

    /// 输入文件 -> ix + ixx
    pub fn ix_ixx(&self, input: &Path, out_ix: &Path, out_ixx: &Path) -> Result<BuildReport> {
        // 输入不可读时在创建任何输出前失败
        let f = File::open(input).map_err(|e| Error::open(input, e))?;
        self.ix_ixx_stream(f, out_ix, out_ixx)
    }

    /// 输入流 -> ix + ixx
    pub fn ix_ixx_stream<R: Read + Send>(
        &self,
        input: R,
        out_ix: &Path,
        out_ixx: &Path,
    ) -> Result<BuildReport> {
        let started = Instant::now();
        let ix = self.make_ix(input, out_ix)?;
        let ixx = self.make_ixx(out_ix, out_ixx)?;
        Ok(BuildReport {
            input_lines: ix.input_lines,
            postings: ix.ix.postings,
            distinct_words: ix.ix.distinct_words,
            ix_bytes: ix.ix.ix_bytes,
            ixx_entries: ixx.entries,
            prefix_size: ixx.prefix_size,
            sort_backend: ix.backend.to_string(),
            sort_runs: ix.sort.runs,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// 默认配置下：输入流 -> ix
pub fn make_ix<R: Read + Send>(input: R, out_ix: &Path) -> Result<IxBuild> {
    IndexBuilder::new(IndexConfig::default())?.make_ix(input, out_ix)
}

/// 默认配置下：输入文件 -> ix + ixx
pub fn ix_ixx(input: &Path, out_ix: &Path, out_ixx: &Path) -> Result<BuildReport> {
    IndexBuilder::new(IndexConfig::default())?.ix_ixx(input, out_ix, out_ixx)
}

/// 默认配置下：输入流 -> ix + ixx
pub fn ix_ixx_stream<R: Read + Send>(input: R, out_ix: &Path, out_ixx: &Path) -> Result<BuildReport> {
    IndexBuilder::new(IndexConfig::default())?.ix_ixx_stream(input, out_ix, out_ixx)
}

fn tokenize_stage<R: Read>(input: R, tokenizer: LineTokenizer, tx: Sender<String>) -> Result<u64> {
    let mut r = BufReader::with_capacity(1 << 16, input);
    let mut buf = Vec::with_capacity(256);
    let mut lines = 0u64;
    loop {
        buf.clear();
        if r.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        let line = String::from_utf8_lossy(&buf);
        tokenizer.emit(&line, |posting| {
            tx.send(posting).map_err(|_| Error::Disconnected("postings"))
        })?;
        lines += 1;
    }
    Ok(lines)
}

fn join<T>(handle: ScopedJoinHandle<'_, Result<T>>, stage: &'static str) -> Result<T> {
    handle
        .join()
        .unwrap_or_else(|_| Err(Error::StagePanicked(stage)))
}

/// 跳过“对端挂断”的连锁错误，返回第一个根因
fn root_cause(errors: impl IntoIterator<Item = Error>) -> Option<Error> {
    let mut fallback = None;
    for e in errors {
        if !e.is_disconnect() {
            return Some(e);
        }
        fallback.get_or_insert(e);
    }
    fallback
}
