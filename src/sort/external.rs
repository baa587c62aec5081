use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crossbeam::channel::{Receiver, Sender};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::sort::workdir::WorkDir;
use crate::sort::{LineSorter, SortStats};

/// run 文件的固定读块大小；一行可以跨越任意多个块
pub const READ_CHUNK: usize = 512;

/// 进程内外排：分块排序成 run 文件 + 堆上 k 路归并
///
/// 内存上界：建 run 时 O(run_size_limit) 行，归并时 O(run 数) 个 reader，
/// 与输入总量无关。
#[derive(Clone, Debug)]
pub struct ExternalSorter {
    work_dir: Option<PathBuf>,
    run_size_limit: usize,
}

impl ExternalSorter {
    pub fn new(work_dir: Option<PathBuf>, run_size_limit: usize) -> Self {
        Self {
            work_dir,
            run_size_limit: run_size_limit.max(1),
        }
    }
}

impl LineSorter for ExternalSorter {
    fn name(&self) -> &'static str {
        "in-process"
    }

    fn sort(&self, input: Receiver<String>, output: Sender<String>) -> Result<SortStats> {
        let dir = WorkDir::provision(self.work_dir.as_deref())?;
        sort_runs(input, &dir, self.run_size_limit, |line| {
            output
                .send(line)
                .map_err(|_| Error::Disconnected("sorted lines"))
        })
    }
}

/// 对任意行流做字节序排序，结果逐行交给 `emit`。
///
/// run 文件写在 `work_dir` 下本次排序独占的子目录中；
/// 结束时（无论成功与否）连同子目录一起删除。`work_dir` 必须已存在。
pub fn external_sort<I, F>(
    input: I,
    work_dir: &Path,
    run_size_limit: usize,
    emit: F,
) -> Result<SortStats>
where
    I: IntoIterator<Item = String>,
    F: FnMut(String) -> Result<()>,
{
    let dir = WorkDir::create_in(work_dir)?;
    sort_runs(input, &dir, run_size_limit, emit)
}

fn sort_runs<I, F>(input: I, dir: &WorkDir, run_size_limit: usize, mut emit: F) -> Result<SortStats>
where
    I: IntoIterator<Item = String>,
    F: FnMut(String) -> Result<()>,
{
    let mut runs = RunSet::new(dir.path());
    let lines = runs.create(input, run_size_limit.max(1))?;
    tracing::info!(
        "External sort: {} lines in {} runs (limit {})",
        lines,
        runs.len(),
        run_size_limit
    );
    let emitted = merge_runs(runs.paths(), &mut emit)?;
    if emitted != lines {
        return Err(Error::SortLineCount {
            backend: "in-process".into(),
            fed: lines,
            sorted: emitted,
        });
    }
    let stats = SortStats {
        runs: runs.len(),
        lines: emitted,
    };
    runs.cleanup();
    Ok(stats)
}

/// 本次排序拥有的 run 文件；Drop 时尽力删除。
struct RunSet {
    dir: PathBuf,
    paths: Vec<PathBuf>,
    created: usize,
}

impl RunSet {
    fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            paths: Vec::new(),
            created: 0,
        }
    }

    fn len(&self) -> usize {
        self.created
    }

    fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    fn create<I>(&mut self, input: I, limit: usize) -> Result<u64>
    where
        I: IntoIterator<Item = String>,
    {
        let mut buf: Vec<String> = Vec::with_capacity(limit.min(1 << 16));
        let mut lines = 0u64;
        for line in input {
            buf.push(line);
            lines += 1;
            if buf.len() >= limit {
                self.flush(&mut buf)?;
            }
        }
        if !buf.is_empty() {
            self.flush(&mut buf)?;
        }
        Ok(lines)
    }

    fn flush(&mut self, buf: &mut Vec<String>) -> Result<()> {
        buf.par_sort_unstable();

        let path = self.dir.join(format!("es_{}.tmp", self.created));
        let file = File::create(&path).map_err(|e| Error::open(&path, e))?;
        // 先登记再写：写一半失败也能被清理
        self.paths.push(path);
        self.created += 1;

        let mut w = BufWriter::new(file);
        for line in buf.drain(..) {
            w.write_all(line.as_bytes())?;
            w.write_all(b"\n")?;
        }
        w.flush()?;
        tracing::debug!("Wrote sort run #{}", self.created - 1);
        Ok(())
    }

    fn cleanup(&mut self) {
        for p in self.paths.drain(..) {
            if let Err(e) = std::fs::remove_file(&p) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to remove sort run {:?}: {}", p, e);
                }
            }
        }
    }
}

impl Drop for RunSet {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// run 中的下一行，或 run 已耗尽。
///
/// 派生的 `Ord` 让 `EndOfRun` 永远大于任何行（包括空行）。
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum RunLine {
    Line(String),
    EndOfRun,
}

/// 按固定大小块读取 run，自行拼接跨块的行。
pub(crate) struct RunReader<R> {
    inner: R,
    buf: Vec<u8>,
    start: usize,
    eof: bool,
}

impl<R: Read> RunReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(READ_CHUNK * 2),
            start: 0,
            eof: false,
        }
    }

    pub(crate) fn next_line(&mut self) -> std::io::Result<RunLine> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(i) = self.buf[self.start..].iter().position(|&b| b == b'\n') {
                let end = self.start + i;
                let line = decode(&self.buf[self.start..end])?;
                self.start = end + 1;
                return Ok(RunLine::Line(line));
            }
            if self.eof {
                // 末行缺少换行符时仍是完整的一行
                if self.start < self.buf.len() {
                    let line = decode(&self.buf[self.start..])?;
                    self.start = self.buf.len();
                    return Ok(RunLine::Line(line));
                }
                return Ok(RunLine::EndOfRun);
            }

            self.buf.drain(..self.start);
            self.start = 0;
            let n = self.inner.read(&mut chunk)?;
            if n == 0 {
                self.eof = true;
            } else {
                self.buf.extend_from_slice(&chunk[..n]);
            }
        }
    }
}

fn decode(bytes: &[u8]) -> std::io::Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

struct HeapItem {
    line: RunLine,
    run: usize,
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.line == other.line
    }
}

impl Eq for HeapItem {}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.line.cmp(&other.line)
    }
}

fn open_run(path: &Path) -> Result<RunReader<File>> {
    let f = File::open(path).map_err(|e| Error::open(path, e))?;
    Ok(RunReader::new(f))
}

fn merge_runs<F>(paths: &[PathBuf], emit: &mut F) -> Result<u64>
where
    F: FnMut(String) -> Result<()>,
{
    let mut emitted = 0u64;

    if paths.len() == 1 {
        let mut reader = open_run(&paths[0])?;
        while let RunLine::Line(line) = reader.next_line()? {
            emit(line)?;
            emitted += 1;
        }
        return Ok(emitted);
    }

    let mut readers = paths
        .iter()
        .map(|p| open_run(p))
        .collect::<Result<Vec<_>>>()?;

    // 小顶堆：BinaryHeap 是大顶堆，用 Reverse 翻转
    let mut heap = BinaryHeap::with_capacity(readers.len());
    for (run, reader) in readers.iter_mut().enumerate() {
        heap.push(Reverse(HeapItem {
            line: reader.next_line()?,
            run,
        }));
    }

    // 每次弹出根、从同一 run 补位、下沉；根耗尽即全部耗尽。
    while let Some(mut root) = heap.peek_mut() {
        if matches!(root.0.line, RunLine::EndOfRun) {
            break;
        }
        let next = readers[root.0.run].next_line()?;
        let prev = std::mem::replace(&mut root.0.line, next);
        drop(root);
        if let RunLine::Line(line) = prev {
            emit(line)?;
            emitted += 1;
        }
    }
    Ok(emitted)
}
