use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{ChildStdin, ChildStdout, Command, Stdio};

use crossbeam::channel::{Receiver, Sender};

use crate::error::{Error, Result};
use crate::sort::{LineSorter, SortStats};

/// 系统 `sort` 工具后端（`sort -k1,1`，`LC_ALL=C` 保证字节序）
#[derive(Clone, Debug)]
pub struct SystemSorter {
    program: PathBuf,
}

impl SystemSorter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// 在 PATH 中查找可用的 sort 程序
    pub fn detect(program: &str) -> Option<Self> {
        find_program(program).map(Self::new)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

impl LineSorter for SystemSorter {
    fn name(&self) -> &'static str {
        "system"
    }

    fn sort(&self, input: Receiver<String>, output: Sender<String>) -> Result<SortStats> {
        let mut child = Command::new(&self.program)
            .arg("-k1,1")
            .env("LC_ALL", "C")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| Error::SortSpawn {
                program: self.program_name(),
                source,
            })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| std::io::Error::other("sort stdin was not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("sort stdout was not captured"))?;

        tracing::debug!("Spawned {:?} (pid {})", self.program, child.id());

        let (fed, drained) = std::thread::scope(|s| {
            let feeder = s.spawn(move || feed(input, stdin));
            let drained = drain(stdout, &output);
            if drained.is_err() {
                // 下游已失败：终止子进程，让 feeder 因 EPIPE 退出
                let _ = child.kill();
            }
            let fed = feeder
                .join()
                .unwrap_or(Err(Error::StagePanicked("sort feeder")));
            (fed, drained)
        });

        let status = child.wait()?;
        let lines = drained?;
        if !status.success() {
            return Err(Error::SortCommand {
                program: self.program_name(),
                status,
            });
        }
        let fed = fed?;
        if fed != lines {
            return Err(Error::SortLineCount {
                backend: self.program_name(),
                fed,
                sorted: lines,
            });
        }
        Ok(SortStats { runs: 0, lines })
    }
}

fn feed(input: Receiver<String>, stdin: ChildStdin) -> Result<u64> {
    let mut w = BufWriter::new(stdin);
    let mut n = 0u64;
    for line in input {
        w.write_all(line.as_bytes())?;
        w.write_all(b"\n")?;
        n += 1;
    }
    w.flush()?;
    Ok(n)
}

fn drain(stdout: ChildStdout, output: &Sender<String>) -> Result<u64> {
    let mut r = BufReader::new(stdout);
    let mut buf = Vec::with_capacity(256);
    let mut n = 0u64;
    loop {
        buf.clear();
        if r.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        let line = String::from_utf8_lossy(&buf).into_owned();
        output
            .send(line)
            .map_err(|_| Error::Disconnected("sorted lines"))?;
        n += 1;
    }
    Ok(n)
}

/// 在 PATH 中查找程序；Windows 上的 `sort` 语义不同，始终返回 None。
pub fn find_program(name: &str) -> Option<PathBuf> {
    if cfg!(windows) {
        return None;
    }
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|p| p.is_file())
}
