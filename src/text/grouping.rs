/// 把已排序的 `<word> <id>` 行按 word 分组成 ix 行：
/// `<word> <id1>,1 <id2>,2 ...\n`
///
/// 序号是组内顺序号（1 起），不是单词在原文中的位置。
#[derive(Debug, Default)]
pub struct Grouper {
    current: Option<String>,
    buff: Vec<String>,
    groups: u64,
}

impl Grouper {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已输出的组数（即不同单词数）
    pub fn groups(&self) -> u64 {
        self.groups
    }

    /// 喂入一行；若这一行关闭了上一个组，返回该组的 ix 行。
    pub fn push(&mut self, line: &str) -> Option<String> {
        let cleaned;
        let line = if line.contains('\0') {
            cleaned = line.replace('\0', "");
            cleaned.as_str()
        } else {
            line
        };
        let (word, data) = line.split_once(' ').unwrap_or((line, ""));

        let mut done = None;
        if self.current.as_deref() != Some(word) {
            done = self.flush();
            self.current = Some(word.to_string());
        }
        self.buff.push(data.to_string());
        done
    }

    /// 输出最后一个未关闭的组
    pub fn finish(&mut self) -> Option<String> {
        self.flush()
    }

    fn flush(&mut self) -> Option<String> {
        if self.buff.is_empty() {
            return None;
        }
        let word = self.current.as_deref().unwrap_or("");
        let mut out = String::with_capacity(word.len() + self.buff.iter().map(|d| d.len() + 8).sum::<usize>());
        out.push_str(word);
        for (i, data) in self.buff.drain(..).enumerate() {
            out.push(' ');
            out.push_str(&data);
            out.push(',');
            out.push_str(&(i + 1).to_string());
        }
        out.push('\n');
        self.groups += 1;
        Some(out)
    }
}
