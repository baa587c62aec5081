use crate::config::TokenizerKind;
use crate::error::Result;

/// word-chars 模式下忽略的超长单词阈值（字节）
pub const MAX_WORD_LEN: usize = 32;

const fn is_ascii_alnum(c: u8) -> bool {
    c.is_ascii_alphanumeric()
}

const fn word_begin_table() -> [bool; 256] {
    let mut t = [false; 256];
    let mut c = 0;
    while c < 256 {
        t[c] = is_ascii_alnum(c as u8);
        c += 1;
    }
    t[b'_' as usize] = true;
    t
}

const fn word_middle_table() -> [bool; 256] {
    let mut t = word_begin_table();
    t[b'.' as usize] = true;
    t[b'-' as usize] = true;
    t
}

/// 可作为单词开头的字符
static WORD_BEGIN: [bool; 256] = word_begin_table();
/// 可出现在单词中间的字符
static WORD_MIDDLE: [bool; 256] = word_middle_table();

/// 行分词器：`<id> <free text>` -> 若干 `<word> <id>` 行
///
/// 跨行无状态；id 原样保留，单词小写化。
#[derive(Clone, Copy, Debug, Default)]
pub struct LineTokenizer {
    kind: TokenizerKind,
}

impl LineTokenizer {
    pub fn new(kind: TokenizerKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> TokenizerKind {
        self.kind
    }

    /// 逐个发出 posting 行（不含换行符），返回发出的数量。
    pub fn emit<F>(&self, line: &str, mut sink: F) -> Result<usize>
    where
        F: FnMut(String) -> Result<()>,
    {
        let mut n = 0;
        match self.kind {
            TokenizerKind::Whitespace => {
                for posting in whitespace_postings(line) {
                    sink(posting)?;
                    n += 1;
                }
            }
            TokenizerKind::WordChars => {
                for posting in word_char_postings(line) {
                    sink(posting)?;
                    n += 1;
                }
            }
        }
        Ok(n)
    }

    pub fn postings(&self, line: &str) -> Vec<String> {
        match self.kind {
            TokenizerKind::Whitespace => whitespace_postings(line).collect(),
            TokenizerKind::WordChars => word_char_postings(line).collect(),
        }
    }
}

/// 第一个字段是 id（行首为空白时 id 为空）；空字段不产生单词
fn whitespace_postings(line: &str) -> impl Iterator<Item = String> + '_ {
    let mut fields = line.split(char::is_whitespace);
    let id = fields.next().unwrap_or("");
    fields
        .filter(|word| !word.is_empty())
        .map(move |word| format!("{} {}", word.to_lowercase(), id))
}

fn split_id(line: &str) -> (&str, &str) {
    let line = line.trim_start();
    line.split_once(char::is_whitespace).unwrap_or((line, ""))
}

fn word_char_postings(line: &str) -> impl Iterator<Item = String> + '_ {
    let (id, text) = split_id(line);
    scan_words(text).map(move |word| format!("{} {}", word.to_ascii_lowercase(), id))
}

/// 按字符类扫描单词；切分点都落在 ASCII 字节上，所以切片总是合法 UTF-8。
fn scan_words(text: &str) -> impl Iterator<Item = &str> + '_ {
    let bytes = text.as_bytes();
    let mut i = 0usize;
    std::iter::from_fn(move || loop {
        while i < bytes.len() && !WORD_BEGIN[bytes[i] as usize] {
            i += 1;
        }
        if i >= bytes.len() {
            return None;
        }
        let start = i;
        while i < bytes.len() && WORD_MIDDLE[bytes[i] as usize] {
            i += 1;
        }
        if i - start < MAX_WORD_LEN {
            return Some(&text[start..i]);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ws(line: &str) -> Vec<String> {
        LineTokenizer::new(TokenizerKind::Whitespace).postings(line)
    }

    fn wc(line: &str) -> Vec<String> {
        LineTokenizer::new(TokenizerKind::WordChars).postings(line)
    }

    #[test]
    fn id_without_text_emits_nothing() {
        assert!(ws("id1").is_empty());
        assert!(ws("id1    ").is_empty());
        assert!(ws("").is_empty());
    }

    #[test]
    fn leading_whitespace_means_empty_id() {
        assert_eq!(ws(" id a"), vec!["id ", "a "]);
        assert_eq!(ws("\tWord"), vec!["word "]);
        assert!(ws("   ").is_empty());
    }

    #[test]
    fn words_are_lowercased_and_id_kept() {
        assert_eq!(ws("Gene1 BRCA1 Breast"), vec!["brca1 Gene1", "breast Gene1"]);
    }

    #[test]
    fn whitespace_runs_do_not_create_empty_words() {
        assert_eq!(ws("id1   word1 \t word2"), vec!["word1 id1", "word2 id1"]);
        assert_eq!(ws("id1\tword1\tword2"), vec!["word1 id1", "word2 id1"]);
    }

    #[test]
    fn punctuation_and_unicode_stay_inside_words() {
        assert_eq!(
            ws("id1 well-known snake_case MÜNCHEN 日本語"),
            vec![
                "well-known id1",
                "snake_case id1",
                "münchen id1",
                "日本語 id1"
            ]
        );
    }

    #[test]
    fn emit_counts_and_propagates_sink_errors() {
        let tok = LineTokenizer::new(TokenizerKind::Whitespace);
        let mut seen = Vec::new();
        let n = tok
            .emit("id a b c", |p| {
                seen.push(p);
                Ok(())
            })
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(seen.len(), 3);

        let err = tok
            .emit("id a b", |_| Err(crate::Error::Disconnected("test")))
            .unwrap_err();
        assert!(err.is_disconnect());
    }

    #[test]
    fn word_chars_split_on_punctuation() {
        assert_eq!(
            wc("id7 Hello, world! v1.2-beta (x)"),
            vec!["hello id7", "world id7", "v1.2-beta id7", "x id7"]
        );
    }

    #[test]
    fn word_chars_require_word_begin_char() {
        // '.' 与 '-' 只能出现在单词中间
        assert_eq!(wc("id .-foo -bar"), vec!["foo id", "bar id"]);
    }

    #[test]
    fn word_chars_skip_long_words() {
        let long = "a".repeat(MAX_WORD_LEN);
        let line = format!("id {} ok", long);
        assert_eq!(wc(&line), vec!["ok id"]);
    }

    #[test]
    fn char_tables_are_consistent() {
        for c in 0..256usize {
            if WORD_BEGIN[c] {
                assert!(WORD_MIDDLE[c]);
            }
        }
        assert!(WORD_BEGIN[b'_' as usize]);
        assert!(!WORD_BEGIN[b'-' as usize]);
        assert!(WORD_MIDDLE[b'-' as usize]);
        assert!(!WORD_MIDDLE[b' ' as usize]);
    }
}
