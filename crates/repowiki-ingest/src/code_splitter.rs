//! Line-annotated splitting of source files.
//!
//! The model is asked to reference code by line numbers, so file contents are
//! sent as small chunks, each preceded by a `# Lines a - b` header. Chunks
//! always hold whole lines; consecutive chunks may share up to
//! `chunk_overlap` characters of trailing lines.

use tracing::debug;

/// Language family of a source file, selected by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Go,
    Ruby,
    Rust,
    Php,
    Cpp,
    C,
    Java,
    Kotlin,
    CSharp,
    Scala,
    Swift,
    Lua,
    Perl,
    Haskell,
    Markdown,
}

impl Language {
    /// Detect the language from a file extension (without the dot).
    pub fn from_extension(extension: &str) -> Option<Self> {
        let language = match extension.to_lowercase().as_str() {
            "py" => Language::Python,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "ts" | "tsx" => Language::TypeScript,
            "go" => Language::Go,
            "rb" => Language::Ruby,
            "rs" => Language::Rust,
            "php" => Language::Php,
            "cpp" | "cc" | "cxx" | "hpp" | "hxx" => Language::Cpp,
            "c" | "h" => Language::C,
            "java" => Language::Java,
            "kt" => Language::Kotlin,
            "cs" => Language::CSharp,
            "scala" => Language::Scala,
            "swift" => Language::Swift,
            "lua" => Language::Lua,
            "pl" => Language::Perl,
            "hs" | "lhs" => Language::Haskell,
            "md" => Language::Markdown,
            _ => return None,
        };
        Some(language)
    }

    /// Line prefixes (after indentation) that start a new top-level construct.
    fn boundaries(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["class ", "def ", "async def ", "@"],
            Language::JavaScript | Language::TypeScript => &[
                "function ",
                "async function ",
                "class ",
                "export ",
                "const ",
                "let ",
                "interface ",
                "type ",
            ],
            Language::Go => &["func ", "type ", "var ", "const "],
            Language::Ruby => &["def ", "class ", "module "],
            Language::Rust => &[
                "fn ", "pub fn ", "pub(crate) fn ", "async fn ", "pub async fn ", "impl", "struct ",
                "pub struct ", "enum ", "pub enum ", "trait ", "pub trait ", "mod ", "pub mod ",
                "#[",
            ],
            Language::Php => &["function ", "class ", "public function ", "private function "],
            Language::Cpp | Language::C => &["class ", "struct ", "void ", "int ", "namespace ", "#"],
            Language::Java | Language::CSharp => &[
                "class ",
                "public ",
                "private ",
                "protected ",
                "interface ",
                "@",
            ],
            Language::Kotlin => &["fun ", "class ", "object ", "interface "],
            Language::Scala => &["def ", "class ", "object ", "trait "],
            Language::Swift => &["func ", "class ", "struct ", "enum ", "extension "],
            Language::Lua => &["function ", "local function "],
            Language::Perl => &["sub ", "package "],
            Language::Haskell => &["data ", "type ", "class ", "instance ", "module "],
            Language::Markdown => &["#"],
        }
    }
}

/// Splits code into line-numbered chunks.
#[derive(Debug, Clone)]
pub struct CodeSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for CodeSplitter {
    fn default() -> Self {
        Self::new(200, 25)
    }
}

impl CodeSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap,
        }
    }

    /// Split `code` of a file with the given extension.
    ///
    /// Returns `None` for languages without boundary rules.
    pub fn split_code(&self, extension: &str, code: &str) -> Option<String> {
        let language = Language::from_extension(extension)?;
        let lines: Vec<&str> = code.lines().collect();

        let mut out = String::new();
        for (from, to) in self.chunk_ranges(language, &lines) {
            out.push_str(&format!("# Lines {} - {}\n", from + 1, to));
            out.push_str(&lines[from..to].join("\n"));
            out.push_str("\n\n");
        }
        Some(out)
    }

    /// Annotate a file for the prompt, falling back to a single header for
    /// unsupported languages.
    pub fn annotate(&self, path: &str, code: &str) -> String {
        let extension = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        match self.split_code(extension, code) {
            Some(split) => split,
            None => {
                debug!("No code splitter for {}, sending raw content", path);
                format!("# Lines 1 - {}\n{}\n\n", code.lines().count(), code)
            }
        }
    }

    /// Half-open line ranges of every chunk.
    fn chunk_ranges(&self, language: Language, lines: &[&str]) -> Vec<(usize, usize)> {
        let boundaries = language.boundaries();
        let mut ranges = Vec::new();
        let mut start = 0;
        let mut current_len = 0;

        for (i, line) in lines.iter().enumerate() {
            let line_len = line.chars().count() + 1;
            let at_boundary = boundaries
                .iter()
                .any(|prefix| line.trim_start().starts_with(prefix));

            let full = current_len + line_len > self.chunk_size;
            let natural_break = at_boundary && current_len >= self.chunk_size / 2;

            if i > start && (full || natural_break) {
                ranges.push((start, i));
                start = self.overlap_start(lines, start, i);
                current_len = lines[start..i].iter().map(|l| l.chars().count() + 1).sum();
            }
            current_len += line_len;
        }

        if start < lines.len() {
            ranges.push((start, lines.len()));
        }

        ranges
    }

    /// First line of the next chunk: trailing lines of `start..end` fitting in
    /// the overlap, never the whole previous chunk.
    fn overlap_start(&self, lines: &[&str], start: usize, end: usize) -> usize {
        let mut next = end;
        let mut carried = 0;
        while next > start + 1 {
            let len = lines[next - 1].chars().count() + 1;
            if carried + len > self.chunk_overlap {
                break;
            }
            carried += len;
            next -= 1;
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_file_single_chunk() {
        let splitter = CodeSplitter::default();
        let out = splitter.split_code("rs", "fn main() {\n    println!(\"hi\");\n}").unwrap();
        assert_eq!(out, "# Lines 1 - 3\nfn main() {\n    println!(\"hi\");\n}\n\n");
    }

    #[test]
    fn test_unsupported_extension() {
        let splitter = CodeSplitter::default();
        assert!(splitter.split_code("png", "data").is_none());

        let out = splitter.annotate("assets/notes.txt", "a\nb");
        assert_eq!(out, "# Lines 1 - 2\na\nb\n\n");
    }

    #[test]
    fn test_chunks_cover_every_line() {
        let splitter = CodeSplitter::new(60, 0);
        let code: Vec<String> = (1..=30).map(|i| format!("let value_{} = {};", i, i)).collect();
        let code = code.join("\n");

        let lines: Vec<&str> = code.lines().collect();
        let ranges = splitter.chunk_ranges(Language::JavaScript, &lines);

        assert!(ranges.len() > 1);
        assert_eq!(ranges[0].0, 0);
        assert_eq!(ranges.last().unwrap().1, 30);
        for pair in ranges.windows(2) {
            // Without overlap, chunks are contiguous
            assert_eq!(pair[0].1, pair[1].0);
        }
    }

    #[test]
    fn test_overlap_repeats_trailing_lines() {
        let splitter = CodeSplitter::new(40, 12);
        let code = "aaaaaaaaa\nbbbbbbbbb\ncccccccc\nddddddddd\neeeeeeeee\nfffffffff";
        let lines: Vec<&str> = code.lines().collect();
        let ranges = splitter.chunk_ranges(Language::Go, &lines);

        assert!(ranges.len() > 1);
        for pair in ranges.windows(2) {
            assert!(pair[1].0 < pair[0].1, "chunks should overlap: {:?}", ranges);
            assert!(pair[1].0 > pair[0].0, "chunks must make progress: {:?}", ranges);
        }
    }

    #[test]
    fn test_breaks_at_definitions() {
        let splitter = CodeSplitter::new(200, 0);
        let body = "    x = 1\n".repeat(12);
        let code = format!("def first():\n{}def second():\n    return 2\n", body);

        let out = splitter.split_code("py", &code).unwrap();
        assert!(out.starts_with("# Lines 1 - 13\n"));
        assert!(out.contains("# Lines 14 - 15\ndef second():"));
    }

    #[test]
    fn test_long_line_kept_whole() {
        let splitter = CodeSplitter::new(10, 0);
        let long = "x".repeat(50);
        let out = splitter.split_code("c", &format!("{}\nint y;", long)).unwrap();
        assert!(out.contains(&format!("# Lines 1 - 1\n{}\n\n", long)));
        assert!(out.contains("# Lines 2 - 2\nint y;"));
    }

    #[test]
    fn test_empty_code() {
        let splitter = CodeSplitter::default();
        assert_eq!(splitter.split_code("ts", "").unwrap(), "");
    }
}
