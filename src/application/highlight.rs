//! Lightweight syntax highlighting for fenced code blocks.
//!
//! Splits code into keyword, string, comment, number and literal tokens
//! according to the fence's declared language. Unknown languages come back
//! as plain text, one token per line.

/// Token category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Plain,
    Keyword,
    Literal,
    String,
    Number,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

/// Lexical rules for one language.
struct Language {
    keywords: &'static [&'static str],
    literals: &'static [&'static str],
    line_comment: &'static [&'static str],
    block_comment: Option<(&'static str, &'static str)>,
    quotes: &'static [char],
    case_insensitive: bool,
}

const RUST: Language = Language {
    keywords: &[
        "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
        "extern", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut",
        "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "type",
        "unsafe", "use", "where", "while",
    ],
    literals: &["true", "false", "None", "Some", "Ok", "Err"],
    line_comment: &["//"],
    block_comment: Some(("/*", "*/")),
    quotes: &['"'],
    case_insensitive: false,
};

const JAVASCRIPT: Language = Language {
    keywords: &[
        "async", "await", "break", "case", "catch", "class", "const", "continue", "default",
        "delete", "do", "else", "export", "extends", "finally", "for", "from", "function", "if",
        "import", "in", "instanceof", "interface", "let", "new", "of", "return", "static",
        "switch", "this", "throw", "try", "type", "typeof", "var", "void", "while", "yield",
    ],
    literals: &["true", "false", "null", "undefined", "NaN"],
    line_comment: &["//"],
    block_comment: Some(("/*", "*/")),
    quotes: &['"', '\'', '`'],
    case_insensitive: false,
};

const JAVA: Language = Language {
    keywords: &[
        "abstract", "boolean", "break", "case", "catch", "class", "continue", "default", "do",
        "double", "else", "enum", "extends", "final", "finally", "float", "for", "if",
        "implements", "import", "instanceof", "int", "interface", "long", "new", "package",
        "private", "protected", "public", "return", "static", "super", "switch", "this",
        "throw", "throws", "try", "var", "void", "while",
    ],
    literals: &["true", "false", "null"],
    line_comment: &["//"],
    block_comment: Some(("/*", "*/")),
    quotes: &['"', '\''],
    case_insensitive: false,
};

const PYTHON: Language = Language {
    keywords: &[
        "and", "as", "async", "await", "break", "class", "continue", "def", "del", "elif",
        "else", "except", "finally", "for", "from", "if", "import", "in", "is", "lambda",
        "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
    ],
    literals: &["True", "False", "None"],
    line_comment: &["#"],
    block_comment: None,
    quotes: &['"', '\''],
    case_insensitive: false,
};

const SQL: Language = Language {
    keywords: &[
        "select", "from", "where", "insert", "into", "values", "update", "set", "delete",
        "create", "table", "alter", "drop", "index", "join", "left", "right", "inner", "outer",
        "on", "group", "by", "order", "having", "limit", "as", "and", "or", "not", "in",
        "primary", "key", "foreign", "references", "distinct", "union",
    ],
    literals: &["null", "true", "false"],
    line_comment: &["--"],
    block_comment: Some(("/*", "*/")),
    quotes: &['\''],
    case_insensitive: true,
};

const SHELL: Language = Language {
    keywords: &[
        "if", "then", "else", "elif", "fi", "for", "while", "do", "done", "case", "esac",
        "in", "function", "return", "export", "local",
    ],
    literals: &["true", "false"],
    line_comment: &["#"],
    block_comment: None,
    quotes: &['"', '\''],
    case_insensitive: false,
};

const JSON: Language = Language {
    keywords: &[],
    literals: &["true", "false", "null"],
    line_comment: &[],
    block_comment: None,
    quotes: &['"'],
    case_insensitive: false,
};

const YAML: Language = Language {
    keywords: &[],
    literals: &["true", "false", "null", "yes", "no", "~"],
    line_comment: &["#"],
    block_comment: None,
    quotes: &['"', '\''],
    case_insensitive: false,
};

const TOML: Language = Language {
    keywords: &[],
    literals: &["true", "false"],
    line_comment: &["#"],
    block_comment: None,
    quotes: &['"', '\''],
    case_insensitive: false,
};

fn language(name: &str) -> Option<&'static Language> {
    match name.to_ascii_lowercase().as_str() {
        "rust" | "rs" => Some(&RUST),
        "javascript" | "js" | "jsx" | "typescript" | "ts" | "tsx" => Some(&JAVASCRIPT),
        "java" | "kotlin" | "kt" | "csharp" | "cs" | "c#" => Some(&JAVA),
        "python" | "py" => Some(&PYTHON),
        "sql" | "postgres" | "postgresql" | "mysql" => Some(&SQL),
        "bash" | "sh" | "shell" | "zsh" | "console" => Some(&SHELL),
        "json" | "jsonc" => Some(&JSON),
        "yaml" | "yml" => Some(&YAML),
        "toml" | "ini" => Some(&TOML),
        _ => None,
    }
}

/// Highlight `code`, one token list per line.
#[must_use]
pub fn highlight(language_name: Option<&str>, code: &str) -> Vec<Vec<Token>> {
    let Some(lang) = language_name.and_then(language) else {
        return code
            .split('\n')
            .map(|line| {
                if line.is_empty() {
                    Vec::new()
                } else {
                    vec![Token {
                        kind: TokenKind::Plain,
                        text: line.to_string(),
                    }]
                }
            })
            .collect();
    };

    let mut in_block_comment = false;
    code.split('\n')
        .map(|line| tokenize_line(lang, line, &mut in_block_comment))
        .collect()
}

fn tokenize_line(lang: &Language, line: &str, in_block_comment: &mut bool) -> Vec<Token> {
    let mut tokens = Tokens::default();
    let mut i = 0;

    while i < line.len() {
        let rest = &line[i..];

        if *in_block_comment {
            let (_, close) = lang.block_comment.unwrap_or(("", ""));
            match rest.find(close).filter(|_| !close.is_empty()) {
                Some(end) => {
                    tokens.push(TokenKind::Comment, &rest[..end + close.len()]);
                    i += end + close.len();
                    *in_block_comment = false;
                }
                None => {
                    tokens.push(TokenKind::Comment, rest);
                    break;
                }
            }
            continue;
        }

        if lang.line_comment.iter().any(|marker| rest.starts_with(marker)) {
            tokens.push(TokenKind::Comment, rest);
            break;
        }

        if let Some((open, _)) = lang.block_comment {
            if rest.starts_with(open) {
                *in_block_comment = true;
                tokens.push(TokenKind::Comment, open);
                i += open.len();
                continue;
            }
        }

        let Some(c) = rest.chars().next() else {
            break;
        };

        if lang.quotes.contains(&c) {
            let len = string_len(rest, c);
            tokens.push(TokenKind::String, &rest[..len]);
            i += len;
        } else if c.is_ascii_digit() {
            let len = rest
                .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '.' || ch == '_'))
                .unwrap_or(rest.len());
            tokens.push(TokenKind::Number, &rest[..len]);
            i += len;
        } else if c.is_alphabetic() || c == '_' || c == '~' {
            let len = if c == '~' {
                1
            } else {
                rest.find(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
                    .unwrap_or(rest.len())
            };
            let word = &rest[..len];
            tokens.push(classify(lang, word), word);
            i += len;
        } else {
            tokens.push(TokenKind::Plain, &rest[..c.len_utf8()]);
            i += c.len_utf8();
        }
    }

    tokens.finish()
}

/// Byte length of a quoted string starting at `rest`, unterminated strings run to end of line.
fn string_len(rest: &str, quote: char) -> usize {
    let mut escaped = false;
    for (idx, c) in rest.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return idx + c.len_utf8();
        }
    }
    rest.len()
}

fn classify(lang: &Language, word: &str) -> TokenKind {
    let matches = |list: &[&str]| {
        if lang.case_insensitive {
            list.iter().any(|k| k.eq_ignore_ascii_case(word))
        } else {
            list.contains(&word)
        }
    };

    if matches(lang.keywords) {
        TokenKind::Keyword
    } else if matches(lang.literals) {
        TokenKind::Literal
    } else {
        TokenKind::Plain
    }
}

/// Token accumulator merging adjacent plain text.
#[derive(Default)]
struct Tokens(Vec<Token>);

impl Tokens {
    fn push(&mut self, kind: TokenKind, text: &str) {
        if let Some(last) = self.0.last_mut() {
            if last.kind == kind && kind != TokenKind::String {
                last.text.push_str(text);
                return;
            }
        }
        self.0.push(Token {
            kind,
            text: text.to_string(),
        });
    }

    fn finish(self) -> Vec<Token> {
        self.0
    }
}
