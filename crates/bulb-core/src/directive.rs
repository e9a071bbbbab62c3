//! File directives embedded in assistant text.
//!
//! ```text
//! CREATE_FILE: <path>     followed by a fenced code block
//! DELETE_FILE: <path>     repeatable
//! ```lang\n...```         bare block: replace the active file
//! ```
//!
//! At most one directive is acted on per message, in the order create,
//! delete, update. All delete paths of a message form a single batch.
//!
//! [`DirectiveScanner`] keeps scan offsets so every pushed delta only
//! examines text that could still change the outcome.

const CREATE_TOKEN: &str = "CREATE_FILE:";
const DELETE_TOKEN: &str = "DELETE_FILE:";
const FENCE: &str = "```";

/// A parsed, not yet applied, file mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Create { path: String, code: String },
    Delete { paths: Vec<String> },
    /// Full replacement of the active file.
    Update { path: String, code: String },
}

/// Parse a complete message in one go.
pub fn parse(text: &str, active_file: Option<&str>) -> Option<Directive> {
    let mut scanner = DirectiveScanner::new();
    scanner.push(text);
    scanner.finish();
    scanner.directive(active_file)
}

/// Incremental directive scanner fed with stream deltas.
#[derive(Debug)]
pub struct DirectiveScanner {
    text: String,
    finished: bool,
    create: TokenScan,
    delete: TokenScan,
    fence: FenceScan,
}

impl Default for DirectiveScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectiveScanner {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            finished: false,
            create: TokenScan::new(CREATE_TOKEN, true),
            delete: TokenScan::new(DELETE_TOKEN, false),
            fence: FenceScan::Searching { cursor: 0 },
        }
    }

    /// Append a delta and scan the new suffix.
    pub fn push(&mut self, delta: &str) {
        if self.finished {
            return;
        }
        self.text.push_str(delta);
        self.advance();
    }

    /// Mark the text complete. Paths running up to the end of the text
    /// become final.
    pub fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            self.advance();
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Path named by the first complete `CREATE_FILE:` directive, used for
    /// a "currently writing" indicator while the code streams in.
    pub fn generating_file(&self) -> Option<&str> {
        self.create.paths.first().map(String::as_str)
    }

    /// The directive this text resolves to, given the file currently open.
    ///
    /// Once a `CREATE_FILE:` path is seen, the text is a create or nothing:
    /// without a closed code block it never falls through to delete or update.
    pub fn directive(&self, active_file: Option<&str>) -> Option<Directive> {
        let code = self.fence.code(&self.text);

        if let Some(path) = self.create.paths.first() {
            return code.map(|code| Directive::Create {
                path: path.clone(),
                code: code.to_string(),
            });
        }

        if !self.delete.paths.is_empty() {
            return Some(Directive::Delete {
                paths: self.delete.paths.clone(),
            });
        }

        match (code, active_file) {
            (Some(code), Some(path)) => Some(Directive::Update {
                path: path.to_string(),
                code: code.to_string(),
            }),
            _ => None,
        }
    }

    fn advance(&mut self) {
        self.create.advance(&self.text, self.finished);
        self.delete.advance(&self.text, self.finished);
        self.fence.advance(&self.text);
    }
}

// ---------------------------------------------------------------------------
// `TOKEN:\s*(\S+)`
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct TokenScan {
    token: &'static str,
    first_only: bool,
    cursor: usize,
    paths: Vec<String>,
}

enum PathScan {
    Complete { path: String, consumed: usize },
    /// The path may still grow.
    Pending,
    /// Only whitespace follows the token and the text is complete.
    Missing,
}

impl TokenScan {
    fn new(token: &'static str, first_only: bool) -> Self {
        Self {
            token,
            first_only,
            cursor: 0,
            paths: Vec::new(),
        }
    }

    fn advance(&mut self, text: &str, finished: bool) {
        loop {
            if self.first_only && !self.paths.is_empty() {
                return;
            }

            let Some(found) = text[self.cursor..].find(self.token) else {
                // A token may be cut off at the end of the text.
                let keep = self.token.len() - 1;
                let from = text.len().saturating_sub(keep).max(self.cursor);
                self.cursor = floor_char_boundary(text, from);
                return;
            };

            let token_start = self.cursor + found;
            let after = token_start + self.token.len();
            match read_path(&text[after..], finished) {
                PathScan::Complete { path, consumed } => {
                    self.paths.push(path);
                    self.cursor = after + consumed;
                }
                PathScan::Pending => {
                    self.cursor = token_start;
                    return;
                }
                PathScan::Missing => self.cursor = after,
            }
        }
    }
}

fn read_path(rest: &str, finished: bool) -> PathScan {
    let trimmed = rest.trim_start();
    let skipped = rest.len() - trimmed.len();
    if trimmed.is_empty() {
        return if finished {
            PathScan::Missing
        } else {
            PathScan::Pending
        };
    }

    match trimmed.find(char::is_whitespace) {
        Some(end) => PathScan::Complete {
            path: trimmed[..end].to_string(),
            consumed: skipped + end,
        },
        None if finished => PathScan::Complete {
            path: trimmed.to_string(),
            consumed: rest.len(),
        },
        None => PathScan::Pending,
    }
}

// ---------------------------------------------------------------------------
// ```(\w*)\n(.*?)```
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum FenceScan {
    Searching { cursor: usize },
    /// Opening fence found; reading the language tag.
    Header { open: usize },
    Body { start: usize, cursor: usize },
    Closed { start: usize, end: usize },
}

impl FenceScan {
    fn advance(&mut self, text: &str) {
        loop {
            match *self {
                FenceScan::Searching { cursor } => match text[cursor..].find(FENCE) {
                    Some(found) => {
                        *self = FenceScan::Header {
                            open: cursor + found,
                        };
                    }
                    None => {
                        let from = text.len().saturating_sub(FENCE.len() - 1).max(cursor);
                        *self = FenceScan::Searching {
                            cursor: floor_char_boundary(text, from),
                        };
                        return;
                    }
                },
                FenceScan::Header { open } => {
                    let tag_start = open + FENCE.len();
                    let header = &text[tag_start..];
                    let tag_len = header
                        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                        .unwrap_or(header.len());
                    match header[tag_len..].chars().next() {
                        Some('\n') => {
                            let start = tag_start + tag_len + 1;
                            *self = FenceScan::Body {
                                start,
                                cursor: start,
                            };
                        }
                        // Tag still streaming in.
                        None => return,
                        // Not an opening fence; look further along.
                        Some(_) => *self = FenceScan::Searching { cursor: open + 1 },
                    }
                }
                FenceScan::Body { start, cursor } => match text[cursor..].find(FENCE) {
                    Some(found) => {
                        *self = FenceScan::Closed {
                            start,
                            end: cursor + found,
                        };
                    }
                    None => {
                        let from = text.len().saturating_sub(FENCE.len() - 1).max(cursor);
                        *self = FenceScan::Body {
                            start,
                            cursor: floor_char_boundary(text, from),
                        };
                        return;
                    }
                },
                FenceScan::Closed { .. } => return,
            }
        }
    }

    fn code<'t>(&self, text: &'t str) -> Option<&'t str> {
        match *self {
            FenceScan::Closed { start, end } => Some(&text[start..end]),
            _ => None,
        }
    }
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
