//! Chain splitting and tokenizing of raw command strings.

use serde::Serialize;

use crate::error::ParseError;

/// Longest command [`try_parse`](super::ShellParser::try_parse) will inspect.
pub const MAX_COMMAND_LEN: usize = 128 * 1024;

/// Operators that chain commands, longest first so `&&` is never read as two `&`.
const CHAIN_OPERATORS: [&str; 5] = ["&&", "||", ";", "|", "&"];

const REDIRECT_OPERATORS: [&str; 5] = [">", "<", ">>", "2>", "&>"];

/// One segment of a shell command, with the segments chained after it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ParsedCommand {
    /// First token of the segment; empty only for empty input
    pub executable: String,
    /// Remaining tokens of the segment
    pub args: Vec<String>,
    /// Segments chained after this one, in execution order
    pub subcommands: Vec<ParsedCommand>,
    /// A bare `|` appears in the text
    pub has_pipe: bool,
    /// A redirection operator appears in the text
    pub has_redirect: bool,
    /// The text ends in `&` or contains ` & `
    pub has_background: bool,
    /// The trimmed source text
    pub raw_command: String,
}

impl ParsedCommand {
    /// Executables of this command and every chained subcommand, in chain order.
    ///
    /// Empty executables are skipped.
    pub fn executables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_executables(&mut out);
        out
    }

    fn collect_executables<'a>(&'a self, out: &mut Vec<&'a str>) {
        if !self.executable.is_empty() {
            out.push(&self.executable);
        }
        for sub in &self.subcommands {
            sub.collect_executables(out);
        }
    }

    /// Returns true if this parsed from empty input.
    pub fn is_empty(&self) -> bool {
        self.executable.is_empty() && self.subcommands.is_empty()
    }
}

/// Parse a command. Never fails; malformed quoting degrades to whitespace splitting.
pub(crate) fn parse(command: &str) -> ParsedCommand {
    let command = command.trim();
    let mut segments = split_chain(command)
        .into_iter()
        .filter(|segment| !segment.is_empty());

    let Some(first) = segments.next() else {
        return ParsedCommand {
            raw_command: command.to_string(),
            ..Default::default()
        };
    };

    let mut tokens = tokenize(&first).into_iter();
    let executable = tokens.next().unwrap_or_default();
    let args = tokens.collect();

    ParsedCommand {
        executable,
        args,
        subcommands: segments.map(|segment| parse(&segment)).collect(),
        has_pipe: has_bare_pipe(command),
        has_redirect: REDIRECT_OPERATORS.iter().any(|op| command.contains(op)),
        has_background: command.ends_with('&') || command.contains(" & "),
        raw_command: command.to_string(),
    }
}

/// Reject input the tokenizer cannot reason about, then [`parse`].
pub(crate) fn try_parse(command: &str) -> Result<ParsedCommand, ParseError> {
    if command.len() > MAX_COMMAND_LEN {
        return Err(ParseError::TooLong {
            len: command.len(),
            max: MAX_COMMAND_LEN,
        });
    }
    if command.contains('\0') {
        return Err(ParseError::NulByte);
    }
    Ok(parse(command))
}

/// Split on chain operators outside of quotes.
///
/// A quote character toggles quoting unless the character before it is a
/// backslash. An escaped backslash before a quote is not recognised, so
/// `"a\\" ; b` stays one segment.
pub(crate) fn split_chain(command: &str) -> Vec<String> {
    let chars: Vec<char> = command.chars().collect();
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if (c == '"' || c == '\'') && (i == 0 || chars[i - 1] != '\\') {
            match quote {
                None => quote = Some(c),
                Some(open) if open == c => quote = None,
                Some(_) => {}
            }
            current.push(c);
            i += 1;
            continue;
        }

        if quote.is_none()
            && let Some(op) = operator_at(&chars, i)
        {
            if !current.is_empty() {
                segments.push(current.trim().to_string());
                current.clear();
            }
            i += op.len();
            continue;
        }

        current.push(c);
        i += 1;
    }

    if !current.is_empty() {
        segments.push(current.trim().to_string());
    }

    segments
}

fn operator_at(chars: &[char], i: usize) -> Option<&'static str> {
    CHAIN_OPERATORS.into_iter().find(|op| {
        op.chars()
            .enumerate()
            .all(|(k, oc)| chars.get(i + k) == Some(&oc))
    })
}

fn tokenize(segment: &str) -> Vec<String> {
    shlex::split(segment)
        .unwrap_or_else(|| segment.split_whitespace().map(str::to_string).collect())
}

/// A `|` that is not part of `||`.
fn has_bare_pipe(command: &str) -> bool {
    let bytes = command.as_bytes();
    bytes.iter().enumerate().any(|(i, &b)| {
        b == b'|'
            && (i == 0 || bytes[i - 1] != b'|')
            && bytes.get(i + 1).is_none_or(|&next| next != b'|')
    })
}
