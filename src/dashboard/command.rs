//! Dashboard command parsing.
//!
//! Lines starting with `\` are commands; anything else is SQL. Parsing is
//! separate from execution so it can be tested without a database.

use std::iter::Peekable;
use std::path::PathBuf;
use std::str::Chars;

use crate::chart::{ChartConfig, ChartKind};

/// A dashboard command and its usage line, for `\help`.
#[derive(Debug, Clone, Copy)]
pub struct CommandDef {
    pub usage: &'static str,
    pub description: &'static str,
}

/// Every command, in help order.
pub const COMMANDS: &[CommandDef] = &[
    CommandDef {
        usage: "\\tables",
        description: "List the tables that can be previewed",
    },
    CommandDef {
        usage: "\\table <name>",
        description: "Preview up to 1000 rows of a table",
    },
    CommandDef {
        usage: "\\examples",
        description: "List example queries",
    },
    CommandDef {
        usage: "\\example <n>",
        description: "Load example query n",
    },
    CommandDef {
        usage: "\\run",
        description: "Run the loaded example query",
    },
    CommandDef {
        usage: "\\history",
        description: "Show recent queries that returned rows",
    },
    CommandDef {
        usage: "\\search <term>",
        description: "Filter the current result (case-insensitive)",
    },
    CommandDef {
        usage: "\\csv [path]",
        description: "Export the current result as CSV",
    },
    CommandDef {
        usage: "\\chart <bar|line|scatter> <x> <y> [color=<col>] [facet=<col>]",
        description: "Chart the current result",
    },
    CommandDef {
        usage: "\\admin <password>",
        description: "Unlock INSERT/UPDATE/DELETE and DDL",
    },
    CommandDef {
        usage: "\\lock",
        description: "Lock write statements again",
    },
    CommandDef {
        usage: "\\help",
        description: "Show this help",
    },
    CommandDef {
        usage: "\\quit",
        description: "Exit",
    },
];

/// Parsed dashboard input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Blank line.
    Empty,
    /// Raw SQL to execute.
    Sql(String),
    Tables,
    Table(String),
    History,
    Examples,
    Example(usize),
    Run,
    Csv(Option<PathBuf>),
    Chart(ChartConfig),
    Search(String),
    Admin(String),
    Lock,
    Help,
    Quit,
    /// A known command with bad arguments.
    Invalid { message: String, usage: &'static str },
    /// An unrecognized `\` command.
    Unknown(String),
}

/// Parses dashboard input into commands.
pub struct CommandRouter;

impl CommandRouter {
    /// Parse one line of input.
    pub fn parse(input: &str) -> Command {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return Command::Empty;
        }

        let Some(body) = trimmed.strip_prefix('\\') else {
            return Command::Sql(input.to_string());
        };

        let (name, args) = match body.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (body, ""),
        };

        match name.to_lowercase().as_str() {
            "tables" | "dt" => Command::Tables,
            "table" | "t" => Self::required(args, "\\table <name>", Command::Table),
            "history" => Command::History,
            "examples" => Command::Examples,
            "example" => Self::parse_example(args),
            "run" => Command::Run,
            "csv" => Self::parse_csv(args),
            "chart" => Self::parse_chart(args),
            "search" => {
                Self::required(args, "\\search <term>", |term| Command::Search(unquote(&term)))
            }
            "admin" => Self::required(args, "\\admin <password>", |pw| Command::Admin(unquote(&pw))),
            "lock" => Command::Lock,
            "help" | "h" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            _ => Command::Unknown(format!("\\{name}")),
        }
    }

    fn required(args: &str, usage: &'static str, make: impl FnOnce(String) -> Command) -> Command {
        if args.is_empty() {
            Command::Invalid {
                message: "missing argument".to_string(),
                usage,
            }
        } else {
            make(args.to_string())
        }
    }

    fn parse_example(args: &str) -> Command {
        const USAGE: &str = "\\example <n>";
        match args.parse::<usize>() {
            Ok(n) if n > 0 => Command::Example(n),
            _ => Command::Invalid {
                message: format!("'{args}' is not an example number"),
                usage: USAGE,
            },
        }
    }

    fn parse_csv(args: &str) -> Command {
        match tokenize(args).into_iter().next() {
            Some(Token::Word(path)) => Command::Csv(Some(PathBuf::from(path))),
            Some(Token::KeyValue { .. }) => Command::Invalid {
                message: "expected a file path".to_string(),
                usage: "\\csv [path]",
            },
            None => Command::Csv(None),
        }
    }

    fn parse_chart(args: &str) -> Command {
        const USAGE: &str = "\\chart <bar|line|scatter> <x> <y> [color=<col>] [facet=<col>]";
        let invalid = |message: String| Command::Invalid {
            message,
            usage: USAGE,
        };

        let mut words = Vec::new();
        let mut color = None;
        let mut facet = None;

        for token in tokenize(args) {
            match token {
                Token::Word(word) => words.push(word),
                Token::KeyValue { key, value } => match key.to_lowercase().as_str() {
                    "color" | "colour" | "group" => color = Some(value),
                    "facet" => facet = Some(value),
                    other => return invalid(format!("unknown option '{other}'")),
                },
            }
        }

        let [kind, x, y] = match <[String; 3]>::try_from(words) {
            Ok(words) => words,
            Err(words) => {
                return invalid(format!(
                    "expected chart type, x column and y column, got {} argument(s)",
                    words.len()
                ))
            }
        };

        let kind = match kind.parse::<ChartKind>() {
            Ok(kind) => kind,
            Err(e) => return invalid(e.message().to_string()),
        };

        Command::Chart(ChartConfig {
            kind,
            x,
            y,
            color,
            facet,
        })
    }
}

/// Strips one pair of matching surrounding quotes.
fn unquote(s: &str) -> String {
    let s = s.trim();
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return s[1..s.len() - 1].to_string();
        }
    }
    s.to_string()
}

/// A token parsed from command arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// A plain or quoted word.
    Word(String),
    /// A `key=value` pair; the value may be quoted.
    KeyValue { key: String, value: String },
}

/// Splits arguments on whitespace, honoring single and double quotes.
fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let (word, key) = collect_token(&mut chars);
        match key {
            Some(key) => tokens.push(Token::KeyValue { key, value: word }),
            None if !word.is_empty() => tokens.push(Token::Word(word)),
            None => {}
        }
    }

    tokens
}

/// Collects one token. Returns the text and, for `key=value`, the key.
fn collect_token(chars: &mut Peekable<Chars<'_>>) -> (String, Option<String>) {
    let mut text = String::new();
    let mut key = None;

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            break;
        }
        chars.next();

        match c {
            '"' | '\'' => text.push_str(&collect_quoted(chars, c)),
            '=' if key.is_none() && !text.is_empty() => key = Some(std::mem::take(&mut text)),
            _ => text.push(c),
        }
    }

    (text, key)
}

/// Collects characters up to the closing quote. Backslash escapes the quote.
fn collect_quoted(chars: &mut Peekable<Chars<'_>>, quote: char) -> String {
    let mut result = String::new();

    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&quote) {
            result.push(quote);
            chars.next();
            continue;
        }
        if c == quote {
            break;
        }
        result.push(c);
    }

    result
}
