//! Interactive value acquisition
//!
//! Every acquisition function keeps asking until it gets a valid answer. Bad
//! input is answered with a corrective message and another attempt; only a
//! closed input stream (or an explicit attempt cap) ends the loop with an
//! error.

use crate::core::error::PromptError;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Result of parsing one line of input
type Parsed<T> = Result<T, String>;

/// A default answer together with the text shown for it in brackets
type Shown<T> = Option<(T, String)>;

fn shown<T: std::fmt::Display>(default: Option<T>) -> Shown<T> {
    default.map(|value| {
        let label = value.to_string();
        (value, label)
    })
}

fn shown_path(default: Option<PathBuf>) -> Shown<PathBuf> {
    default.map(|path| {
        let label = path.display().to_string();
        (path, label)
    })
}

/// Interactive prompt driver over arbitrary input/output streams
pub struct Prompter<'io> {
    input: Box<dyn BufRead + 'io>,
    output: Box<dyn Write + 'io>,
    max_attempts: Option<usize>,
}

impl<'io> Prompter<'io> {
    /// Create a prompter reading from `input` and writing prompts to `output`
    pub fn new<R, W>(input: R, output: W) -> Self
    where
        R: BufRead + 'io,
        W: Write + 'io,
    {
        Self {
            input: Box::new(input),
            output: Box::new(output),
            max_attempts: None,
        }
    }

    /// Cap the number of attempts per question (unbounded by default)
    pub fn with_max_attempts(mut self, max_attempts: Option<usize>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Free-form text
    pub fn string(&mut self, prompt: Option<&str>, default: Option<&str>) -> Result<String, PromptError> {
        self.ask(
            prompt.unwrap_or("Please enter a value:"),
            shown(default.map(str::to_string)),
            "Please enter a non-empty value:",
            |line| {
                if line.is_empty() {
                    Err("Empty input".to_string())
                } else {
                    Ok(line.to_string())
                }
            },
        )
    }

    /// Any integer
    pub fn integer(&mut self, prompt: Option<&str>, default: Option<i64>) -> Result<i64, PromptError> {
        self.ask(
            prompt.unwrap_or("Please enter an integer:"),
            shown(default),
            "That is not an integer, please try again:",
            parse_number::<i64>,
        )
    }

    /// Non-negative integer
    pub fn natural(&mut self, prompt: Option<&str>, default: Option<usize>) -> Result<usize, PromptError> {
        self.ask(
            prompt.unwrap_or("Please enter a whole number (0 or more):"),
            shown(default),
            "Please enter a whole number that is 0 or greater:",
            parse_number::<usize>,
        )
    }

    /// Any finite float
    pub fn float(&mut self, prompt: Option<&str>, default: Option<f64>) -> Result<f64, PromptError> {
        self.ask(
            prompt.unwrap_or("Please enter a number:"),
            shown(default),
            "That is not a number, please try again:",
            parse_float,
        )
    }

    /// Float constrained to the inclusive range `[min, max]`
    pub fn float_in(
        &mut self,
        prompt: Option<&str>,
        default: Option<f64>,
        min: f64,
        max: f64,
    ) -> Result<f64, PromptError> {
        let retry = format!("Please enter a number between {} and {}:", min, max);
        self.ask(
            prompt.unwrap_or("Please enter a number:"),
            shown(default),
            &retry,
            |line| {
                let value = parse_float(line)?;
                if value < min || value > max {
                    return Err(format!("{} is outside [{}, {}]", value, min, max));
                }
                Ok(value)
            },
        )
    }

    /// Percentage typed as 0..=100, returned as a proportion in [0, 1]
    ///
    /// The default, if any, is given as a proportion too.
    pub fn percent(&mut self, prompt: Option<&str>, default: Option<f64>) -> Result<f64, PromptError> {
        self.ask(
            prompt.unwrap_or("Please enter a percentage (0-100):"),
            default.map(|proportion| (proportion, format!("{}%", proportion * 100.0))),
            "Please enter a percentage between 0 and 100:",
            parse_percent,
        )
    }

    /// Yes/no question; only answers starting with `y` or `n` are accepted
    pub fn boolean(&mut self, prompt: Option<&str>, default: Option<bool>) -> Result<bool, PromptError> {
        self.ask(
            prompt.unwrap_or("Please answer (y/n):"),
            default.map(|yes| (yes, if yes { "y" } else { "n" }.to_string())),
            "Please answer with y or n:",
            parse_yes_no,
        )
    }

    /// Path to an existing file
    pub fn existing_file(&mut self, prompt: Option<&str>, default: Option<PathBuf>) -> Result<PathBuf, PromptError> {
        self.ask(
            prompt.unwrap_or("Please input the full path to the file:"),
            shown_path(default),
            "The file path you input is invalid, please try again:",
            |line| {
                let path = PathBuf::from(line);
                if path.is_file() {
                    Ok(path)
                } else {
                    Err(format!("{} is not an existing file", line))
                }
            },
        )
    }

    /// Path to an existing file whose extension is one of `extensions`
    ///
    /// Extensions are compared case-insensitively and without the dot.
    pub fn existing_file_with_extension(
        &mut self,
        prompt: Option<&str>,
        default: Option<PathBuf>,
        extensions: &[&str],
    ) -> Result<PathBuf, PromptError> {
        let retry = format!(
            "Please input the path to an existing {} file:",
            extensions.join("/")
        );
        self.ask(
            prompt.unwrap_or("Please input the full path to the file:"),
            shown_path(default),
            &retry,
            |line| {
                let path = PathBuf::from(line);
                if !path.is_file() {
                    return Err(format!("{} is not an existing file", line));
                }
                if has_extension(&path, extensions) {
                    Ok(path)
                } else {
                    Err(format!("{} has the wrong extension", line))
                }
            },
        )
    }

    /// Path for a file about to be written
    ///
    /// If the file exists and `allow_overwrite` is false, the operator is
    /// asked to confirm; declining asks for a different path.
    pub fn new_file(
        &mut self,
        prompt: Option<&str>,
        default: Option<PathBuf>,
        allow_overwrite: bool,
    ) -> Result<PathBuf, PromptError> {
        let mut question = prompt.unwrap_or("Please input the path for the new file:").to_string();
        loop {
            let path = self.ask(&question, shown_path(default.clone()), "Please input a file path:", |line| {
                let path = PathBuf::from(line);
                if path.is_dir() {
                    Err(format!("{} is a directory", line))
                } else {
                    Ok(path)
                }
            })?;

            if allow_overwrite || !path.exists() {
                return Ok(path);
            }

            let confirm = format!("{} already exists, overwrite it (y/n)?", path.display());
            if self.boolean(Some(&confirm), None)? {
                return Ok(path);
            }
            question = "Please input a different path for the new file:".to_string();
        }
    }

    /// Directory that is either new or explicitly reused
    ///
    /// When `suffix` is given, `.<suffix>` is appended to answers lacking it,
    /// the default included.
    pub fn directory(
        &mut self,
        prompt: Option<&str>,
        default: Option<PathBuf>,
        suffix: Option<&str>,
    ) -> Result<PathBuf, PromptError> {
        let normalize = |path: &Path| match suffix {
            Some(suffix) => with_suffix(path, suffix),
            None => path.to_path_buf(),
        };
        let mut default = default.map(|path| normalize(&path));
        let mut question = prompt.unwrap_or("Please input the directory path:").to_string();
        loop {
            let path = self.ask(&question, shown_path(default.clone()), "Please input a directory path:", |line| {
                Ok(normalize(Path::new(line)))
            })?;

            if !path.exists() {
                return Ok(path);
            }
            if !path.is_dir() {
                debug!("Rejected {}: exists and is not a directory", path.display());
                default = None;
                question = format!("{} exists and is not a directory, please input a directory path:", path.display());
                continue;
            }

            let confirm = format!("{} already exists, reuse it (y/n)?", path.display());
            if self.boolean(Some(&confirm), None)? {
                return Ok(path);
            }
            question = "Please input a different directory path:".to_string();
        }
    }

    /// Select one option from an enumerated list, by number or by name
    pub fn choose(&mut self, prompt: Option<&str>, options: &[&str], default: Option<usize>) -> Result<usize, PromptError> {
        let mut menu = prompt.unwrap_or("Please choose one of:").to_string();
        for (index, option) in options.iter().enumerate() {
            menu.push_str(&format!("\n  {}) {}", index + 1, option));
        }
        let retry = format!("Please enter a number from 1 to {}:", options.len());
        self.ask(&menu, shown(default.map(|d| d + 1)), &retry, |line| {
            if let Ok(number) = line.parse::<usize>() {
                if (1..=options.len()).contains(&number) {
                    return Ok(number);
                }
                return Err(format!("{} is not a listed option", number));
            }
            options
                .iter()
                .position(|option| option.eq_ignore_ascii_case(line))
                .map(|index| index + 1)
                .ok_or_else(|| format!("'{}' is not a listed option", line))
        })
        .map(|number| number - 1)
    }

    /// Value accepted by a caller-supplied parser
    ///
    /// `parse` returns the reason for rejecting a line; the operator then sees
    /// `retry` and answers again.
    pub fn parsed<T, F>(&mut self, prompt: &str, default: Option<T>, retry: &str, parse: F) -> Result<T, PromptError>
    where
        T: std::fmt::Display,
        F: Fn(&str) -> Result<T, String>,
    {
        self.ask(prompt, shown(default), retry, parse)
    }

    /// Core retry loop shared by every acquisition function
    fn ask<T, F>(&mut self, prompt: &str, mut default: Shown<T>, retry: &str, parse: F) -> Result<T, PromptError>
    where
        F: Fn(&str) -> Parsed<T>,
    {
        let mut attempt = 0usize;
        let mut message = prompt.to_string();

        loop {
            attempt += 1;
            if let Some(max) = self.max_attempts {
                if attempt > max {
                    return Err(PromptError::AttemptsExhausted(max));
                }
            }

            match &default {
                Some((_, label)) => write!(self.output, "{} [{}] ", message, label)?,
                None => write!(self.output, "{} ", message)?,
            }
            self.output.flush()?;

            let line = self.read_line()?;
            let line = line.trim();

            if line.is_empty() {
                if let Some((value, _)) = default.take() {
                    return Ok(value);
                }
            }

            match parse(line) {
                Ok(value) => return Ok(value),
                Err(reason) => {
                    debug!("Rejected input on attempt {}: {}", attempt, reason);
                    message = retry.to_string();
                }
            }
        }
    }

    fn read_line(&mut self) -> Result<String, PromptError> {
        let mut line = String::new();
        let read = self.input.read_line(&mut line)?;
        if read == 0 {
            return Err(PromptError::EndOfInput);
        }
        Ok(line)
    }
}

impl Prompter<'static> {
    /// Prompter bound to the process terminal
    pub fn stdio() -> Self {
        Prompter::new(BufReader::new(io::stdin()), io::stdout())
    }
}

fn parse_number<T: FromStr>(line: &str) -> Parsed<T> {
    line.parse::<T>()
        .map_err(|_| format!("'{}' is not a valid number", line))
}

fn parse_float(line: &str) -> Parsed<f64> {
    let value: f64 = parse_number(line)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("'{}' is not finite", line))
    }
}

fn parse_percent(line: &str) -> Parsed<f64> {
    let value = parse_float(line.trim_end_matches('%').trim())?;
    if !(0.0..=100.0).contains(&value) {
        return Err(format!("{} is outside 0-100", value));
    }
    Ok(value / 100.0)
}

fn parse_yes_no(line: &str) -> Parsed<bool> {
    match line.chars().next().map(|c| c.to_ascii_lowercase()) {
        Some('y') => Ok(true),
        Some('n') => Ok(false),
        _ => Err(format!("'{}' is neither yes nor no", line)),
    }
}

/// Whether `path` has one of `extensions` (case-insensitive, no dot)
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext)))
}

/// Append `.<suffix>` unless the path already ends with it
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    if has_extension(path, &[suffix]) {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_os_string();
        name.push(".");
        name.push(suffix);
        PathBuf::from(name)
    }
}
