// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chain specifications and the stage registry
//!
//! ```text
//! chain := stage ("=>" stage)*
//! stage := ident [ "(" [arg ("," arg)*] ")" ]
//! arg   := "quoted, with \" escapes" | bare-token
//! ```
//!
//! Every stage but the last is a decorator; the last is the terminal sink.

use crate::batch::{Batching, Unbatching};
use crate::flakey::IntervalFlakey;
use crate::gzip::{Gunzip, Gzip};
use crate::insistent::InsistentAppend;
use crate::roll::RollSink;
use crate::stubborn::StubbornAppend;
use crate::terminal::{CounterSink, FileSink, NullSink};
use relay_core::{Context, EventSink, SinkBuilder, SpecError};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// One parsed stage: name plus positional arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    pub name: String,
    pub args: Vec<String>,
}

/// Parse a chain into its stages, outermost first
pub fn parse_chain(spec: &str) -> Result<Vec<StageSpec>, SpecError> {
    let mut parser = Parser {
        chars: spec.char_indices().collect(),
        pos: 0,
        len: spec.len(),
    };
    parser.skip_ws();
    if parser.at_end() {
        return Err(SpecError::Empty);
    }
    let mut stages = vec![parser.stage()?];
    loop {
        parser.skip_ws();
        if parser.at_end() {
            return Ok(stages);
        }
        parser.expect_arrow()?;
        parser.skip_ws();
        stages.push(parser.stage()?);
    }
}

struct Parser {
    chars: Vec<(usize, char)>,
    pos: usize,
    len: usize,
}

impl Parser {
    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn offset(&self) -> usize {
        self.chars.get(self.pos).map_or(self.len, |&(i, _)| i)
    }

    fn error(&self, reason: impl Into<String>) -> SpecError {
        SpecError::Parse {
            offset: self.offset(),
            reason: reason.into(),
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_arrow(&mut self) -> Result<(), SpecError> {
        if self.eat('=') && self.eat('>') {
            return Ok(());
        }
        Err(self.error("expected '=>'"))
    }

    fn stage(&mut self) -> Result<StageSpec, SpecError> {
        let name = self.ident()?;
        self.skip_ws();
        let mut args = Vec::new();
        if self.eat('(') {
            self.skip_ws();
            if !self.eat(')') {
                loop {
                    self.skip_ws();
                    args.push(self.arg()?);
                    self.skip_ws();
                    if self.eat(')') {
                        break;
                    }
                    if !self.eat(',') {
                        return Err(self.error("expected ',' or ')'"));
                    }
                }
            }
        }
        Ok(StageSpec { name, args })
    }

    fn ident(&mut self) -> Result<String, SpecError> {
        let mut name = String::new();
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return Err(self.error("expected stage name")),
        }
        while let Some(c) = self.peek() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }
            name.push(c);
            self.pos += 1;
        }
        Ok(name)
    }

    fn arg(&mut self) -> Result<String, SpecError> {
        if self.eat('"') {
            return self.quoted();
        }
        let mut token = String::new();
        while let Some(c) = self.peek() {
            if c == ',' || c == ')' || c == '(' || c == '"' || c.is_whitespace() {
                break;
            }
            token.push(c);
            self.pos += 1;
        }
        if token.is_empty() {
            return Err(self.error("expected argument"));
        }
        Ok(token)
    }

    fn quoted(&mut self) -> Result<String, SpecError> {
        let mut text = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some('"') => {
                    self.pos += 1;
                    return Ok(text);
                }
                Some('\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(c @ ('"' | '\\')) => text.push(c),
                        Some('n') => text.push('\n'),
                        Some('t') => text.push('\t'),
                        _ => return Err(self.error("bad escape")),
                    }
                    self.pos += 1;
                }
                Some(c) => {
                    text.push(c);
                    self.pos += 1;
                }
            }
        }
    }
}

/// Builds a terminal sink from its arguments
pub type SinkFactory =
    Arc<dyn Fn(&Context, &[String]) -> Result<Box<dyn EventSink>, SpecError> + Send + Sync>;

/// Wraps an already built sink
pub type DecoratorFactory = Arc<
    dyn Fn(&Context, &[String], Box<dyn EventSink>) -> Result<Box<dyn EventSink>, SpecError>
        + Send
        + Sync,
>;

/// Named stage factories
#[derive(Clone, Default)]
pub struct Registry {
    sinks: BTreeMap<String, SinkFactory>,
    decorators: BTreeMap<String, DecoratorFactory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in stage
    pub fn with_defaults() -> Self {
        let mut reg = Self::new();
        reg.register_sink("null", |_, args| {
            arity("null", args, 0, 0, "null")?;
            Ok(Box::new(NullSink::new()))
        });
        reg.register_sink("counter", |_, args| {
            arity("counter", args, 1, 1, "counter(name)")?;
            Ok(Box::new(CounterSink::new(args[0].clone())))
        });
        reg.register_sink("file", |_, args| {
            arity("file", args, 1, 1, "file(dir)")?;
            Ok(Box::new(FileSink::new(&args[0])))
        });
        reg.register_sink("roll", |ctx, args| {
            arity("roll", args, 2, 3, "roll(spec, rollMillis[, checkMillis])")?;
            let period = millis_arg("roll", &args[1])?;
            let check = match args.get(2) {
                Some(v) => millis_arg("roll", v)?,
                None => ctx.defaults().roll_check_period,
            };
            Ok(Box::new(RollSink::periodic(ctx, args[0].clone(), period, check)?))
        });

        reg.register_decorator("insistentAppend", |ctx, args, inner| {
            arity(
                "insistentAppend",
                args,
                0,
                3,
                "insistentAppend[(maxSingleMs[, initMs[, cumulativeMaxMs]])]",
            )?;
            let d = ctx.defaults();
            let max_single = match args.first() {
                Some(v) => millis_arg("insistentAppend", v)?,
                None => d.max_single_backoff,
            };
            let initial = match args.get(1) {
                Some(v) => millis_arg("insistentAppend", v)?,
                None => d.insistent_initial_backoff,
            };
            let cap = match args.get(2) {
                Some(v) => Some(millis_arg("insistentAppend", v)?),
                None if args.is_empty() => d.max_cumulative_backoff,
                None => None,
            };
            Ok(match cap {
                Some(cap) => Box::new(InsistentAppend::cumulative(
                    ctx, inner, max_single, initial, cap,
                )),
                None => Box::new(InsistentAppend::capped(ctx, inner, max_single, initial)),
            })
        });
        reg.register_decorator("stubbornAppend", |ctx, args, inner| {
            arity("stubbornAppend", args, 0, 0, "stubbornAppend")?;
            Ok(Box::new(StubbornAppend::new(ctx, inner)))
        });
        reg.register_decorator("batch", |_, args, inner| {
            arity("batch", args, 1, 2, "batch(maxSize[, maxLatencyMs])")?;
            let size: usize = parse_arg("batch", &args[0])?;
            if size == 0 {
                return Err(invalid("batch", &args[0], "batch size must be positive"));
            }
            let latency = match args.get(1) {
                Some(v) => millis_arg("batch", v)?,
                None => Duration::ZERO,
            };
            Ok(Box::new(Batching::new(inner, size, latency)))
        });
        reg.register_decorator("unbatch", |_, args, inner| {
            arity("unbatch", args, 0, 0, "unbatch")?;
            Ok(Box::new(Unbatching::new(inner)))
        });
        reg.register_decorator("gzip", |_, args, inner| {
            arity("gzip", args, 0, 0, "gzip")?;
            Ok(Box::new(Gzip::new(inner)))
        });
        reg.register_decorator("gunzip", |_, args, inner| {
            arity("gunzip", args, 0, 0, "gunzip")?;
            Ok(Box::new(Gunzip::new(inner)))
        });
        reg.register_decorator("intervalFlakey", |_, args, inner| {
            arity("intervalFlakey", args, 1, 1, "intervalFlakey(interval)")?;
            let interval: u64 = parse_arg("intervalFlakey", &args[0])?;
            Ok(Box::new(IntervalFlakey::new(inner, interval)?))
        });
        reg
    }

    pub fn register_sink<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&Context, &[String]) -> Result<Box<dyn EventSink>, SpecError> + Send + Sync + 'static,
    {
        self.sinks.insert(name.to_string(), Arc::new(factory));
    }

    pub fn register_decorator<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&Context, &[String], Box<dyn EventSink>) -> Result<Box<dyn EventSink>, SpecError>
            + Send
            + Sync
            + 'static,
    {
        self.decorators.insert(name.to_string(), Arc::new(factory));
    }

    /// Names of all registered stages
    pub fn names(&self) -> Vec<&str> {
        self.sinks
            .keys()
            .chain(self.decorators.keys())
            .map(String::as_str)
            .collect()
    }

    /// Build a chain. A context without a builder gets this registry, so
    /// nested specifications (roll) resolve against the same stages.
    pub fn build(&self, ctx: &Context, spec: &str) -> Result<Box<dyn EventSink>, SpecError> {
        if ctx.builder().is_err() {
            let ctx = ctx.clone().with_builder(Arc::new(self.clone()));
            return self.build_chain(&ctx, spec);
        }
        self.build_chain(ctx, spec)
    }

    fn build_chain(&self, ctx: &Context, spec: &str) -> Result<Box<dyn EventSink>, SpecError> {
        let stages = parse_chain(spec)?;
        let (terminal, decorators) = stages.split_last().ok_or(SpecError::Empty)?;

        let factory = match self.sinks.get(&terminal.name) {
            Some(f) => f,
            None if self.decorators.contains_key(&terminal.name) => {
                return Err(SpecError::NotASink(terminal.name.clone()))
            }
            None => return Err(SpecError::UnknownStage(terminal.name.clone())),
        };
        let mut sink = factory(ctx, &terminal.args)?;

        for stage in decorators.iter().rev() {
            let factory = match self.decorators.get(&stage.name) {
                Some(f) => f,
                None if self.sinks.contains_key(&stage.name) => {
                    return Err(SpecError::NotADecorator(stage.name.clone()))
                }
                None => return Err(SpecError::UnknownStage(stage.name.clone())),
            };
            sink = factory(ctx, &stage.args, sink)?;
        }
        Ok(sink)
    }
}

impl SinkBuilder for Registry {
    fn build_sink(&self, ctx: &Context, spec: &str) -> Result<Box<dyn EventSink>, SpecError> {
        self.build(ctx, spec)
    }
}

/// Check the argument count against `min..=max`
pub fn arity(
    stage: &str,
    args: &[String],
    min: usize,
    max: usize,
    usage: &str,
) -> Result<(), SpecError> {
    if args.len() < min || args.len() > max {
        return Err(SpecError::Usage(format!(
            "{usage} (got {} argument(s) for {stage})",
            args.len()
        )));
    }
    Ok(())
}

pub fn parse_arg<T>(stage: &str, value: &str) -> Result<T, SpecError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| invalid(stage, value, &e.to_string()))
}

pub fn millis_arg(stage: &str, value: &str) -> Result<Duration, SpecError> {
    parse_arg::<u64>(stage, value).map(Duration::from_millis)
}

fn invalid(stage: &str, value: &str, reason: &str) -> SpecError {
    SpecError::InvalidArgument {
        stage: stage.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;
