// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output formatting for agent commands

use clap::ValueEnum;
use relay_core::Report;
use serde::Serialize;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print output in the specified format
pub fn print<T: Serialize + std::fmt::Display>(value: &T, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", value),
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(value) {
                println!("{}", json);
            }
        }
    }
}

/// Print a list of items
pub fn print_list<T: Serialize + std::fmt::Display>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            for item in items {
                println!("{}", item);
            }
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(items) {
                println!("{}", json);
            }
        }
    }
}

pub fn print_report(report: &Report, format: OutputFormat) {
    match format {
        OutputFormat::Text => print!("{}", render_report(report)),
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(report) {
                println!("{}", json);
            }
        }
    }
}

/// Indented tree, one metric per line, children after their parent's metrics
pub fn render_report(report: &Report) -> String {
    let mut out = String::new();
    render_into(&mut out, report, 0);
    out
}

fn render_into(out: &mut String, report: &Report, depth: usize) {
    let pad = "  ".repeat(depth);
    let _ = writeln!(out, "{pad}{}", report.name);
    for (key, value) in &report.longs {
        let _ = writeln!(out, "{pad}  {key} = {value}");
    }
    for (key, value) in &report.doubles {
        let _ = writeln!(out, "{pad}  {key} = {value}");
    }
    for (key, value) in report.strings.iter().filter(|(k, _)| k.as_str() != "name") {
        let _ = writeln!(out, "{pad}  {key} = {value}");
    }
    for child in report.children.values() {
        render_into(out, child, depth + 1);
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
