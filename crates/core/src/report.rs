// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metrics report trees
//!
//! Every stage can produce a [`Report`] at any time: flat named counters
//! plus the reports of the stages it owns, keyed by child name.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named metrics for one stage and its children
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub longs: BTreeMap<String, i64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub doubles: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub strings: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, Report>,
}

impl Report {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut strings = BTreeMap::new();
        strings.insert("name".to_string(), name.clone());
        Self {
            name,
            strings,
            ..Default::default()
        }
    }

    pub fn set_long(&mut self, key: impl Into<String>, value: i64) -> &mut Self {
        self.longs.insert(key.into(), value);
        self
    }

    pub fn set_double(&mut self, key: impl Into<String>, value: f64) -> &mut Self {
        self.doubles.insert(key.into(), value);
        self
    }

    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.strings.insert(key.into(), value.into());
        self
    }

    pub fn with_long(mut self, key: impl Into<String>, value: i64) -> Self {
        self.set_long(key, value);
        self
    }

    pub fn add_child(&mut self, key: impl Into<String>, child: Report) -> &mut Self {
        self.children.insert(key.into(), child);
        self
    }

    pub fn long(&self, key: &str) -> Option<i64> {
        self.longs.get(key).copied()
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.strings.get(key).map(String::as_str)
    }

    pub fn child(&self, key: &str) -> Option<&Report> {
        self.children.get(key)
    }

    /// Collapse the tree into one report with `child.metric` keys
    pub fn flatten(&self) -> Report {
        let mut flat = Report {
            name: self.name.clone(),
            longs: self.longs.clone(),
            doubles: self.doubles.clone(),
            strings: self.strings.clone(),
            children: BTreeMap::new(),
        };
        for (key, child) in &self.children {
            let sub = child.flatten();
            for (k, v) in sub.longs {
                flat.longs.insert(format!("{key}.{k}"), v);
            }
            for (k, v) in sub.doubles {
                flat.doubles.insert(format!("{key}.{k}"), v);
            }
            for (k, v) in sub.strings {
                flat.strings.insert(format!("{key}.{k}"), v);
            }
        }
        flat
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
