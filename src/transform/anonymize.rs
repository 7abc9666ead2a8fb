use regex::Regex;
use sha2::{Digest, Sha256};

use super::humanhash::humanize;
use crate::error::{Error, Result};
use crate::graph::ProfileGraph;

/// The allow-list the command-line tool uses when none is given.
pub const DEFAULT_ALLOW_LIST: &str = "^runtime;^net;^encoding";

/// Configure [`anonymize`].
#[derive(Clone, Debug, Default)]
pub struct AnonymizeOptions {
    /// Functions whose name matches any of these are left untouched.
    pub allow: Vec<Regex>,
}

impl AnonymizeOptions {
    /// Compiles a `;`-separated list of regular expressions.
    ///
    /// Surrounding whitespace is ignored and an empty list allows nothing.
    pub fn from_allow_list(list: &str) -> Result<Self> {
        let list = list.trim();
        let mut allow = Vec::new();
        if !list.is_empty() {
            for pattern in list.split(';') {
                let re = Regex::new(pattern).map_err(|e| {
                    Error::Config(format!("invalid allow-list pattern {:?}: {}", pattern, e))
                })?;
                allow.push(re);
            }
        }
        Ok(Self { allow })
    }

    fn allows(&self, name: &str) -> bool {
        self.allow.iter().any(|re| re.is_match(name))
    }
}

/// Replaces function names and file paths with human-readable hashes.
///
/// The name of every function not matched by the allow-list becomes a three-word hash of
/// its SHA-256 digest, and each segment of its file path a one-word hash. The result is
/// deterministic, so equal names in different profiles stay equal.
pub fn anonymize(graph: &mut ProfileGraph, opt: &AnonymizeOptions) {
    let mut renamed = 0;
    for function in graph.functions_mut() {
        if opt.allows(&function.name) {
            continue;
        }

        function.name = hash_words(&function.name, 3);
        function.system_name.clear();
        if !function.filename.is_empty() {
            function.filename = function
                .filename
                .split('/')
                .map(|segment| {
                    if segment.is_empty() {
                        String::new()
                    } else {
                        hash_words(segment, 1)
                    }
                })
                .collect::<Vec<_>>()
                .join("/");
        }
        renamed += 1;
    }
    debug!("anonymized {} functions", renamed);
}

fn hash_words(s: &str, words: usize) -> String {
    humanize(&Sha256::digest(s.as_bytes()), words)
}
