use regex::{Regex, RegexBuilder};

use crate::error::{AiteamError, Result};

/// How messages are cut out of a capture
#[derive(Debug, Clone)]
pub enum Extraction {
    /// Every non-overlapping `begin ... end` block
    Markers { regex: Regex, keep_markers: bool },
    /// Every match of a caller-supplied pattern (multi-line mode)
    Pattern { regex: Regex, group: Option<usize> },
}

impl Extraction {
    /// Marker mode; both tokens are literal and must be non-empty
    pub fn markers(begin: &str, end: &str, keep_markers: bool) -> Result<Self> {
        if begin.is_empty() || end.is_empty() {
            return Err(AiteamError::invalid(
                "--begin/--end must be non-empty (or use --regex).",
            ));
        }
        let regex = Regex::new(&format!(
            "(?s){}(.*?){}",
            regex::escape(begin),
            regex::escape(end)
        ))?;
        Ok(Extraction::Markers {
            regex,
            keep_markers,
        })
    }

    /// Pattern mode; `^`/`$` match at line boundaries
    pub fn pattern(pattern: &str, group: Option<usize>) -> Result<Self> {
        let regex = RegexBuilder::new(pattern).multi_line(true).build()?;
        Ok(Extraction::Pattern { regex, group })
    }

    /// Messages in source order.
    ///
    /// In pattern mode the explicit group is used, else group 1 when the
    /// pattern has groups, else the whole match. A group that is out of
    /// range or did not participate falls back to the whole match.
    pub fn extract<'t>(&self, text: &'t str) -> Vec<&'t str> {
        match self {
            Extraction::Markers {
                regex,
                keep_markers,
            } => regex
                .captures_iter(text)
                .filter_map(|caps| {
                    let group = if *keep_markers { 0 } else { 1 };
                    caps.get(group).map(|m| m.as_str())
                })
                .collect(),
            Extraction::Pattern { regex, group } => {
                let wanted = group.or(if regex.captures_len() > 1 { Some(1) } else { None });
                regex
                    .captures_iter(text)
                    .filter_map(|caps| {
                        wanted
                            .and_then(|g| caps.get(g))
                            .or_else(|| caps.get(0))
                            .map(|m| m.as_str())
                    })
                    .collect()
            }
        }
    }
}
