//! Path template matching (`/users/{id}` against `/users/42`).

use indexmap::IndexMap;
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::sync::OnceLock;

fn param_regex() -> &'static Regex {
    static PARAM: OnceLock<Regex> = OnceLock::new();
    PARAM.get_or_init(|| Regex::new(r"\{([^}/]+)\}").expect("Invalid regex"))
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Pattern { regex: Regex, names: Vec<String> },
}

/// A compiled `paths` key.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Compiles a template such as `/users/{id}` or `/files/{name}.{ext}`.
    pub fn parse(raw: &str) -> Self {
        let segments = split_segments(raw)
            .map(|segment| {
                if !segment.contains('{') {
                    return Segment::Literal(segment.to_string());
                }
                let mut pattern = String::from("^");
                let mut names = Vec::new();
                let mut last = 0;
                for caps in param_regex().captures_iter(segment) {
                    let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                        continue;
                    };
                    pattern.push_str(&regex::escape(&segment[last..whole.start()]));
                    pattern.push_str("(.+?)");
                    names.push(name.as_str().to_string());
                    last = whole.end();
                }
                pattern.push_str(&regex::escape(&segment[last..]));
                pattern.push('$');
                match Regex::new(&pattern) {
                    Ok(regex) => Segment::Pattern { regex, names },
                    Err(_) => Segment::Literal(segment.to_string()),
                }
            })
            .collect();
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    /// The template as written in the document.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Number of segments without parameters; more literals means a more specific template.
    pub fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    /// Matches a request path, returning percent-decoded path parameter values.
    ///
    /// Trailing slashes are ignored on both sides.
    pub fn matches(&self, path: &str) -> Option<IndexMap<String, String>> {
        let actual: Vec<&str> = split_segments(path).collect();
        if actual.len() != self.segments.len() {
            return None;
        }

        let mut params = IndexMap::new();
        for (segment, value) in self.segments.iter().zip(actual) {
            match segment {
                Segment::Literal(literal) => {
                    if literal != value && *literal != decode(value) {
                        return None;
                    }
                }
                Segment::Pattern { regex, names } => {
                    let caps = regex.captures(value)?;
                    for (i, name) in names.iter().enumerate() {
                        let raw = caps.get(i + 1)?.as_str();
                        params.insert(name.clone(), decode(raw));
                    }
                }
            }
        }
        Some(params)
    }
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.trim_matches('/').split('/').filter(|s| !s.is_empty())
}

fn decode(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// Candidate paths to match: each base-path-stripped variant, then the raw path.
pub(crate) fn candidate_paths<'a>(path: &'a str, base_paths: &[String]) -> Vec<&'a str> {
    let mut candidates = Vec::new();
    for base in base_paths {
        let base = base.trim_end_matches('/');
        if base.is_empty() {
            continue;
        }
        if let Some(rest) = path.strip_prefix(base) {
            if rest.is_empty() {
                candidates.push("/");
            } else if rest.starts_with('/') {
                candidates.push(rest);
            }
        }
    }
    candidates.push(path);
    candidates
}
