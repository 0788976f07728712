//! Ant-style request path matching.
//!
//! # Pattern Syntax
//!
//! - `?` matches exactly one character
//! - `*` matches zero or more characters within a path segment
//! - `**` as a whole segment matches zero or more path segments
//! - `**` inside a segment (`/logout**`) behaves like `*`
//!
//! Empty segments are ignored on both sides, so `/v`, `/v/` and `//v`
//! are the same path.
//!
//! # Examples
//!
//! ```rust
//! use site_security_core::http::security::ant_matcher::AntMatcher;
//!
//! let matcher = AntMatcher::new("/v/**");
//! assert!(matcher.matches("/v"));
//! assert!(matcher.matches("/v/users/42"));
//! assert!(!matcher.matches("/views"));
//!
//! let logout = AntMatcher::new("/logout**");
//! assert!(logout.matches("/logout"));
//! assert!(logout.matches("/logout-all"));
//! assert!(!logout.matches("/logout/now"));
//! ```
//!
//! # Spring Equivalent
//!
//! `org.springframework.util.AntPathMatcher` used through `AntPathRequestMatcher`

use std::fmt;

/// Ant-style path matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AntMatcher {
    pattern: String,
    segments: Vec<Segment>,
    case_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Plain text, compared whole.
    Literal(String),
    /// Text containing `*` or `?`, matched within one segment.
    Glob(Vec<char>),
    /// `**`, spans any number of segments.
    AnyPath,
}

impl Segment {
    fn parse(part: &str) -> Self {
        if part == "**" {
            Segment::AnyPath
        } else if part.contains(['*', '?']) {
            Segment::Glob(part.chars().collect())
        } else {
            Segment::Literal(part.to_string())
        }
    }

    fn lowercased(self) -> Self {
        match self {
            Segment::Literal(text) => Segment::Literal(text.to_lowercase()),
            Segment::Glob(chars) => Segment::Glob(chars.iter().flat_map(|c| c.to_lowercase()).collect()),
            Segment::AnyPath => Segment::AnyPath,
        }
    }
}

impl AntMatcher {
    /// Compiles `pattern` into a case-sensitive matcher.
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            segments: split_path(pattern).map(Segment::parse).collect(),
            case_sensitive: true,
        }
    }

    /// Compares paths ignoring ASCII and Unicode case.
    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self.segments = self.segments.into_iter().map(Segment::lowercased).collect();
        self
    }

    /// The pattern this matcher was built from.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Checks `path` (without query string) against the pattern.
    pub fn matches(&self, path: &str) -> bool {
        if self.case_sensitive {
            let parts: Vec<&str> = split_path(path).collect();
            match_segments(&self.segments, &parts)
        } else {
            let lowered = path.to_lowercase();
            let parts: Vec<&str> = split_path(&lowered).collect();
            match_segments(&self.segments, &parts)
        }
    }
}

impl fmt::Display for AntMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|part| !part.is_empty())
}

fn match_segments(pattern: &[Segment], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((Segment::AnyPath, rest)) => {
            (0..=path.len()).any(|skip| match_segments(rest, &path[skip..]))
        }
        Some((segment, rest)) => match path.split_first() {
            Some((head, tail)) => segment_matches(segment, head) && match_segments(rest, tail),
            None => false,
        },
    }
}

fn segment_matches(segment: &Segment, text: &str) -> bool {
    match segment {
        Segment::Literal(literal) => literal == text,
        Segment::Glob(glob) => glob_matches(glob, &text.chars().collect::<Vec<_>>()),
        Segment::AnyPath => true,
    }
}

/// Single-segment wildcard match with backtracking to the last `*`.
fn glob_matches(pattern: &[char], text: &[char]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut last_star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                last_star = Some((p, t));
                p += 1;
            }
            Some('?') => {
                p += 1;
                t += 1;
            }
            Some(c) if *c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match last_star {
                Some((star_p, star_t)) => {
                    p = star_p + 1;
                    t = star_t + 1;
                    last_star = Some((star_p, star_t + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}

/// Ordered group of matchers sharing one outcome, e.g. `("/v", "/v/**")`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AntMatchers {
    matchers: Vec<AntMatcher>,
}

impl AntMatchers {
    /// Creates an empty group.
    pub fn new() -> Self {
        Self {
            matchers: Vec::new(),
        }
    }

    /// Builds a group from patterns, keeping their order.
    pub fn from_patterns(patterns: &[&str]) -> Self {
        Self {
            matchers: patterns.iter().map(|p| AntMatcher::new(p)).collect(),
        }
    }

    /// Appends a pattern.
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, pattern: &str) -> Self {
        self.matchers.push(AntMatcher::new(pattern));
        self
    }

    /// True if any pattern matches.
    pub fn matches(&self, path: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(path))
    }

    /// First matching pattern in declared order.
    pub fn find_match(&self, path: &str) -> Option<&AntMatcher> {
        self.matchers.iter().find(|m| m.matches(path))
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.matchers.iter().map(AntMatcher::pattern)
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

impl fmt::Display for AntMatchers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let patterns: Vec<&str> = self.patterns().collect();
        write!(f, "[{}]", patterns.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_match() {
        let matcher = AntMatcher::new("/v/users");
        assert!(matcher.matches("/v/users"));
        assert!(matcher.matches("/v/users/"));
        assert!(!matcher.matches("/v/user"));
        assert!(!matcher.matches("/v/users/1"));
        assert!(!matcher.matches("/V/users"));
    }

    #[test]
    fn test_double_wildcard_tail() {
        let matcher = AntMatcher::new("/static/**");
        assert!(matcher.matches("/static"));
        assert!(matcher.matches("/static/"));
        assert!(matcher.matches("/static/css/site.css"));
        assert!(!matcher.matches("/statics/site.css"));
        assert!(!matcher.matches("/images/logo.png"));
    }

    #[test]
    fn test_match_everything() {
        let matcher = AntMatcher::new("/**");
        assert!(matcher.matches("/"));
        assert!(matcher.matches(""));
        assert!(matcher.matches("/v/users"));
        assert!(matcher.matches("/a/b/c/d"));
    }

    #[test]
    fn test_double_wildcard_middle() {
        let matcher = AntMatcher::new("/api/**/edit");
        assert!(matcher.matches("/api/edit"));
        assert!(matcher.matches("/api/users/7/edit"));
        assert!(!matcher.matches("/api/users/7"));
    }

    #[test]
    fn test_single_wildcard_segment() {
        let matcher = AntMatcher::new("/users/*/profile");
        assert!(matcher.matches("/users/7/profile"));
        assert!(!matcher.matches("/users/profile"));
        assert!(!matcher.matches("/users/7/8/profile"));
    }

    #[test]
    fn test_glob_within_segment() {
        let matcher = AntMatcher::new("/files/*.txt");
        assert!(matcher.matches("/files/notes.txt"));
        assert!(matcher.matches("/files/.txt"));
        assert!(!matcher.matches("/files/notes.pdf"));

        let matcher = AntMatcher::new("/file?.txt");
        assert!(matcher.matches("/file1.txt"));
        assert!(!matcher.matches("/file12.txt"));
        assert!(!matcher.matches("/file.txt"));
    }

    #[test]
    fn test_double_star_inside_segment() {
        let matcher = AntMatcher::new("/logout**");
        assert!(matcher.matches("/logout"));
        assert!(matcher.matches("/logout/"));
        assert!(matcher.matches("/logoutNow"));
        assert!(!matcher.matches("/logout/now"));
        assert!(!matcher.matches("/log"));
    }

    #[test]
    fn test_dotted_literal() {
        let matcher = AntMatcher::new("/swagger-ui.html");
        assert!(matcher.matches("/swagger-ui.html"));
        assert!(!matcher.matches("/swagger-uixhtml"));
    }

    #[test]
    fn test_root_pattern() {
        let matcher = AntMatcher::new("/");
        assert!(matcher.matches("/"));
        assert!(!matcher.matches("/v"));
    }

    #[test]
    fn test_glob_backtracking() {
        assert!(glob_matches(&"a*b*c".chars().collect::<Vec<_>>(), &"aXbYbZc".chars().collect::<Vec<_>>()));
        assert!(!glob_matches(&"a*b".chars().collect::<Vec<_>>(), &"aXbY".chars().collect::<Vec<_>>()));
        assert!(glob_matches(&"**".chars().collect::<Vec<_>>(), &[]));
    }

    #[test]
    fn test_case_insensitive() {
        let matcher = AntMatcher::new("/Swagger-UI/**").case_insensitive();
        assert!(matcher.matches("/swagger-ui/index.html"));
        assert!(matcher.matches("/SWAGGER-UI"));
    }

    #[test]
    fn test_matchers_keep_declared_order() {
        let matchers = AntMatchers::new().add("/v/**").add("/v/users");
        assert_eq!(matchers.find_match("/v/users").map(AntMatcher::pattern), Some("/v/**"));
        assert_eq!(matchers.len(), 2);
        assert_eq!(matchers.to_string(), "[/v/**, /v/users]");
    }

    #[test]
    fn test_from_patterns() {
        let matchers = AntMatchers::from_patterns(&["/api-docs", "/api-docs/**"]);
        assert!(matchers.matches("/api-docs"));
        assert!(matchers.matches("/api-docs/swagger-config"));
        assert!(!matchers.matches("/api"));
        assert!(!AntMatchers::new().matches("/"));
        assert!(AntMatchers::new().is_empty());
    }
}
