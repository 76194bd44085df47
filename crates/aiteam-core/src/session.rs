//! Session naming and lookup.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::process::Command;

use crate::error::{AiteamError, Result};
use crate::tmux::PaneBackend;

/// Name used when nothing better can be derived
pub const FALLBACK_SESSION: &str = "ai-team";

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid WHITESPACE regex"));
static SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[/:\\]+").expect("Invalid SEPARATORS regex"));
static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w-]+").expect("Invalid NON_WORD regex"));
static DASH_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").expect("Invalid DASH_RUNS regex"));

/// Turn an arbitrary string into a tmux-friendly session name
pub fn sanitize_session_name(raw: &str) -> String {
    let s = raw.trim();
    if s.is_empty() {
        return FALLBACK_SESSION.to_string();
    }
    let s = WHITESPACE.replace_all(s, "-");
    let s = SEPARATORS.replace_all(&s, "-");
    let s = NON_WORD.replace_all(&s, "-");
    let s = DASH_RUNS.replace_all(&s, "-");
    let s = s.trim_matches('-');
    if s.is_empty() {
        FALLBACK_SESSION.to_string()
    } else {
        s.to_string()
    }
}

/// Repository name from a git remote URL (https, ssh or scp-like, or a path)
pub fn repo_name_from_remote_url(url: &str) -> Option<String> {
    let u = url.trim();
    if u.is_empty() {
        return None;
    }

    let path = if let Some((_, rest)) = u.split_once("://") {
        let rest = rest.split(['?', '#']).next().unwrap_or("");
        rest.split_once('/').map(|(_, p)| p).unwrap_or("")
    } else if !u.starts_with('/') {
        u.split_once(':').map(|(_, p)| p).unwrap_or(u)
    } else {
        u
    };

    let base = path
        .trim_end_matches('/')
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("");
    let name = base.strip_suffix(".git").unwrap_or(base).trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Order remotes: `origin`, then `origin*`, then the rest, each lexicographic
pub fn sort_remotes(remotes: &mut [String]) {
    remotes.sort_by(|a, b| {
        let rank = |r: &str| {
            if r == "origin" {
                0
            } else if r.starts_with("origin") {
                1
            } else {
                2
            }
        };
        (rank(a), a.as_str()).cmp(&(rank(b), b.as_str()))
    });
}

async fn git_stdout(cwd: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(cwd)
        .args(args)
        .output()
        .await
        .ok()?;
    if output.status.success() {
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        None
    }
}

/// Preferred repository name for `cwd`: first usable remote, else the top-level dir
pub async fn git_repo_name(cwd: &Path) -> Option<String> {
    let mut remotes: Vec<String> = git_stdout(cwd, &["remote"])
        .await
        .unwrap_or_default()
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();
    sort_remotes(&mut remotes);

    for remote in &remotes {
        if let Some(url) = git_stdout(cwd, &["remote", "get-url", remote]).await {
            if let Some(name) = repo_name_from_remote_url(&url) {
                return Some(name);
            }
        }
    }

    let top = git_stdout(cwd, &["rev-parse", "--show-toplevel"]).await?;
    Path::new(top.trim_end_matches(['/', '\\']))
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .filter(|n| !n.is_empty())
}

/// `base`, or `base-2`, `base-3`... when taken
pub fn next_available_session_name(backend: &dyn PaneBackend, base: &str) -> Result<String> {
    if !backend.session_exists(base)? {
        return Ok(base.to_string());
    }
    let mut n = 2u32;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !backend.session_exists(&candidate)? {
            return Ok(candidate);
        }
        n += 1;
    }
}

/// Name for a session about to be created; the flag is true when it was derived
pub async fn resolve_new_session_name(
    backend: &dyn PaneBackend,
    requested: Option<&str>,
    cwd: &Path,
) -> Result<(String, bool)> {
    if let Some(req) = requested.map(str::trim).filter(|r| !r.is_empty()) {
        return Ok((req.to_string(), false));
    }
    let base = match git_repo_name(cwd).await {
        Some(repo) => sanitize_session_name(&repo),
        None => FALLBACK_SESSION.to_string(),
    };
    Ok((next_available_session_name(backend, &base)?, true))
}

/// Session for commands on an existing session: explicit, else the caller's
pub fn resolve_session(backend: &dyn PaneBackend, session: Option<&str>) -> Result<String> {
    if let Some(s) = session.map(str::trim).filter(|s| !s.is_empty()) {
        return Ok(s.to_string());
    }
    backend
        .current_session()
        .map_err(|_| AiteamError::SessionUnknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tmux::FakeBackend;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sanitize_session_name() {
        assert_eq!(sanitize_session_name("my repo"), "my-repo");
        assert_eq!(sanitize_session_name("org/repo:main"), "org-repo-main");
        assert_eq!(sanitize_session_name("a.b..c"), "a-b-c");
        assert_eq!(sanitize_session_name("--x--"), "x");
        assert_eq!(sanitize_session_name("snake_case"), "snake_case");
        assert_eq!(sanitize_session_name("   "), FALLBACK_SESSION);
        assert_eq!(sanitize_session_name("..."), FALLBACK_SESSION);
    }

    #[test]
    fn test_repo_name_from_remote_url() {
        let cases = [
            ("https://github.com/acme/widgets.git", Some("widgets")),
            ("https://github.com/acme/widgets/", Some("widgets")),
            ("ssh://git@host:2222/acme/tools.git", Some("tools")),
            ("git@github.com:acme/gadgets.git", Some("gadgets")),
            ("/srv/git/local.git", Some("local")),
            ("https://host.example", None),
            ("", None),
        ];
        for (url, expected) in cases {
            assert_eq!(
                repo_name_from_remote_url(url).as_deref(),
                expected,
                "url: {}",
                url
            );
        }
    }

    #[test]
    fn test_sort_remotes() {
        let mut remotes: Vec<String> = ["upstream", "origin2", "fork", "origin", "origin-b"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        sort_remotes(&mut remotes);
        assert_eq!(
            remotes,
            vec!["origin", "origin-b", "origin2", "fork", "upstream"]
        );
    }

    #[test]
    fn test_next_available_session_name() {
        let backend = FakeBackend::new("widgets", &["main"]);
        assert_eq!(
            next_available_session_name(&backend, "tools").unwrap(),
            "tools"
        );
        assert_eq!(
            next_available_session_name(&backend, "widgets").unwrap(),
            "widgets-2"
        );
        backend.create_session("widgets-2", None, false).unwrap();
        assert_eq!(
            next_available_session_name(&backend, "widgets").unwrap(),
            "widgets-3"
        );
    }

    #[tokio::test]
    async fn test_resolve_new_session_name_explicit() {
        let backend = FakeBackend::new("demo", &["main"]);
        let (name, auto) = resolve_new_session_name(&backend, Some(" demo "), Path::new("/"))
            .await
            .unwrap();
        assert_eq!(name, "demo");
        assert!(!auto);
    }

    #[tokio::test]
    async fn test_resolve_new_session_name_outside_git() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new(FALLBACK_SESSION, &["main"]);
        let (name, auto) = resolve_new_session_name(&backend, None, dir.path())
            .await
            .unwrap();
        assert!(auto);
        assert_eq!(name, format!("{}-2", FALLBACK_SESSION));
    }

    #[test]
    fn test_resolve_session() {
        let backend = FakeBackend::new("demo", &["main"]);
        assert_eq!(resolve_session(&backend, Some("other")).unwrap(), "other");
        assert!(matches!(
            resolve_session(&backend, None).unwrap_err(),
            AiteamError::SessionUnknown
        ));

        let inside = FakeBackend::new("demo", &["main"]).with_current_pane("%0");
        assert_eq!(resolve_session(&inside, Some("")).unwrap(), "demo");
    }
}
