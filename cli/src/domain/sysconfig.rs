//! Edits to `/etc/sysconfig` style `KEY="value"` files.

use std::net::Ipv4Addr;
use std::sync::LazyLock;

use regex::Regex;

/// Port etcd serves clients on.
pub const ETCD_CLIENT_PORT: u16 = 2379;

static LISTEN_CLIENT_URLS_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Constant pattern.
    #[allow(clippy::expect_used)]
    Regex::new(r"(?m)^[ \t]*#?[ \t]*ETCD_LISTEN_CLIENT_URLS=.*$").expect("valid regex")
});

static ADVERTISE_CLIENT_URLS_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?m)^[ \t]*#?[ \t]*ETCD_ADVERTISE_CLIENT_URLS=.*$").expect("valid regex")
});

/// Point etcd's client listen and advertise URLs at `ip`.
///
/// The first live assignment (or, failing that, the first commented-out one)
/// is replaced in place and every other variant of the same key is dropped.
/// Missing keys are appended.
#[must_use]
pub fn set_etcd_client_urls(content: &str, ip: Ipv4Addr) -> String {
    let listen = format!(
        "ETCD_LISTEN_CLIENT_URLS=\"http://{ip}:{ETCD_CLIENT_PORT},http://127.0.0.1:{ETCD_CLIENT_PORT}\""
    );
    let advertise = format!("ETCD_ADVERTISE_CLIENT_URLS=\"http://{ip}:{ETCD_CLIENT_PORT}\"");
    let content = set_assignment(content, &LISTEN_CLIENT_URLS_RE, &listen);
    set_assignment(&content, &ADVERTISE_CLIENT_URLS_RE, &advertise)
}

fn set_assignment(content: &str, re: &Regex, line: &str) -> String {
    let matches: Vec<_> = re.find_iter(content).collect();
    let target = matches
        .iter()
        .find(|m| !m.as_str().trim_start().starts_with('#'))
        .or_else(|| matches.first())
        .map(regex::Match::start);
    let Some(target) = target else {
        let mut out = content.to_string();
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(line);
        out.push('\n');
        return out;
    };

    let mut out = String::with_capacity(content.len() + line.len());
    let mut rest = 0;
    for m in &matches {
        out.push_str(&content[rest..m.start()]);
        rest = m.end();
        if m.start() == target {
            out.push_str(line);
        } else if content[rest..].starts_with('\n') {
            rest += 1;
        }
    }
    out.push_str(&content[rest..]);
    out
}
