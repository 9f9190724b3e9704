//! Minimal URL parser for the handful of shapes the resolver cares about.
//!
//! Only scheme, host, path and query are extracted. Userinfo and port are
//! stripped from the host, the fragment is dropped. Anything that does not
//! look like `scheme:rest` is rejected, so free text never parses. Spaces are
//! tolerated in the path and query only.

use percent_encoding::percent_decode_str;

/// Schemes that must carry a `//host` authority.
const HIERARCHICAL_SCHEMES: [&str; 2] = ["http", "https"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
  pub scheme: String,
  pub host: String,
  pub path: String,
  pub query: Option<String>,
}

impl ParsedUrl {
  pub fn parse(input: &str) -> Option<Self> {
    if input.is_empty() || input.chars().any(|c| c.is_control()) {
      return None;
    }

    let (scheme, rest) = input.split_once(':')?;
    if !is_valid_scheme(scheme) {
      return None;
    }
    let scheme = scheme.to_ascii_lowercase();

    let rest = rest.split_once('#').map_or(rest, |(before, _)| before);
    let (rest, query) = match rest.split_once('?') {
      Some((before, q)) => (before, Some(q.to_string())),
      None => (rest, None),
    };

    let (host, path) = match rest.strip_prefix("//") {
      Some(after) => {
        let (authority, path) = after.find('/').map_or((after, ""), |i| after.split_at(i));
        if authority.chars().any(|c| c.is_whitespace()) {
          return None;
        }
        (parse_host(authority)?, path)
      }
      None => (String::new(), rest),
    };

    let hierarchical = HIERARCHICAL_SCHEMES.contains(&scheme.as_str());
    if hierarchical && host.is_empty() {
      return None;
    }
    let path = if path.is_empty() && hierarchical { "/".to_string() } else { path.to_string() };

    Some(Self { scheme, host, path, query })
  }

  /// Non-empty path segments, in order.
  pub fn segments(&self) -> impl Iterator<Item = &str> {
    self.path.split('/').filter(|s| !s.is_empty())
  }

  /// First value of the query parameter `name`, form-decoded.
  pub fn query_param(&self, name: &str) -> Option<String> {
    self.query.as_deref()?.split('&').filter(|pair| !pair.is_empty()).find_map(|pair| {
      let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
      (decode_component(key) == name).then(|| decode_component(value))
    })
  }
}

fn is_valid_scheme(scheme: &str) -> bool {
  let mut chars = scheme.chars();
  chars.next().is_some_and(|c| c.is_ascii_alphabetic())
    && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Extract the lowercased host from an authority (`user@host:port`).
fn parse_host(authority: &str) -> Option<String> {
  let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);

  let (host, port) = if host_port.starts_with('[') {
    let end = host_port.find(']')?;
    let (host, tail) = host_port.split_at(end + 1);
    match tail {
      "" => (host, None),
      _ => (host, Some(tail.strip_prefix(':')?)),
    }
  } else {
    match host_port.split_once(':') {
      Some((host, port)) => (host, Some(port)),
      None => (host_port, None),
    }
  };

  if port.is_some_and(|p| !p.chars().all(|c| c.is_ascii_digit())) {
    return None;
  }
  let valid_host = host.starts_with('[')
    || host.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'));
  valid_host.then(|| host.to_ascii_lowercase())
}

fn decode_component(raw: &str) -> String {
  percent_decode_str(&raw.replace('+', " ")).decode_utf8_lossy().into_owned()
}
