//! Parsers for the compact string notations of the manifest dialect.
//!
//! Ports, volume mounts, durations, and `KEY=VALUE` entries all have a
//! one-line short syntax. Each parser here returns `None` on malformed
//! input; the caller attaches the offending key path.

use std::time::Duration;

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::tag,
    character::complete::digit1,
    combinator::all_consuming,
    multi::many1,
};

use crate::model::{PortMapping, Protocol, VolumeMount};

/// Parses one `<digits><unit>` component of a duration string.
fn duration_component(input: &str) -> IResult<&str, Duration> {
    let (input, digits) = digit1(input)?;
    let (input, unit) = alt((
        tag("ms"),
        tag("us"),
        tag("ns"),
        tag("h"),
        tag("m"),
        tag("s"),
    ))
    .parse(input)?;
    let n: u64 = digits.parse().map_err(|_| {
        nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit))
    })?;
    let duration = match unit {
        "h" => Duration::from_secs(n * 3600),
        "m" => Duration::from_secs(n * 60),
        "s" => Duration::from_secs(n),
        "ms" => Duration::from_millis(n),
        "us" => Duration::from_micros(n),
        _ => Duration::from_nanos(n),
    };
    Ok((input, duration))
}

/// Parses duration strings like "30s", "1m30s", "500ms" into a [`Duration`].
///
/// A bare "0" is accepted; any other number requires a unit.
#[must_use]
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s == "0" {
        return Some(Duration::ZERO);
    }
    let (_, parts) = all_consuming(many1(duration_component)).parse(s).ok()?;
    Some(parts.into_iter().sum())
}

/// Renders a [`Duration`] back into the compact notation.
#[must_use]
pub fn format_duration(d: Duration) -> String {
    if d.is_zero() {
        return "0s".to_string();
    }
    let mut out = String::new();
    let mut secs = d.as_secs();
    let hours = secs / 3600;
    secs %= 3600;
    let minutes = secs / 60;
    secs %= 60;
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    if secs > 0 {
        out.push_str(&format!("{secs}s"));
    }
    let nanos = d.subsec_nanos();
    let millis = nanos / 1_000_000;
    let micros = (nanos % 1_000_000) / 1_000;
    let rest = nanos % 1_000;
    if millis > 0 {
        out.push_str(&format!("{millis}ms"));
    }
    if micros > 0 {
        out.push_str(&format!("{micros}us"));
    }
    if rest > 0 {
        out.push_str(&format!("{rest}ns"));
    }
    out
}

/// Parses port strings like "8080", "3000:8080", "127.0.0.1:3000:8080/udp".
///
/// An empty host port ("127.0.0.1::8080") lets the runtime pick one.
#[allow(clippy::option_if_let_else)]
#[must_use]
pub fn parse_port_mapping(s: &str) -> Option<PortMapping> {
    let s = s.trim();
    let (spec, protocol) = if let Some(p) = s.strip_suffix("/udp") {
        (p, Protocol::Udp)
    } else if let Some(p) = s.strip_suffix("/tcp") {
        (p, Protocol::Tcp)
    } else {
        (s, Protocol::Tcp)
    };
    let parts: Vec<&str> = spec.split(':').collect();
    match parts.as_slice() {
        [container] => Some(PortMapping {
            host_address: None,
            host_port: None,
            container_port: container.parse().ok()?,
            protocol,
        }),
        [host, container] => Some(PortMapping {
            host_address: None,
            host_port: Some(host.parse().ok()?),
            container_port: container.parse().ok()?,
            protocol,
        }),
        [address, host, container] => {
            let host_port = if host.is_empty() {
                None
            } else {
                Some(host.parse().ok()?)
            };
            Some(PortMapping {
                host_address: Some((*address).to_string()),
                host_port,
                container_port: container.parse().ok()?,
                protocol,
            })
        }
        _ => None,
    }
}

/// Returns true when a mount source names a host path rather than a volume.
fn is_host_path(source: &str) -> bool {
    source.starts_with('/')
        || source.starts_with("./")
        || source.starts_with("../")
        || source.starts_with('~')
}

/// Parses mount strings like "data:/var/lib", "./conf:/etc/app:ro", "/cache".
///
/// A lone absolute path is an anonymous volume. A source is a bind mount
/// when it looks like a host path and a named volume otherwise.
#[must_use]
pub fn parse_volume_mount(s: &str) -> Option<VolumeMount> {
    let s = s.trim();
    let parts: Vec<&str> = s.split(':').collect();
    let (source, target, mode) = match parts.as_slice() {
        [target] => {
            return target
                .starts_with('/')
                .then(|| VolumeMount::Anonymous {
                    target: (*target).to_string(),
                });
        }
        [source, target] => (*source, *target, None),
        [source, target, mode] => (*source, *target, Some(*mode)),
        _ => return None,
    };
    if source.is_empty() || !target.starts_with('/') {
        return None;
    }
    let read_only = match mode {
        None | Some("rw") => false,
        Some("ro") => true,
        Some(_) => return None,
    };
    Some(if is_host_path(source) {
        VolumeMount::Bind {
            source: source.to_string(),
            target: target.to_string(),
            read_only,
        }
    } else {
        VolumeMount::Named {
            source: source.to_string(),
            target: target.to_string(),
            read_only,
        }
    })
}

/// Splits a list-form environment entry into name and optional value.
///
/// "PORT=8080" yields ("PORT", Some("8080")); a bare "PORT" has no value
/// and is filled from the load-time environment.
#[must_use]
pub fn split_env_entry(s: &str) -> (&str, Option<&str>) {
    match s.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (s, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_single_unit() {
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("2h"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
    }

    #[test]
    fn duration_compound() {
        assert_eq!(parse_duration("1m30s"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("1h2m3s"), Some(Duration::from_secs(3723)));
    }

    #[test]
    fn duration_bare_zero() {
        assert_eq!(parse_duration("0"), Some(Duration::ZERO));
    }

    #[test]
    fn duration_rejects_unitless_and_garbage() {
        assert_eq!(parse_duration("10"), None);
        assert_eq!(parse_duration("abc"), None);
        assert_eq!(parse_duration("30s extra"), None);
    }

    #[test]
    fn duration_formats_back() {
        assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_duration(Duration::from_secs(3723)), "1h2m3s");
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }

    #[test]
    fn port_container_only() {
        let mapping = parse_port_mapping("11434").expect("should parse");
        assert_eq!(mapping.host_port, None);
        assert_eq!(mapping.container_port, 11434);
        assert_eq!(mapping.protocol, Protocol::Tcp);
    }

    #[test]
    fn port_host_and_container() {
        let mapping = parse_port_mapping("3000:8080").expect("should parse");
        assert_eq!(mapping.host_port, Some(3000));
        assert_eq!(mapping.container_port, 8080);
    }

    #[test]
    fn port_with_address_and_protocol() {
        let mapping = parse_port_mapping("127.0.0.1:5353:53/udp").expect("should parse");
        assert_eq!(mapping.host_address.as_deref(), Some("127.0.0.1"));
        assert_eq!(mapping.host_port, Some(5353));
        assert_eq!(mapping.container_port, 53);
        assert_eq!(mapping.protocol, Protocol::Udp);
    }

    #[test]
    fn port_empty_host_port_is_ephemeral() {
        let mapping = parse_port_mapping("127.0.0.1::8080").expect("should parse");
        assert_eq!(mapping.host_address.as_deref(), Some("127.0.0.1"));
        assert_eq!(mapping.host_port, None);
        assert_eq!(mapping.container_port, 8080);
    }

    #[test]
    fn port_rejects_garbage() {
        assert_eq!(parse_port_mapping("not-a-port"), None);
        assert_eq!(parse_port_mapping("1:2:3:4"), None);
        assert_eq!(parse_port_mapping("70000"), None);
    }

    #[test]
    fn mount_named_volume() {
        let mount = parse_volume_mount("ollama:/root/.ollama").expect("should parse");
        assert_eq!(
            mount,
            VolumeMount::Named {
                source: "ollama".into(),
                target: "/root/.ollama".into(),
                read_only: false,
            }
        );
    }

    #[test]
    fn mount_bind_with_mode() {
        let mount = parse_volume_mount("./conf:/etc/app:ro").expect("should parse");
        assert_eq!(
            mount,
            VolumeMount::Bind {
                source: "./conf".into(),
                target: "/etc/app".into(),
                read_only: true,
            }
        );
    }

    #[test]
    fn mount_anonymous() {
        let mount = parse_volume_mount("/var/cache").expect("should parse");
        assert_eq!(
            mount,
            VolumeMount::Anonymous {
                target: "/var/cache".into(),
            }
        );
    }

    #[test]
    fn mount_rejects_bad_forms() {
        assert_eq!(parse_volume_mount("data:relative/path"), None);
        assert_eq!(parse_volume_mount("data:/path:rx"), None);
        assert_eq!(parse_volume_mount("not-absolute"), None);
        assert_eq!(parse_volume_mount(":/path"), None);
    }

    #[test]
    fn env_entry_splits_on_first_equals() {
        assert_eq!(split_env_entry("PORT=8080"), ("PORT", Some("8080")));
        assert_eq!(split_env_entry("URL=a=b"), ("URL", Some("a=b")));
        assert_eq!(split_env_entry("PASSTHROUGH"), ("PASSTHROUGH", None));
    }
}
