//! YAML manifest parsing into the typed model.
//!
//! A document goes through three passes: placeholder resolution on the
//! raw YAML tree, typed extraction into [`Manifest`], and reference
//! validation. Every error carries the dotted key path of the offending
//! node, so `services.open-webui.ports[0]` points at the exact entry.

pub mod short;
pub mod validator;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde_yaml::{Mapping, Value};
use tracing::{debug, warn};

use berth_common::error::{BerthError, Result};

use crate::environment::Environment;
use crate::interpolate;
use crate::model::{
    BuildSpec, CommandSpec, Condition, Dependency, HealthCheck, HealthTest, Manifest, NetworkDecl,
    PortMapping, Protocol, PullPolicy, RestartPolicy, Service, VolumeDecl, VolumeMount,
};

/// Dotted path of YAML keys, used to point error messages at a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    /// The document root, displayed as ".".
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns this path extended by a mapping key.
    #[must_use]
    pub fn key(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }

    /// Returns this path extended by a sequence index.
    #[must_use]
    pub fn index(&self, i: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(format!("[{i}]"));
        Self { segments }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str(".");
        }
        let mut first = true;
        for segment in &self.segments {
            if !first && !segment.starts_with('[') {
                f.write_str(".")?;
            }
            f.write_str(segment)?;
            first = false;
        }
        Ok(())
    }
}

fn malformed(path: &KeyPath, message: impl Into<String>) -> BerthError {
    BerthError::MalformedManifest {
        path: path.to_string(),
        message: message.into(),
    }
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

fn as_mapping<'a>(value: &'a Value, path: &KeyPath) -> Result<&'a Mapping> {
    value
        .as_mapping()
        .ok_or_else(|| malformed(path, format!("expected a mapping, got {}", type_name(value))))
}

fn as_sequence<'a>(value: &'a Value, path: &KeyPath) -> Result<&'a [Value]> {
    value
        .as_sequence()
        .map(Vec::as_slice)
        .ok_or_else(|| malformed(path, format!("expected a sequence, got {}", type_name(value))))
}

fn expect_str<'a>(value: &'a Value, path: &KeyPath) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| malformed(path, format!("expected a string, got {}", type_name(value))))
}

fn expect_bool(value: &Value, path: &KeyPath) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| malformed(path, format!("expected a boolean, got {}", type_name(value))))
}

fn expect_u32(value: &Value, path: &KeyPath) -> Result<u32> {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| {
            malformed(
                path,
                format!("expected a non-negative integer, got {}", type_name(value)),
            )
        })
}

fn expect_u16(value: &Value, path: &KeyPath) -> Result<u16> {
    value
        .as_u64()
        .and_then(|n| u16::try_from(n).ok())
        .ok_or_else(|| malformed(path, format!("expected a port number, got {}", type_name(value))))
}

/// Renders number, bool, and string scalars to their string form.
fn scalar_string(value: &Value, path: &KeyPath) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(malformed(
            path,
            format!("expected a scalar, got {}", type_name(other)),
        )),
    }
}

fn key_str<'a>(key: &'a Value, path: &KeyPath) -> Result<&'a str> {
    key.as_str().ok_or_else(|| {
        malformed(
            path,
            format!("mapping keys must be strings, got {}", type_name(key)),
        )
    })
}

/// Resolves placeholders in every string scalar of the tree.
///
/// Mapping keys are left untouched; only values are substituted.
fn resolve_tree(value: Value, env: &Environment, path: &KeyPath) -> Result<Value> {
    match value {
        Value::String(s) => interpolate::resolve_str(&s, env)
            .map(Value::String)
            .map_err(|e| malformed(path, e.message)),
        Value::Sequence(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| resolve_tree(item, env, &path.index(i)))
            .collect::<Result<Vec<_>>>()
            .map(Value::Sequence),
        Value::Mapping(map) => {
            let mut out = Mapping::new();
            for (key, entry) in map {
                let child = key
                    .as_str()
                    .map_or_else(|| path.clone(), |name| path.key(name));
                let resolved = resolve_tree(entry, env, &child)?;
                let _ = out.insert(key, resolved);
            }
            Ok(Value::Mapping(out))
        }
        Value::Tagged(tagged) => Err(malformed(
            path,
            format!("unsupported YAML tag {}", tagged.tag),
        )),
        other => Ok(other),
    }
}

/// Reads and parses a manifest file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the YAML is invalid, a
/// placeholder is malformed, the document violates the dialect, or a
/// reference check fails.
pub fn load(path: &Path, env: &Environment) -> Result<Manifest> {
    debug!(path = %path.display(), "loading manifest");
    let text = std::fs::read_to_string(path).map_err(|source| BerthError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(&text, env)
}

/// Parses manifest text against the given variable environment.
///
/// # Errors
///
/// Same conditions as [`load`], minus I/O.
pub fn parse_str(input: &str, env: &Environment) -> Result<Manifest> {
    let value: Value = serde_yaml::from_str(input).map_err(|e| BerthError::MalformedManifest {
        path: KeyPath::root().to_string(),
        message: format!("invalid YAML: {e}"),
    })?;
    if value.is_null() {
        return Err(malformed(&KeyPath::root(), "empty document"));
    }
    let value = resolve_tree(value, env, &KeyPath::root())?;
    let manifest = parse_document(&value, env)?;
    validator::validate(&manifest)?;
    Ok(manifest)
}

fn parse_document(value: &Value, env: &Environment) -> Result<Manifest> {
    let path = KeyPath::root();
    let root = as_mapping(value, &path)?;
    let mut manifest = Manifest::default();
    for (key, entry) in root {
        let key = key_str(key, &path)?;
        match key {
            "name" => manifest.name = Some(expect_str(entry, &path.key("name"))?.to_string()),
            "version" => {
                warn!("the `version` key is obsolete and ignored");
            }
            "services" => manifest.services = parse_services(entry, env, &path.key("services"))?,
            "volumes" => manifest.volumes = parse_volume_decls(entry, &path.key("volumes"))?,
            "networks" => manifest.networks = parse_network_decls(entry, &path.key("networks"))?,
            _ if key.starts_with("x-") => {}
            _ => return Err(malformed(&path.key(key), "unknown top-level property")),
        }
    }
    Ok(manifest)
}

fn parse_services(value: &Value, env: &Environment, path: &KeyPath) -> Result<Vec<Service>> {
    let map = as_mapping(value, path)?;
    let mut services = Vec::with_capacity(map.len());
    for (key, body) in map {
        let name = key_str(key, path)?;
        services.push(parse_service(name, body, env, &path.key(name))?);
    }
    Ok(services)
}

fn parse_service(name: &str, value: &Value, env: &Environment, path: &KeyPath) -> Result<Service> {
    let body = as_mapping(value, path)?;
    let mut service = Service {
        name: name.to_string(),
        ..Service::default()
    };
    for (key, entry) in body {
        let key = key_str(key, path)?;
        let entry_path = path.key(key);
        match key {
            "image" => service.image = Some(expect_str(entry, &entry_path)?.to_string()),
            "build" => service.build = Some(parse_build(entry, env, &entry_path)?),
            "container_name" => {
                service.container_name = Some(expect_str(entry, &entry_path)?.to_string());
            }
            "command" => service.command = Some(parse_command(entry, &entry_path)?),
            "entrypoint" => service.entrypoint = Some(parse_command(entry, &entry_path)?),
            "environment" => service.environment = parse_environment(entry, env, &entry_path)?,
            "volumes" => service.volumes = parse_mounts(entry, &entry_path)?,
            "ports" => service.ports = parse_ports(entry, &entry_path)?,
            "depends_on" => service.depends_on = parse_depends_on(entry, &entry_path)?,
            "healthcheck" => service.healthcheck = parse_healthcheck(entry, &entry_path)?,
            "restart" => service.restart = parse_restart(entry, &entry_path)?,
            "pull_policy" => service.pull_policy = Some(parse_pull_policy(entry, &entry_path)?),
            "tty" => service.tty = expect_bool(entry, &entry_path)?,
            "extra_hosts" => service.extra_hosts = parse_string_list(entry, &entry_path)?,
            "networks" => service.networks = parse_network_refs(entry, &entry_path)?,
            _ if key.starts_with("x-") => {}
            _ => return Err(malformed(&entry_path, "unknown service property")),
        }
    }
    Ok(service)
}

fn parse_build(value: &Value, env: &Environment, path: &KeyPath) -> Result<BuildSpec> {
    match value {
        Value::String(context) => Ok(BuildSpec {
            context: context.clone(),
            ..BuildSpec::default()
        }),
        Value::Mapping(map) => {
            let mut build = BuildSpec::default();
            let mut has_context = false;
            for (key, entry) in map {
                let key = key_str(key, path)?;
                let entry_path = path.key(key);
                match key {
                    "context" => {
                        build.context = expect_str(entry, &entry_path)?.to_string();
                        has_context = true;
                    }
                    "dockerfile" => {
                        build.dockerfile = Some(expect_str(entry, &entry_path)?.to_string());
                    }
                    "args" => build.args = parse_environment(entry, env, &entry_path)?,
                    _ => return Err(malformed(&entry_path, "unknown build property")),
                }
            }
            if !has_context {
                return Err(malformed(path, "build requires a `context`"));
            }
            Ok(build)
        }
        other => Err(malformed(
            path,
            format!("expected a string or mapping, got {}", type_name(other)),
        )),
    }
}

fn parse_command(value: &Value, path: &KeyPath) -> Result<CommandSpec> {
    match value {
        Value::String(s) => Ok(CommandSpec::Shell(s.clone())),
        Value::Sequence(items) => {
            let argv = items
                .iter()
                .enumerate()
                .map(|(i, item)| scalar_string(item, &path.index(i)))
                .collect::<Result<Vec<_>>>()?;
            Ok(CommandSpec::Argv(argv))
        }
        other => Err(malformed(
            path,
            format!("expected a string or sequence, got {}", type_name(other)),
        )),
    }
}

/// Parses both environment notations into a resolved map.
///
/// A bare name (list form) or null value (map form) passes the variable
/// through from the load-time environment; an unset one is omitted.
fn parse_environment(
    value: &Value,
    env: &Environment,
    path: &KeyPath,
) -> Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    match value {
        Value::Sequence(items) => {
            for (i, item) in items.iter().enumerate() {
                let item_path = path.index(i);
                let entry = expect_str(item, &item_path)?;
                let (name, assigned) = short::split_env_entry(entry);
                if name.is_empty() {
                    return Err(malformed(&item_path, "empty variable name"));
                }
                match assigned.map(ToString::to_string).or_else(|| {
                    env.get(name).map(ToString::to_string)
                }) {
                    Some(v) => {
                        let _ = out.insert(name.to_string(), v);
                    }
                    None => debug!(variable = name, "passthrough variable unset, omitted"),
                }
            }
        }
        Value::Mapping(map) => {
            for (key, entry) in map {
                let name = key_str(key, path)?;
                let entry_path = path.key(name);
                if entry.is_null() {
                    match env.get(name) {
                        Some(v) => {
                            let _ = out.insert(name.to_string(), v.to_string());
                        }
                        None => debug!(variable = name, "passthrough variable unset, omitted"),
                    }
                } else {
                    let _ = out.insert(name.to_string(), scalar_string(entry, &entry_path)?);
                }
            }
        }
        other => {
            return Err(malformed(
                path,
                format!("expected a mapping or sequence, got {}", type_name(other)),
            ));
        }
    }
    Ok(out)
}

fn parse_mounts(value: &Value, path: &KeyPath) -> Result<Vec<VolumeMount>> {
    let items = as_sequence(value, path)?;
    let mut mounts = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let item_path = path.index(i);
        let mount = match item {
            Value::String(s) => short::parse_volume_mount(s)
                .ok_or_else(|| malformed(&item_path, format!("invalid volume mount \"{s}\"")))?,
            Value::Mapping(_) => parse_mount_long(item, &item_path)?,
            other => {
                return Err(malformed(
                    &item_path,
                    format!("expected a string or mapping, got {}", type_name(other)),
                ));
            }
        };
        mounts.push(mount);
    }
    Ok(mounts)
}

fn parse_mount_long(value: &Value, path: &KeyPath) -> Result<VolumeMount> {
    let map = as_mapping(value, path)?;
    let mut kind: Option<&str> = None;
    let mut source: Option<String> = None;
    let mut target: Option<String> = None;
    let mut read_only = false;
    for (key, entry) in map {
        let key = key_str(key, path)?;
        let entry_path = path.key(key);
        match key {
            "type" => kind = Some(expect_str(entry, &entry_path)?),
            "source" => source = Some(expect_str(entry, &entry_path)?.to_string()),
            "target" => target = Some(expect_str(entry, &entry_path)?.to_string()),
            "read_only" => read_only = expect_bool(entry, &entry_path)?,
            _ => return Err(malformed(&entry_path, "unknown mount property")),
        }
    }
    let target = target.ok_or_else(|| malformed(path, "mount requires a `target`"))?;
    if !target.starts_with('/') {
        return Err(malformed(
            &path.key("target"),
            "target must be an absolute path",
        ));
    }
    match kind {
        Some("volume") => Ok(match source {
            Some(source) => VolumeMount::Named {
                source,
                target,
                read_only,
            },
            None => VolumeMount::Anonymous { target },
        }),
        Some("bind") => {
            let source = source.ok_or_else(|| malformed(path, "bind mount requires a `source`"))?;
            Ok(VolumeMount::Bind {
                source,
                target,
                read_only,
            })
        }
        Some(other) => Err(malformed(
            &path.key("type"),
            format!("unknown mount type \"{other}\""),
        )),
        None => Err(malformed(path, "mount requires a `type`")),
    }
}

fn parse_ports(value: &Value, path: &KeyPath) -> Result<Vec<PortMapping>> {
    let items = as_sequence(value, path)?;
    let mut ports = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let item_path = path.index(i);
        let mapping = match item {
            Value::String(_) | Value::Number(_) => {
                let text = scalar_string(item, &item_path)?;
                short::parse_port_mapping(&text)
                    .ok_or_else(|| malformed(&item_path, format!("invalid port mapping \"{text}\"")))?
            }
            Value::Mapping(_) => parse_port_long(item, &item_path)?,
            other => {
                return Err(malformed(
                    &item_path,
                    format!("expected a string or mapping, got {}", type_name(other)),
                ));
            }
        };
        ports.push(mapping);
    }
    Ok(ports)
}

fn parse_port_long(value: &Value, path: &KeyPath) -> Result<PortMapping> {
    let map = as_mapping(value, path)?;
    let mut target: Option<u16> = None;
    let mut published: Option<u16> = None;
    let mut host_address: Option<String> = None;
    let mut protocol = Protocol::Tcp;
    for (key, entry) in map {
        let key = key_str(key, path)?;
        let entry_path = path.key(key);
        match key {
            "target" => target = Some(expect_u16(entry, &entry_path)?),
            "published" => {
                let text = scalar_string(entry, &entry_path)?;
                published = Some(text.parse().map_err(|_| {
                    malformed(&entry_path, format!("invalid published port \"{text}\""))
                })?);
            }
            "host_ip" => host_address = Some(expect_str(entry, &entry_path)?.to_string()),
            "protocol" => {
                protocol = match expect_str(entry, &entry_path)? {
                    "tcp" => Protocol::Tcp,
                    "udp" => Protocol::Udp,
                    other => {
                        return Err(malformed(
                            &entry_path,
                            format!("unknown protocol \"{other}\""),
                        ));
                    }
                };
            }
            _ => return Err(malformed(&entry_path, "unknown port property")),
        }
    }
    let container_port = target.ok_or_else(|| malformed(path, "port requires a `target`"))?;
    Ok(PortMapping {
        host_address,
        host_port: published,
        container_port,
        protocol,
    })
}

fn parse_depends_on(value: &Value, path: &KeyPath) -> Result<Vec<Dependency>> {
    match value {
        Value::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| Ok(Dependency::on(expect_str(item, &path.index(i))?)))
            .collect(),
        Value::Mapping(map) => {
            let mut deps = Vec::with_capacity(map.len());
            for (key, entry) in map {
                let service = key_str(key, path)?;
                let entry_path = path.key(service);
                let condition = parse_dependency_condition(entry, &entry_path)?;
                deps.push(Dependency {
                    service: service.to_string(),
                    condition,
                });
            }
            Ok(deps)
        }
        other => Err(malformed(
            path,
            format!("expected a mapping or sequence, got {}", type_name(other)),
        )),
    }
}

fn parse_dependency_condition(value: &Value, path: &KeyPath) -> Result<Condition> {
    if value.is_null() {
        return Ok(Condition::Started);
    }
    let map = as_mapping(value, path)?;
    let mut condition = Condition::Started;
    for (key, entry) in map {
        let key = key_str(key, path)?;
        let entry_path = path.key(key);
        match key {
            "condition" => {
                let text = expect_str(entry, &entry_path)?;
                condition = Condition::from_str_opt(text)
                    .ok_or_else(|| malformed(&entry_path, format!("unknown condition \"{text}\"")))?;
            }
            // Accepted for compatibility; start ordering does not act on them.
            "restart" | "required" => {
                let _ = expect_bool(entry, &entry_path)?;
            }
            _ => return Err(malformed(&entry_path, "unknown dependency property")),
        }
    }
    Ok(condition)
}

fn parse_health_test(value: &Value, path: &KeyPath) -> Result<Option<HealthTest>> {
    match value {
        Value::String(s) => Ok(Some(HealthTest::Shell(s.clone()))),
        Value::Sequence(items) => {
            let argv = items
                .iter()
                .enumerate()
                .map(|(i, item)| scalar_string(item, &path.index(i)))
                .collect::<Result<Vec<_>>>()?;
            match argv.first().map(String::as_str) {
                Some("NONE") => Ok(None),
                Some("CMD") => Ok(Some(HealthTest::Command(argv[1..].to_vec()))),
                Some("CMD-SHELL") if argv.len() == 2 => {
                    Ok(Some(HealthTest::Shell(argv[1].clone())))
                }
                Some("CMD-SHELL") => {
                    Err(malformed(path, "CMD-SHELL takes exactly one command string"))
                }
                _ => Err(malformed(path, "test must start with CMD, CMD-SHELL, or NONE")),
            }
        }
        other => Err(malformed(
            path,
            format!("expected a string or sequence, got {}", type_name(other)),
        )),
    }
}

fn parse_duration_value(value: &Value, path: &KeyPath) -> Result<Duration> {
    let text = expect_str(value, path)?;
    short::parse_duration(text)
        .ok_or_else(|| malformed(path, format!("invalid duration \"{text}\"")))
}

fn parse_healthcheck(value: &Value, path: &KeyPath) -> Result<Option<HealthCheck>> {
    let map = as_mapping(value, path)?;
    let mut test = None;
    let mut interval = None;
    let mut timeout = None;
    let mut start_period = None;
    let mut retries = None;
    let mut disabled = false;
    for (key, entry) in map {
        let key = key_str(key, path)?;
        let entry_path = path.key(key);
        match key {
            "test" => test = Some(parse_health_test(entry, &entry_path)?),
            "interval" => interval = Some(parse_duration_value(entry, &entry_path)?),
            "timeout" => timeout = Some(parse_duration_value(entry, &entry_path)?),
            "start_period" => start_period = Some(parse_duration_value(entry, &entry_path)?),
            "retries" => retries = Some(expect_u32(entry, &entry_path)?),
            "disable" => disabled = expect_bool(entry, &entry_path)?,
            _ => return Err(malformed(&entry_path, "unknown healthcheck property")),
        }
    }
    if disabled {
        return Ok(None);
    }
    match test {
        Some(Some(test)) => Ok(Some(HealthCheck {
            test,
            interval,
            timeout,
            start_period,
            retries,
        })),
        // An explicit ["NONE"] test disables the probe.
        Some(None) => Ok(None),
        None => Err(malformed(path, "healthcheck requires a `test`")),
    }
}

fn parse_restart(value: &Value, path: &KeyPath) -> Result<RestartPolicy> {
    match value {
        Value::String(s) => RestartPolicy::from_str_opt(s)
            .ok_or_else(|| malformed(path, format!("unknown restart policy \"{s}\""))),
        Value::Bool(false) => Ok(RestartPolicy::No),
        other => Err(malformed(
            path,
            format!("expected a restart policy name, got {}", type_name(other)),
        )),
    }
}

fn parse_pull_policy(value: &Value, path: &KeyPath) -> Result<PullPolicy> {
    let text = expect_str(value, path)?;
    PullPolicy::from_str_opt(text)
        .ok_or_else(|| malformed(path, format!("unknown pull policy \"{text}\"")))
}

fn parse_string_list(value: &Value, path: &KeyPath) -> Result<Vec<String>> {
    let items = as_sequence(value, path)?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| Ok(expect_str(item, &path.index(i))?.to_string()))
        .collect()
}

fn parse_network_refs(value: &Value, path: &KeyPath) -> Result<Vec<String>> {
    match value {
        Value::Sequence(_) => parse_string_list(value, path),
        Value::Mapping(map) => {
            let mut names = Vec::with_capacity(map.len());
            for (key, entry) in map {
                let name = key_str(key, path)?;
                if !entry.is_null() {
                    return Err(malformed(
                        &path.key(name),
                        "network attachment options are not supported",
                    ));
                }
                names.push(name.to_string());
            }
            Ok(names)
        }
        other => Err(malformed(
            path,
            format!("expected a mapping or sequence, got {}", type_name(other)),
        )),
    }
}

fn parse_volume_decls(value: &Value, path: &KeyPath) -> Result<Vec<VolumeDecl>> {
    let map = as_mapping(value, path)?;
    let mut decls = Vec::with_capacity(map.len());
    for (key, body) in map {
        let name = key_str(key, path)?;
        let decl_path = path.key(name);
        let mut decl = VolumeDecl {
            name: name.to_string(),
            ..VolumeDecl::default()
        };
        if !body.is_null() {
            for (key, entry) in as_mapping(body, &decl_path)? {
                let key = key_str(key, &decl_path)?;
                let entry_path = decl_path.key(key);
                match key {
                    "driver" => decl.driver = Some(expect_str(entry, &entry_path)?.to_string()),
                    "external" => decl.external = expect_bool(entry, &entry_path)?,
                    _ if key.starts_with("x-") => {}
                    _ => return Err(malformed(&entry_path, "unknown volume property")),
                }
            }
        }
        decls.push(decl);
    }
    Ok(decls)
}

fn parse_network_decls(value: &Value, path: &KeyPath) -> Result<Vec<NetworkDecl>> {
    let map = as_mapping(value, path)?;
    let mut decls = Vec::with_capacity(map.len());
    for (key, body) in map {
        let name = key_str(key, path)?;
        let decl_path = path.key(name);
        let mut decl = NetworkDecl {
            name: name.to_string(),
            ..NetworkDecl::default()
        };
        if !body.is_null() {
            for (key, entry) in as_mapping(body, &decl_path)? {
                let key = key_str(key, &decl_path)?;
                let entry_path = decl_path.key(key);
                match key {
                    "driver" => decl.driver = Some(expect_str(entry, &entry_path)?.to_string()),
                    "external" => decl.external = expect_bool(entry, &entry_path)?,
                    _ if key.starts_with("x-") => {}
                    _ => return Err(malformed(&entry_path, "unknown network property")),
                }
            }
        }
        decls.push(decl);
    }
    Ok(decls)
}
