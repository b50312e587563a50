//! In-memory host model shared by the integration tests
//!
//! `FakeHost` answers the `ip`, `wg` and `wg-quick` invocations the
//! controller issues, tracks links, addresses and peer tables, and can be
//! told to fail selected commands. Every command sleeps briefly so that
//! overlapping operations on one interface would be observable.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use wg_controller::executor::{CommandExecutor, CommandResult, HostCommand};

pub const KEY_A: &str = "aPxGwq8zERHQ3Q1cOJnYLHxjBAk0pqSo6LmsuUKU7n0=";
pub const KEY_B: &str = "bQyHxr9aFSIR4R2dPKoZMIykCBl1qrTp7MntvVLV8o1=";
pub const KEY_C: &str = "cRzIys0bGTJS5S3eQLpaNJzlDCm2rsUq8NouwWMW9p2=";

/// Interface with no peers
pub fn config_without_peers() -> String {
    "[Interface]\nPrivateKey = yAnz5TF+lXXJte14tji3zlMNq+hd2rYUIgJBgB3fBmk=\nListenPort = 51820\nAddress = 10.8.0.1/24\n".to_string()
}

/// Interface with the given peers, one /32 each
pub fn config_with_peers(keys: &[&str]) -> String {
    let mut text = config_without_peers();
    for (idx, key) in keys.iter().enumerate() {
        text.push_str(&format!(
            "\n[Peer]\nPublicKey = {}\nAllowedIPs = 10.8.0.{}/32\n",
            key,
            idx + 2
        ));
    }
    text
}

type Rule = Box<dyn Fn(&HostCommand) -> bool + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Link {
    pub up: bool,
    pub addresses: Vec<String>,
    /// public key -> allowed IPs
    pub peers: BTreeMap<String, String>,
}

#[derive(Default)]
struct HostState {
    links: BTreeMap<String, Link>,
    log: Vec<HostCommand>,
    in_flight: HashMap<String, usize>,
    total_in_flight: usize,
    max_in_flight: usize,
    overlapped: bool,
}

pub struct FakeHost {
    state: Mutex<HostState>,
    rules: Mutex<Vec<Rule>>,
    delay: Duration,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HostState::default()),
            rules: Mutex::new(Vec::new()),
            delay: Duration::from_millis(5),
        }
    }

    /// Fail every command whose rendered command line starts with `prefix`
    pub fn fail_prefix(&self, prefix: &str) {
        let prefix = prefix.to_string();
        self.fail_when(move |cmd| cmd.command_line().starts_with(&prefix));
    }

    pub fn fail_when(&self, rule: impl Fn(&HostCommand) -> bool + Send + Sync + 'static) {
        self.rules.lock().unwrap().push(Box::new(rule));
    }

    pub fn clear_failures(&self) {
        self.rules.lock().unwrap().clear();
    }

    /// Pre-create a running interface
    pub fn add_link(&self, name: &str) {
        self.state.lock().unwrap().links.insert(
            name.to_string(),
            Link {
                up: true,
                ..Link::default()
            },
        );
    }

    pub fn link(&self, name: &str) -> Option<Link> {
        self.state.lock().unwrap().links.get(name).cloned()
    }

    pub fn commands(&self) -> Vec<HostCommand> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.commands().iter().map(HostCommand::command_line).collect()
    }

    /// Command lines excluding read-only probes
    pub fn mutating_lines(&self) -> Vec<String> {
        self.command_lines()
            .into_iter()
            .filter(|line| {
                !line.starts_with("ip link show")
                    && !line.starts_with("ip addr show")
                    && !line.starts_with("wg show")
            })
            .collect()
    }

    pub fn overlapped(&self) -> bool {
        self.state.lock().unwrap().overlapped
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_in_flight
    }

    fn enter(&self, command: &HostCommand) -> Option<String> {
        let target = target_of(command);
        let mut state = self.state.lock().unwrap();
        state.log.push(command.clone());
        state.total_in_flight += 1;
        state.max_in_flight = state.max_in_flight.max(state.total_in_flight);
        if let Some(name) = &target {
            let count = state.in_flight.entry(name.clone()).or_default();
            *count += 1;
            if *count > 1 {
                state.overlapped = true;
            }
        }
        target
    }

    fn leave(&self, target: Option<String>) {
        let mut state = self.state.lock().unwrap();
        state.total_in_flight -= 1;
        if let Some(name) = target {
            if let Some(count) = state.in_flight.get_mut(&name) {
                *count -= 1;
            }
        }
    }

    fn forced_failure(&self, command: &HostCommand) -> bool {
        self.rules.lock().unwrap().iter().any(|rule| rule(command))
    }

    fn apply(&self, command: &HostCommand) -> CommandResult {
        if self.forced_failure(command) {
            return CommandResult::from_exit(1, "", format!("forced failure: {}", command.command_line()));
        }

        let args: Vec<&str> = command.args.iter().map(String::as_str).collect();
        let mut state = self.state.lock().unwrap();
        let links = &mut state.links;

        match (command.program.as_str(), args.as_slice()) {
            ("ip", ["link", "show", name]) => match links.get(*name) {
                Some(link) => CommandResult::success(format!(
                    "5: {}: <POINTOPOINT,NOARP{}> mtu 1420\n",
                    name,
                    if link.up { ",UP" } else { "" }
                )),
                None => missing_device(name),
            },
            ("ip", ["link", "add", "dev", name, "type", "wireguard"]) => {
                if links.contains_key(*name) {
                    return CommandResult::from_exit(2, "", "RTNETLINK answers: File exists");
                }
                links.insert(name.to_string(), Link::default());
                CommandResult::success("")
            }
            ("ip", ["link", "set", name, "up"]) => match links.get_mut(*name) {
                Some(link) => {
                    link.up = true;
                    CommandResult::success("")
                }
                None => missing_device(name),
            },
            ("ip", ["addr", "add", address, "dev", name]) => match links.get_mut(*name) {
                Some(link) => {
                    link.addresses.push(address.to_string());
                    CommandResult::success("")
                }
                None => missing_device(name),
            },
            ("ip", ["addr", "show", name]) => match links.get(*name) {
                Some(link) => CommandResult::success(
                    link.addresses
                        .iter()
                        .map(|a| format!("    inet {}\n", a))
                        .collect::<String>(),
                ),
                None => missing_device(name),
            },
            ("wg", ["show", "interfaces"]) => {
                CommandResult::success(format!("{}\n", links.keys().cloned().collect::<Vec<_>>().join(" ")))
            }
            ("wg", ["show", name]) => match links.get(*name) {
                Some(link) => {
                    let mut out = format!("interface: {}\n", name);
                    for (key, allowed) in &link.peers {
                        out.push_str(&format!("\npeer: {}\n  allowed ips: {}\n", key, allowed));
                    }
                    CommandResult::success(out)
                }
                None => CommandResult::from_exit(1, "", "Unable to access interface: No such device"),
            },
            ("wg", ["setconf", name, "/dev/stdin"]) | ("wg", ["syncconf", name, "/dev/stdin"]) => {
                let text = command.stdin.clone().unwrap_or_default();
                match links.get_mut(*name) {
                    Some(link) => {
                        link.peers = parse_peers(&text);
                        CommandResult::success("")
                    }
                    None => no_such_device(),
                }
            }
            ("wg", ["syncconf", name, path]) => {
                let text = match std::fs::read_to_string(path) {
                    Ok(text) => text,
                    Err(e) => return CommandResult::from_exit(1, "", format!("{}: {}", path, e)),
                };
                if text.contains("[Interface]") && text.contains("Address") {
                    return CommandResult::from_exit(1, "", "Line unrecognized: `Address=10.8.0.1/24'");
                }
                match links.get_mut(*name) {
                    Some(link) => {
                        link.peers = parse_peers(&text);
                        CommandResult::success("")
                    }
                    None => no_such_device(),
                }
            }
            ("wg", ["set", name, "peer", key, "remove"]) => match links.get_mut(*name) {
                Some(link) => {
                    link.peers.remove(*key);
                    CommandResult::success("")
                }
                None => no_such_device(),
            },
            ("wg", ["set", name, "peer", key, "allowed-ips", allowed, ..]) => match links.get_mut(*name) {
                Some(link) => {
                    link.peers.insert(key.to_string(), allowed.to_string());
                    CommandResult::success("")
                }
                None => no_such_device(),
            },
            ("wg-quick", [verb, path]) => {
                let name = stem(path);
                match *verb {
                    "up" => {
                        if links.contains_key(&name) {
                            return CommandResult::from_exit(1, "", format!("wg-quick: `{}' already exists", name));
                        }
                        let text = match std::fs::read_to_string(path) {
                            Ok(text) => text,
                            Err(_) => {
                                return CommandResult::from_exit(1, "", format!("wg-quick: `{}' does not exist", path))
                            }
                        };
                        links.insert(
                            name,
                            Link {
                                up: true,
                                addresses: addresses(&text),
                                peers: parse_peers(&text),
                            },
                        );
                        CommandResult::success("")
                    }
                    "down" => match links.remove(&name) {
                        Some(_) => CommandResult::success(""),
                        None => CommandResult::from_exit(1, "", format!("wg-quick: `{}' is not a WireGuard interface", name)),
                    },
                    "strip" => match std::fs::read_to_string(path) {
                        Ok(text) => CommandResult::success(
                            text.lines()
                                .filter(|line| !line.trim_start().starts_with("Address"))
                                .map(|line| format!("{}\n", line))
                                .collect::<String>(),
                        ),
                        Err(_) => CommandResult::from_exit(1, "", format!("wg-quick: `{}' does not exist", path)),
                    },
                    "save" => {
                        if links.contains_key(&name) {
                            CommandResult::success("")
                        } else {
                            CommandResult::from_exit(1, "", format!("wg-quick: `{}' is not a WireGuard interface", name))
                        }
                    }
                    _ => unknown(command),
                }
            }
            _ => unknown(command),
        }
    }
}

impl CommandExecutor for FakeHost {
    async fn run(&self, command: &HostCommand) -> CommandResult {
        let target = self.enter(command);
        tokio::time::sleep(self.delay).await;
        let result = self.apply(command);
        self.leave(target);
        result
    }
}

fn missing_device(name: &str) -> CommandResult {
    CommandResult::from_exit(1, "", format!("Device \"{}\" does not exist.", name))
}

fn no_such_device() -> CommandResult {
    CommandResult::from_exit(1, "", "Unable to modify interface: No such device")
}

fn unknown(command: &HostCommand) -> CommandResult {
    CommandResult::from_exit(127, "", format!("unexpected command: {}", command.command_line()))
}

fn stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Interface name a command operates on, if any
fn target_of(command: &HostCommand) -> Option<String> {
    let args: Vec<&str> = command.args.iter().map(String::as_str).collect();
    match (command.program.as_str(), args.as_slice()) {
        ("wg", ["show", "interfaces"]) => None,
        ("wg", [_, name, ..]) => Some(name.to_string()),
        ("wg-quick", [_, path]) => Some(stem(path)),
        ("ip", ["link", "add", "dev", name, ..]) => Some(name.to_string()),
        ("ip", ["addr", "add", _, "dev", name]) => Some(name.to_string()),
        ("ip", [_, _, name, ..]) => Some(name.to_string()),
        _ => None,
    }
}

fn parse_peers(text: &str) -> BTreeMap<String, String> {
    let mut peers = BTreeMap::new();
    let mut in_peer = false;
    let mut key: Option<String> = None;
    let mut allowed = String::new();

    let mut flush = |key: &mut Option<String>, allowed: &mut String| {
        if let Some(k) = key.take() {
            peers.insert(k, std::mem::take(allowed));
        }
    };

    for line in text.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            flush(&mut key, &mut allowed);
            in_peer = line == "[Peer]";
            continue;
        }
        if !in_peer {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            match k.trim() {
                "PublicKey" => key = Some(v.trim().to_string()),
                "AllowedIPs" => allowed = v.trim().to_string(),
                _ => {}
            }
        }
    }
    flush(&mut key, &mut allowed);
    peers
}

fn addresses(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.split_once('='))
        .filter(|(k, _)| k.trim() == "Address")
        .flat_map(|(_, v)| v.split(',').map(|a| a.trim().to_string()).collect::<Vec<_>>())
        .collect()
}
