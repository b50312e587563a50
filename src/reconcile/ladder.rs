//! Convergence strategies and the driver that walks them
//!
//! A ladder is an ordered list of [`Strategy`] values. Each strategy expands
//! into steps; a step is one host command with a requirement level. The
//! driver runs strategies in order until one completes all of its mandatory
//! steps, and reports the last failure when none does.

use crate::executor::{CommandExecutor, HostCommand};
use crate::wireguard::{ConfigStore, InterfaceConfig, InterfaceName};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// A single named stage of a strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// `wg-quick up`
    QuickApply,
    /// `ip link add ... type wireguard`
    LinkCreate,
    /// `wg setconf` with wg-quick extensions stripped
    ConfigPush,
    /// `ip addr add` for one configured address
    AddressAssign,
    /// `ip link set ... up`
    LinkUp,
    /// Post-create existence check
    Verify,
    /// `wg syncconf` with the peers-only file
    LiveSync,
    /// `wg-quick strip`
    Strip,
    /// `wg syncconf` fed from the strip output
    StripSync,
    /// `wg-quick down` before a full recycle
    InterfaceDown,
}

impl Stage {
    /// Stable kebab-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::QuickApply => "quick-apply",
            Stage::LinkCreate => "link-create",
            Stage::ConfigPush => "config-push",
            Stage::AddressAssign => "address-assign",
            Stage::LinkUp => "link-up",
            Stage::Verify => "verify",
            Stage::LiveSync => "live-sync",
            Stage::Strip => "strip",
            Stage::StripSync => "strip-sync",
            Stage::InterfaceDown => "interface-down",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named convergence strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Bring the interface up from its config file in one command
    QuickApply,
    /// Create, configure, address and raise the link step by step
    ManualCreate,
    /// Sync the peer table from the peers-only file
    LiveSync,
    /// Sync the peer table from `wg-quick strip` output
    StripAndSync,
    /// Take the interface down and quick-apply it again
    FullRecycle,
}

impl Strategy {
    /// Strategies tried, in order, for an interface that does not exist
    pub const CREATE_LADDER: &'static [Strategy] = &[Strategy::QuickApply, Strategy::ManualCreate];

    /// Strategies tried, in order, for an interface that already exists
    pub const RELOAD_LADDER: &'static [Strategy] = &[
        Strategy::LiveSync,
        Strategy::StripAndSync,
        Strategy::FullRecycle,
    ];

    /// Stable kebab-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::QuickApply => "quick-apply",
            Strategy::ManualCreate => "manual-create",
            Strategy::LiveSync => "live-sync",
            Strategy::StripAndSync => "strip-and-sync",
            Strategy::FullRecycle => "full-recycle",
        }
    }

    /// Expand into concrete steps for one interface.
    ///
    /// Steps whose precondition does not hold are left out; address
    /// assignment only appears when the config carries an `Address`.
    pub(crate) fn steps(&self, target: &LadderTarget<'_>) -> Vec<Step> {
        let name = target.name.as_str();
        let config_path = target.config_path.display().to_string();

        match self {
            Strategy::QuickApply => vec![quick_up(&config_path)],
            Strategy::ManualCreate => {
                let mut steps = vec![
                    Step::mandatory(
                        Stage::LinkCreate,
                        HostCommand::new("ip", ["link", "add", "dev", name, "type", "wireguard"]),
                    ),
                    Step::mandatory(
                        Stage::ConfigPush,
                        HostCommand::new("wg", ["setconf", name, "/dev/stdin"])
                            .with_stdin(ConfigStore::strip_quick_directives(target.config)),
                    ),
                ];

                let addresses = target.config.addresses();
                if addresses.is_empty() {
                    debug!("No Address directive for {}, skipping address assignment", name);
                }
                steps.extend(addresses.iter().map(|address| {
                    Step::advisory(
                        Stage::AddressAssign,
                        HostCommand::new("ip", ["addr", "add", address.as_str(), "dev", name]),
                    )
                }));

                steps.push(Step::mandatory(
                    Stage::LinkUp,
                    HostCommand::new("ip", ["link", "set", name, "up"]),
                ));
                steps
            }
            Strategy::LiveSync => vec![Step::mandatory(
                Stage::LiveSync,
                HostCommand::new(
                    "wg",
                    [
                        "syncconf".to_string(),
                        name.to_string(),
                        target.peers_path.display().to_string(),
                    ],
                ),
            )],
            Strategy::StripAndSync => vec![
                Step::mandatory(
                    Stage::Strip,
                    HostCommand::new("wg-quick", ["strip".to_string(), config_path]),
                ),
                Step::mandatory(
                    Stage::StripSync,
                    HostCommand::new("wg", ["syncconf", name, "/dev/stdin"]),
                )
                .piped(),
            ],
            Strategy::FullRecycle => vec![
                Step::advisory(
                    Stage::InterfaceDown,
                    HostCommand::new("wg-quick", ["down".to_string(), config_path.clone()]),
                ),
                quick_up(&config_path),
            ],
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn quick_up(config_path: &str) -> Step {
    Step::mandatory(
        Stage::QuickApply,
        HostCommand::new("wg-quick", ["up", config_path]),
    )
}

/// Whether a failed step aborts its strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Requirement {
    Mandatory,
    Advisory,
}

/// One host command within a strategy
#[derive(Debug, Clone)]
pub(crate) struct Step {
    pub(crate) stage: Stage,
    pub(crate) requirement: Requirement,
    pub(crate) command: HostCommand,
    /// Feed the previous step's stdout to this command
    pub(crate) pipe_previous: bool,
}

impl Step {
    fn mandatory(stage: Stage, command: HostCommand) -> Self {
        Self {
            stage,
            requirement: Requirement::Mandatory,
            command,
            pipe_previous: false,
        }
    }

    fn advisory(stage: Stage, command: HostCommand) -> Self {
        Self {
            stage,
            requirement: Requirement::Advisory,
            command,
            pipe_previous: false,
        }
    }

    fn piped(mut self) -> Self {
        self.pipe_previous = true;
        self
    }
}

/// Everything a strategy needs to know about the interface it converges
#[derive(Debug)]
pub(crate) struct LadderTarget<'a> {
    pub(crate) name: &'a InterfaceName,
    pub(crate) config: &'a InterfaceConfig,
    pub(crate) config_path: PathBuf,
    pub(crate) peers_path: PathBuf,
}

/// A mandatory step failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StageFailure {
    pub(crate) strategy: Strategy,
    pub(crate) stage: Stage,
    pub(crate) diagnostic: String,
}

/// A strategy completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LadderSuccess {
    pub(crate) strategy: Strategy,
    /// Advisory stages that failed along the way
    pub(crate) degraded: Vec<Stage>,
}

/// Walk `ladder` until a strategy completes.
///
/// Each step runs at most once. Failures of earlier strategies are logged
/// and discarded; only the last one is returned.
pub(crate) async fn run_ladder<E: CommandExecutor>(
    executor: &E,
    ladder: &[Strategy],
    target: &LadderTarget<'_>,
) -> Result<LadderSuccess, StageFailure> {
    let mut last_failure = None;

    for (idx, strategy) in ladder.iter().enumerate() {
        info!("Interface {}: attempting {}", target.name, strategy);

        match run_strategy(executor, *strategy, target).await {
            Ok(degraded) => {
                return Ok(LadderSuccess {
                    strategy: *strategy,
                    degraded,
                })
            }
            Err(failure) => {
                match ladder.get(idx + 1) {
                    Some(next) => warn!(
                        "{} failed at {} for {}, trying {}: {}",
                        strategy, failure.stage, target.name, next, failure.diagnostic
                    ),
                    None => warn!(
                        "{} failed at {} for {}, no strategies left: {}",
                        strategy, failure.stage, target.name, failure.diagnostic
                    ),
                }
                last_failure = Some(failure);
            }
        }
    }

    Err(last_failure.unwrap_or_else(|| StageFailure {
        strategy: Strategy::QuickApply,
        stage: Stage::QuickApply,
        diagnostic: "no strategy was attempted".to_string(),
    }))
}

async fn run_strategy<E: CommandExecutor>(
    executor: &E,
    strategy: Strategy,
    target: &LadderTarget<'_>,
) -> Result<Vec<Stage>, StageFailure> {
    let mut degraded = Vec::new();
    let mut previous_stdout = String::new();

    for step in strategy.steps(target) {
        let command = if step.pipe_previous {
            step.command.with_stdin(std::mem::take(&mut previous_stdout))
        } else {
            step.command
        };

        info!("Interface {}: {} ({})", target.name, step.stage, command);
        let result = executor.run(&command).await;

        if result.succeeded {
            previous_stdout = result.stdout;
            continue;
        }

        match step.requirement {
            Requirement::Mandatory => {
                return Err(StageFailure {
                    strategy,
                    stage: step.stage,
                    diagnostic: result.diagnostic(),
                })
            }
            Requirement::Advisory => {
                warn!(
                    "Degraded: {} failed for {}, continuing: {}",
                    step.stage,
                    target.name,
                    result.diagnostic()
                );
                degraded.push(step.stage);
                previous_stdout.clear();
            }
        }
    }

    Ok(degraded)
}
