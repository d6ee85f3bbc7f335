use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use brandvakt_api::{ManagementService, StatusResponse};
use brandvakt_capture::SimulatedSource;
use brandvakt_config::{BrandvaktConfig, RuleConfig};
use brandvakt_detection::RuleStore;
use brandvakt_engine::Firewall;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use crate::error::CliError;

#[derive(Parser, Debug)]
#[command(name = "brandvakt", version, about = "Packet firewall with threat intel and anomaly detection")]
pub struct Cli {
    /// Configuration YAML file; defaults to config/brandvakt.yaml plus environment
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run seeded synthetic traffic through the full runtime and print a status summary
    Simulate(SimulateArgs),
    /// Load and validate the configuration, then exit
    CheckConfig,
    /// Print the configured rules in evaluation order
    Rules,
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    #[arg(long, default_value_t = 1000)]
    pub packets: usize,

    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Share of packets sent from the hostile pool, in [0, 1]
    #[arg(long, default_value_t = 0.05)]
    pub hostile_ratio: f64,

    /// Known-malicious address; repeatable. IPv4 entries also form the hostile pool.
    #[arg(long = "threat")]
    pub threats: Vec<IpAddr>,
}

impl SimulateArgs {
    pub fn validate(&self) -> Result<(), CliError> {
        if !(0.0..=1.0).contains(&self.hostile_ratio) {
            return Err(CliError::HostileRatio(self.hostile_ratio));
        }
        Ok(())
    }

    fn hostile_pool(&self) -> Vec<Ipv4Addr> {
        self.threats
            .iter()
            .filter_map(|ip| match ip {
                IpAddr::V4(v4) => Some(*v4),
                IpAddr::V6(_) => None,
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    packets: u64,
    workers: usize,
    accepted: u64,
    dropped: u64,
    status: StatusResponse,
}

pub fn load_config(path: Option<&PathBuf>) -> Result<BrandvaktConfig> {
    let config = match path {
        Some(path) => BrandvaktConfig::load_from_path(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => BrandvaktConfig::load().context("loading default configuration")?,
    };
    Ok(config)
}

pub async fn run_simulation(config: &BrandvaktConfig, args: SimulateArgs) -> Result<()> {
    args.validate()?;

    let firewall = Firewall::from_config(config)?;
    for ip in &args.threats {
        firewall.threat_intel().add_ip(ip.to_string());
    }

    let source = SimulatedSource::new(args.packets, args.seed, args.hostile_ratio)
        .with_hostile_pool(args.hostile_pool());
    let tally = source.tally();

    info!(packets = args.packets, seed = args.seed, "Starting simulation");
    let summary = firewall.run(source).await?;

    let report = SimulationReport {
        packets: summary.packets,
        workers: summary.workers,
        accepted: tally.accepted(),
        dropped: tally.dropped(),
        status: ManagementService::new(firewall).status(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub fn check_config(config: &BrandvaktConfig) {
    println!(
        "Configuration OK: {} rules, {} enabled feeds, detector window {}",
        config.rules.len(),
        config.intel.feeds.iter().filter(|f| f.enabled).count(),
        config.detector.window_size
    );
}

/// Rules as YAML, sorted the way the rule store evaluates them.
pub fn render_rules(config: &BrandvaktConfig) -> Result<String> {
    let store = RuleStore::with_rules(config.rules.iter().cloned().map(Into::into));
    let ordered: Vec<RuleConfig> = store.rules_list().into_iter().map(Into::into).collect();
    Ok(serde_yaml::to_string(&ordered)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use brandvakt_core::{Action, Rule};
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_simulate_with_threats() {
        let cli = Cli::try_parse_from([
            "brandvakt",
            "simulate",
            "--packets",
            "50",
            "--threat",
            "203.0.113.7",
            "--threat",
            "2001:db8::1",
            "--config",
            "fw.yaml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("fw.yaml")));
        let Commands::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.packets, 50);
        assert_eq!(args.threats.len(), 2);
        assert_eq!(args.hostile_pool(), vec![Ipv4Addr::new(203, 0, 113, 7)]);
    }

    #[test]
    fn malformed_threat_is_rejected_by_parser() {
        assert!(Cli::try_parse_from(["brandvakt", "simulate", "--threat", "not-an-ip"]).is_err());
    }

    #[test]
    fn hostile_ratio_out_of_range() {
        let cli = Cli::try_parse_from(["brandvakt", "simulate", "--hostile-ratio", "1.5"]).unwrap();
        let Commands::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert!(matches!(args.validate(), Err(CliError::HostileRatio(_))));
    }

    #[test]
    fn rules_render_in_priority_order() {
        let config = BrandvaktConfig {
            rules: vec![
                Rule::new("log-dns", 5, Action::Log).with_port(53).into(),
                Rule::new("block-ssh", 1, Action::Drop).with_port(22).into(),
            ],
            ..BrandvaktConfig::default()
        };

        let yaml = render_rules(&config).unwrap();
        let ssh = yaml.find("block-ssh").unwrap();
        let dns = yaml.find("log-dns").unwrap();
        assert!(ssh < dns);
        assert!(yaml.contains("action: DROP"));
    }
}
