//! lwm2m-gwsim - Gateway satellite object simulator
//!
//! Drives the object manager through a scenario: sensors are attached to
//! gateway devices, some run out of engine capacity, gateways are deleted
//! and the failed sensors are retried.
//!
//! # Usage
//!
//! ```bash
//! lwm2m-gwsim crates/lwm2m-gwsim/config/scenario.toml
//! lwm2m-gwsim --json --verbose scenario.toml
//! ```

use anyhow::Result;
use clap::Parser;
use lwm2m_util::Slot;
use tracing::info;

mod scenario;

use scenario::{Report, Scenario};

#[derive(Parser, Debug)]
#[command(name = "lwm2m-gwsim")]
#[command(about = "Simulate gateway-attached LwM2M object lifecycles")]
struct Args {
    /// Scenario file (TOML format)
    scenario: String,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "lwm2m_gwsim=debug,lwm2m_util=debug"
    } else {
        "lwm2m_gwsim=info,lwm2m_util=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    info!(scenario = %args.scenario, "Loading scenario");
    let scenario = Scenario::load(&args.scenario)?;
    info!(
        gateways = scenario.gateways.len(),
        max_nodes = scenario.util.max_nodes,
        max_instances = scenario.util.max_instances,
        "Running scenario"
    );

    let report = scenario::run(&scenario)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &Report) {
    println!("Acquire results:");
    for o in &report.outcomes {
        let result = match (&o.instance, &o.error) {
            (Some(instance), _) => format!("instance {}", instance),
            (None, Some(error)) => format!("error: {}", error),
            (None, None) => "-".to_string(),
        };
        println!(
            "  [{:<7}] gateway {:>3}  type {:>5}  offset {:>3}  {}",
            o.phase, o.index, o.obj_type, o.offset, result
        );
    }

    println!("Slots:");
    for (index, slots) in &report.slots {
        let states: Vec<String> = slots
            .iter()
            .map(|slot| match *slot {
                Slot::Free => "-".to_string(),
                Slot::Created { obj_type, instance } => format!("{}/{}", obj_type, instance),
                Slot::Failed { obj_type, instance } => format!("!{}/{}", obj_type, instance),
            })
            .collect();
        println!("  gateway {:>3}: [{}]", index, states.join(", "));
    }

    println!("Live object instances: {}", report.instances.len());
    for (obj_type, instance) in &report.instances {
        println!("  {}/{}", obj_type, instance);
    }
    println!("Lifecycle events: {}", report.events.len());
}
