mod scenarios;

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::Ordering;

use searchsim::campaign::CampaignConfig;
use searchsim::charts::generate_campaign_charts;
use searchsim::logger::{sanitize_filename, ConsoleReceiver, FileReceiver, LogEvent, Logger};
use searchsim::settings::SimulationSettings;
use searchsim::simulation::{simulate_with, Simulation, VERBOSE_ROUNDS};
use searchsim::{log, logln};

use scenarios::{get_scenario_catalog, ScenarioEntry};

fn find_scenario(name: &str) -> Option<ScenarioEntry> {
    get_scenario_catalog().into_iter().find(|s| s.short_name == name)
}

fn print_available_scenarios() {
    eprintln!("Available scenarios:");
    for s in get_scenario_catalog() {
        eprintln!("  - {}", s.short_name);
    }
}

/// Simulate the scenario's campaign and draw its charts under charts/<scenario>/
fn run_charts(scenario: &ScenarioEntry) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let config = (scenario.campaign)();
    let daily_budget = config.daily_budget;
    let result = Simulation::new(config, SimulationSettings::default())?.run(&mut Logger::new());
    generate_campaign_charts(&result, daily_budget, &PathBuf::from("charts").join(sanitize_filename(scenario.short_name)))
}

/// Load a campaign from JSON, simulate it and print the result as JSON
fn run_config_file(path: &str) -> Result<(), Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    let config: CampaignConfig = serde_json::from_str(&text)?;

    let mut logger = Logger::new();
    logger.add_receiver(FileReceiver::new(&PathBuf::from("log/run.log"), vec![LogEvent::Simulation, LogEvent::Day])?);
    let result = simulate_with(&config, &SimulationSettings::default(), &mut logger)?;
    let _ = logger.flush();

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn run_scenarios(scenario_arg: &str, scenarios: &[ScenarioEntry], fastbreak: bool) -> Result<usize, Box<dyn Error>> {
    let mut logger = Logger::new();
    if scenario_arg == "all" {
        logger.add_receiver(ConsoleReceiver::new(vec![LogEvent::Validation]));
    } else {
        logger.add_receiver(ConsoleReceiver::new(vec![LogEvent::Validation, LogEvent::Scenario]));
    }
    let summary_receiver_id = logger.add_receiver(FileReceiver::new(&PathBuf::from("log/summary.log"), vec![LogEvent::Validation])?);

    if scenario_arg == "all" {
        logln!(&mut logger, LogEvent::Validation, "Running all scenarios...\n");
    } else {
        logln!(&mut logger, LogEvent::Validation, "Running scenario '{}'...\n", scenario_arg);
    }

    let mut failures = 0;
    for scenario in scenarios {
        log!(&mut logger, LogEvent::Validation, "{}: ", scenario.short_name);

        let scenario_receiver_id = logger.add_receiver(FileReceiver::new(
            &PathBuf::from(format!("log/{}/scenario.log", sanitize_filename(scenario.short_name))),
            vec![LogEvent::Scenario],
        )?);

        let outcome = (scenario.run)(scenario.short_name, &mut logger);
        logger.remove_receiver(scenario_receiver_id);

        match outcome {
            Ok(()) => {
                logln!(&mut logger, LogEvent::Validation, "✓ PASSED");
            }
            Err(e) => {
                failures += 1;
                logln!(&mut logger, LogEvent::Validation, "✗ FAILED: {}", e);
                if fastbreak {
                    logln!(&mut logger, LogEvent::Validation, "\nStopping scenario execution due to failure (--fastbreak enabled)");
                    break;
                }
            }
        }
        let _ = logger.flush();
    }

    logln!(&mut logger, LogEvent::Validation, "\nScenarios failed: {}", failures);
    logger.remove_receiver(summary_receiver_id);
    Ok(failures)
}

fn main() {
    let raw_args: Vec<String> = std::env::args().collect();

    // Pull out --verbose <what> and --fastbreak, keep the rest positional
    let mut args = Vec::new();
    let mut skip_next = false;
    let mut fastbreak = false;
    for (i, arg) in raw_args.iter().enumerate() {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "--verbose" {
            if i + 1 < raw_args.len() && raw_args[i + 1] == "rounds" {
                VERBOSE_ROUNDS.store(true, Ordering::Relaxed);
                skip_next = true;
            }
            continue;
        }
        if arg == "--fastbreak" {
            fastbreak = true;
            continue;
        }
        args.push(arg.clone());
    }

    if args.len() > 1 && args[1] == "charts" {
        let Some(name) = args.get(2) else {
            eprintln!("Usage: {} charts <scenario>", args[0]);
            print_available_scenarios();
            std::process::exit(1);
        };
        let Some(scenario) = find_scenario(name) else {
            eprintln!("Error: Scenario '{}' not found.", name);
            print_available_scenarios();
            std::process::exit(1);
        };
        match run_charts(&scenario) {
            Ok(paths) => {
                for path in paths {
                    println!("Generated: {}", path.display());
                }
            }
            Err(e) => {
                eprintln!("Error generating charts: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    if args.len() > 1 && args[1] == "run" {
        let Some(path) = args.get(2) else {
            eprintln!("Usage: {} run <campaign.json>", args[0]);
            std::process::exit(1);
        };
        if let Err(e) = run_config_file(path) {
            eprintln!("Error running campaign: {}", e);
            std::process::exit(1);
        }
        return;
    }

    if args.len() > 1 {
        let scenario_arg = &args[1];
        let scenarios = if scenario_arg == "all" {
            get_scenario_catalog()
        } else {
            match find_scenario(scenario_arg) {
                Some(scenario) => vec![scenario],
                None => {
                    eprintln!("Error: Scenario '{}' not found.", scenario_arg);
                    print_available_scenarios();
                    std::process::exit(1);
                }
            }
        };
        match run_scenarios(scenario_arg, &scenarios, fastbreak) {
            Ok(0) => {}
            Ok(_) => std::process::exit(1),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        // No arguments: run the baseline scenario with its simulation output on the console
        let mut logger = Logger::new();
        logger.add_receiver(ConsoleReceiver::new(vec![LogEvent::Simulation, LogEvent::Scenario]));
        if let Err(e) = scenarios::manual_cpc_baseline::run("manual_cpc_baseline", &mut logger) {
            eprintln!("Error running scenario: {}", e);
            std::process::exit(1);
        }
    }
}
