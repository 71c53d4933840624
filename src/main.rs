//! StemRoute CLI - run one separation task and print the response as JSON

use std::collections::BTreeMap;
use std::process;
use anyhow::Context;
use clap::Parser;
use rand::Rng;
use stemroute::{init_logging, Args, Config, Mode, Pipeline, TaskRequest, TaskResponse};

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Returns whether the task succeeded
fn run(args: Args) -> anyhow::Result<bool> {
    if args.list_modes {
        for mode in Mode::ALL {
            println!("{}", mode);
        }
        return Ok(true);
    }

    if let Some(path) = &args.write_default_config {
        Config::create_default_config(path)
            .with_context(|| format!("writing default config to {}", path.display()))?;
        println!("Wrote default config to {}", path.display());
        return Ok(true);
    }

    let request = build_request(&args)?;

    let setup = Config::from_args_and_config(&args).and_then(|config| {
        if config.verbose() {
            log::debug!("{}", stemroute::get_library_info());
        }
        Pipeline::from_config(config)
    });

    let response = match setup {
        Ok(mut pipeline) => pipeline.handle(&request),
        Err(e) => {
            log::error!("Failed to set up pipeline: {}", e);
            TaskResponse {
                task_id: request.task_id.clone(),
                success: false,
                mode: request.mode.clone(),
                result: None,
                conversion_duration: None,
                error: Some(e.to_string()),
            }
        }
    };

    println!("{}", serde_json::to_string_pretty(&response).context("encoding response")?);
    Ok(response.success)
}

fn build_request(args: &Args) -> anyhow::Result<TaskRequest> {
    let mode = args
        .mode
        .clone()
        .context("--mode is required (see --list-modes)")?;
    let task_id = args.task_id.clone().unwrap_or_else(random_task_id);

    Ok(TaskRequest {
        task_id,
        mode,
        input: args.input.clone(),
        prompt: args.prompt.clone(),
        duration: args.duration,
        model_overrides: args.models.iter().cloned().collect::<BTreeMap<_, _>>(),
    })
}

fn random_task_id() -> String {
    let mut rng = rand::thread_rng();
    (0..12).map(|_| format!("{:x}", rng.gen_range(0..16u8))).collect()
}
