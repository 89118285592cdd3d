use anyhow::Context;
use clap::Parser;
use container_deploy::adapters::{HttpChannel, RecordingChannel};
use container_deploy::core::{
    run_locally, ContainerClient, ControlChannel, DependencyGraph, DependencyResolver, Deployer,
    DeploySummary, ModuleDescriptor, SystemLibraries,
};
use container_deploy::domain::model::DeploymentTarget;
use container_deploy::utils::{logger, validation::Validate};
use container_deploy::{Cli, Command, DeployConfig, DeployError};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI: {:?}", cli);

    let exit_code = match execute(&cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("❌ {:#}", e);
            if let Some(cause) = e.downcast_ref::<DeployError>() {
                tracing::error!("💡 Suggestion: {}", cause.recovery_suggestion());
            }
            eprintln!("❌ {:#}", e);
            1
        }
    };
    std::process::exit(exit_code);
}

async fn execute(cli: &Cli) -> anyhow::Result<i32> {
    let config = DeployConfig::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    config.validate()?;

    let descriptors = config.descriptors(cli.command.class_filter())?;
    let graph = config
        .load_graph()
        .context("reading the exported dependency tree")?;
    let system = config.system_policy();
    let resolver =
        DependencyResolver::new(&graph, &system).with_local_repository(config.local_repository());

    match &cli.command {
        Command::Deploy {
            container, dry_run, ..
        } => {
            let target = config.target(container.as_deref())?;
            tracing::info!("deploying {} module(s) to {}", descriptors.len(), target);

            let summary = if *dry_run {
                let channel = RecordingChannel::new();
                let client = ContainerClient::new(channel.clone(), target);
                let summary = deploy(client, resolver, &descriptors).await;
                for call in channel.calls() {
                    println!("{} {}", call.method, serde_json::Value::from(call.args));
                }
                summary
            } else {
                let channel = HttpChannel::new(&target, config.timeout())?;
                deploy(ContainerClient::new(channel, target), resolver, &descriptors).await
            };

            report(&summary);
            Ok(if summary.is_success() { 0 } else { 1 })
        }
        Command::Run { port, dir, .. } => {
            let options = config.run_options(*port, dir.clone());
            let timeout = config.timeout();
            let connect = move |target: DeploymentTarget| -> container_deploy::Result<_> {
                let channel = HttpChannel::new(&target, timeout)?;
                Ok(ContainerClient::new(channel, target))
            };

            run_locally(&resolver, &descriptors, &options, connect).await?;
            Ok(0)
        }
    }
}

async fn deploy<C, G, S>(
    client: ContainerClient<C>,
    resolver: DependencyResolver<'_, G, S>,
    descriptors: &[ModuleDescriptor],
) -> DeploySummary
where
    C: ControlChannel,
    G: DependencyGraph + ?Sized,
    S: SystemLibraries + ?Sized,
{
    Deployer::new(client, resolver).deploy_all(descriptors).await
}

fn report(summary: &DeploySummary) {
    for (key, outcome) in &summary.deployed {
        println!("✅ {}: {:?}", key, outcome);
    }
    for (key, error) in &summary.failed {
        eprintln!("❌ {}: {}", key, error);
        eprintln!("💡 {}", error.recovery_suggestion());
    }
}
