use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

use hydrogen::confs::{self, DeploymentConfs};
use hydrogen::deployment::distributed::{self, DistributedConfs};
use hydrogen::deployment::{iskm, multiple_gateway, single};
use hydrogen::maps::{ProductVersion, SchemaMap};

fn usage() -> &'static str {
    "Usage:\n  hydrogen deploy multiple-gateway <working-dir> --count <n> --config <conf.json> [--version 2.6|3.1]\n  hydrogen deploy iskm <iskm-dir> <apim-dir> --config <conf.json> [--version 2.6|3.1]\n  hydrogen deploy distributed <working-dir> --config <conf.json> [--version 2.6|3.1]\n  hydrogen datasource replace <working-dir> --config <conf.json> [--version 2.6|3.1]\n  hydrogen datasource setup <working-dir> --config <conf.json> [--version 2.6|3.1]"
}

struct Flags {
    config: Option<String>,
    count: Option<u16>,
    version: ProductVersion,
}

fn parse_flags(args: &[String]) -> Result<Flags> {
    let mut flags = Flags {
        config: None,
        count: None,
        version: ProductVersion::V26,
    };
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "--config" => {
                flags.config = Some(
                    iter.next()
                        .context("--config requires a file path")?
                        .clone(),
                );
            }
            "--count" => {
                let raw = iter.next().context("--count requires a number")?;
                flags.count = Some(
                    raw.parse()
                        .with_context(|| format!("invalid gateway count '{}'", raw))?,
                );
            }
            "--version" => {
                let raw = iter.next().context("--version requires a value")?;
                flags.version = ProductVersion::from_str(raw)?;
            }
            other => bail!("unknown flag '{}'\n\n{}", other, usage()),
        }
    }
    Ok(flags)
}

fn load_config(flags: &Flags) -> Result<DeploymentConfs> {
    match &flags.config {
        Some(path) => confs::load_deployment_confs(Path::new(path)),
        None => Ok(DeploymentConfs::default()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [deploy, layout, iskm_dir, apim_dir, rest @ ..]
            if deploy == "deploy" && layout == "iskm" =>
        {
            let flags = parse_flags(rest)?;
            let maps = SchemaMap::for_version(flags.version);
            let config = load_config(&flags)?;
            let datasources = config
                .datasources
                .context("iskm layout needs a datasources section")?;
            iskm::configure_identity_server_km(
                &maps,
                Path::new(iskm_dir),
                &datasources,
                &config.layout,
            )?;
            iskm::configure_api_manager_with_iskm(
                &maps,
                Path::new(apim_dir),
                &datasources,
                &config.layout,
            )
        }
        [deploy, layout, working_dir, rest @ ..] if deploy == "deploy" => {
            let flags = parse_flags(rest)?;
            let maps = SchemaMap::for_version(flags.version);
            let config = load_config(&flags)?;
            match layout.as_str() {
                "multiple-gateway" => {
                    let count = flags.count.context("--count is required for multiple-gateway")?;
                    multiple_gateway::configure_publish_multiple_gateway(
                        &maps,
                        Path::new(working_dir),
                        count,
                        &config.environments,
                        &config.layout,
                    )
                }
                "distributed" => {
                    let datasources = config
                        .datasources
                        .context("distributed layout needs a datasources section")?;
                    distributed::configure_distributed(
                        &maps,
                        Path::new(working_dir),
                        &datasources,
                        &DistributedConfs::default(),
                    )
                }
                other => bail!("unknown layout '{}'\n\n{}", other, usage()),
            }
        }
        [datasource, action, working_dir, rest @ ..] if datasource == "datasource" => {
            let flags = parse_flags(rest)?;
            let maps = SchemaMap::for_version(flags.version);
            let config = load_config(&flags)?;
            let datasources = config
                .datasources
                .context("datasource commands need a datasources section")?;
            match action.as_str() {
                "replace" => single::configure_carbon_server(
                    &maps,
                    &datasources.am,
                    Path::new(working_dir),
                ),
                "setup" => single::configure_api_manager_server(
                    &maps,
                    &datasources,
                    Path::new(working_dir),
                ),
                other => bail!("unknown datasource action '{}'\n\n{}", other, usage()),
            }
        }
        _ => bail!(usage()),
    }
}
