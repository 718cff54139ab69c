mod cli;
mod config;

use crate::cli::{Cli, Command};
use anyhow::Result;
use deskx_engine::{ChannelSink, LogSink, RuleFile, engine, preset};
use deskx_misc::props::SystemProperties;
use tokio::runtime::Builder;

const AUDIT_CAPACITY: usize = 1024;

#[cfg(target_os = "android")]
fn init_logger() {
    use log::LevelFilter;

    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(if cfg!(debug_assertions) {
                LevelFilter::Trace
            } else {
                LevelFilter::Info
            })
            .with_tag("deskx"),
    );
}

#[cfg(not(target_os = "android"))]
fn init_logger() {
    env_logger::init();
}

fn main() -> Result<()> {
    init_logger();

    let args = Cli::parse_args();

    Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(args))?;

    Ok(())
}

async fn async_main(args: Cli) -> Result<()> {
    let rule_file = args.rules.as_deref().map(RuleFile::load).transpose()?;

    let mut builder = preset::builder(&SystemProperties)?;
    builder.config(config::engine_config(&args, rule_file.as_ref()));

    if let Some(file) = &rule_file {
        builder.load_overrides(file.rules()?)?;
    }

    let mut trail = None;
    if args.audit {
        let (sink, rx) = ChannelSink::new(AUDIT_CAPACITY);
        builder.audit_sink(sink);
        trail = Some(rx);
    } else {
        builder.audit_sink(LogSink);
    }

    let deskx = engine::install(builder.build())?;

    match args.command {
        Command::Resolve { capability, query } => {
            let resolution = deskx.resolve(&capability, &query.context())?;
            println!(
                "{capability} = {} ({})",
                resolution.value, resolution.decided_by
            );
        }
        Command::Dump { query } => {
            for (name, result) in deskx.resolve_all(&query.context()) {
                match result {
                    Ok(resolution) => {
                        println!("{name} = {} ({})", resolution.value, resolution.decided_by)
                    }
                    Err(err) => println!("{name} = <{err}>"),
                }
            }
        }
        Command::Rules => {
            for rule in deskx.overrides().rules() {
                println!("{rule}");
            }
        }
    }

    if let Some(mut rx) = trail {
        while let Ok(record) = rx.try_recv() {
            println!(
                "[{}] {} -> {} ({}) in {}",
                record.timestamp.to_rfc3339(),
                record.capability,
                record.value,
                record.decided_by,
                record.context
            );
        }
    }

    Ok(())
}
