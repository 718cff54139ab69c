use clap::{Args, Parser, Subcommand};
use deskx_engine::{Context, DisplayClass, DisplayDescriptor};
use std::path::PathBuf;

#[derive(Parser)]
#[command(about = "deskx - desktop-mode capability override engine", version)]
pub struct Cli {
    #[clap(
        long,
        global = true,
        help = "TOML file with extra [[override]] rules and an optional [engine] table"
    )]
    pub rules: Option<PathBuf>,

    #[clap(
        long,
        global = true,
        help = "Report derivation errors instead of falling back to defaults"
    )]
    pub cfg_fail_closed: bool,

    #[clap(
        long,
        global = true,
        help = "Ignore wildcard rules, only rules naming the caller apply"
    )]
    pub cfg_exact_scope: bool,

    #[clap(long, global = true, help = "Print the decision trail when done")]
    pub audit: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Clone, Debug)]
pub struct Query {
    #[clap(
        long,
        default_value = "android",
        help = "Caller package or process name"
    )]
    pub caller: String,

    #[clap(long, help = "Platform display type (1 = internal, 2 = external)")]
    pub display_type: Option<i32>,

    #[clap(
        long,
        default_value_t = 0,
        help = "Display id reported with --display-type"
    )]
    pub display_id: i32,
}

impl Query {
    pub fn context(&self) -> Context {
        let ctx = Context::new(&self.caller);

        match self.display_type {
            Some(display_type) => ctx.with_display(DisplayDescriptor::new(
                self.display_id,
                DisplayClass::from_display_type(display_type),
            )),
            None => ctx,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    #[command(about = "Resolve a single capability")]
    Resolve {
        capability: String,
        #[command(flatten)]
        query: Query,
    },

    #[command(about = "Resolve every registered capability")]
    Dump {
        #[command(flatten)]
        query: Query,
    },

    #[command(about = "List the loaded override rules")]
    Rules,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
