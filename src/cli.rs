use std::path::PathBuf;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::{ArgAction, Parser, Subcommand};

use crate::config::{self, DEFAULT_PROFILE};
use crate::estimate;
use crate::logbook::DateRange;
use crate::model::task_path::TaskPath;
use crate::store::TaskStore;
use crate::sync::fetch::fetch;
use crate::sync::spend::{spend, SpendOptions};
use crate::sync::{Outcome, SyncContext};
use crate::util::time::{interpret_date, TimeError};

/// Sync dit tasks with GitLab issues and merge requests.
#[derive(Parser, Debug)]
#[command(name = "dit-gitlab", version)]
pub struct Cli {
    /// Config file (defaults to ~/.dit/gitlab.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Section of ~/.dit/.gitlab.conf holding the GitLab url and token.
    #[arg(long, global = true, default_value = DEFAULT_PROFILE)]
    pub profile: String,

    /// Root of the task tree (defaults to base_path from the config, then ~/.dit).
    #[arg(long, global = true)]
    pub base_path: Option<PathBuf>,

    /// More logging; repeat for debug output.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a task file from the issue (iN) or merge request (mN) it is named after.
    Fetch {
        /// <group>/<subgroup>/<task> or <group> <subgroup> <task>
        #[arg(required = true)]
        task: Vec<String>,
    },

    /// Post closed logbook intervals as /spend notes on the task's issue.
    Spend {
        /// Print the notes instead of posting them.
        #[arg(long)]
        dry_run: bool,

        /// Only entries starting on or after this day (today, yesterday, monday, 2024-01-31, 3days).
        #[arg(long, value_name = "DATE", value_parser = parse_date_arg)]
        from: Option<NaiveDate>,

        /// Only entries starting before this day.
        #[arg(long, value_name = "DATE", value_parser = parse_date_arg)]
        to: Option<NaiveDate>,

        /// Ignore the record of entries already posted.
        #[arg(long)]
        resync: bool,

        /// <group>/<subgroup>/<task> or <group> <subgroup> <task>
        #[arg(required = true)]
        task: Vec<String>,
    },
}

fn parse_date_arg(text: &str) -> Result<NaiveDate, TimeError> {
    interpret_date(text, Local::now().date_naive())
}

pub async fn run(cli: Cli) -> Result<Outcome> {
    let config_path = cli.config.unwrap_or_else(config::default_config_path);
    let config = config::load_config(&config_path)?;
    let gitlab = config.open_client(&cli.profile)?;
    let store = TaskStore::new(cli.base_path.unwrap_or_else(|| config.base_path()));
    let estimates = estimate::from_config(config.estimates.source);

    let ctx = SyncContext {
        config: &config,
        gitlab: &gitlab,
        store: &store,
        estimates: estimates.as_ref(),
    };
    let mut stdout = std::io::stdout();

    match cli.command {
        Command::Fetch { task } => {
            let task = TaskPath::from_args(&task)?;
            fetch(&ctx, &task, &mut stdout).await
        }
        Command::Spend {
            dry_run,
            from,
            to,
            resync,
            task,
        } => {
            let task = TaskPath::from_args(&task)?;
            let opts = SpendOptions {
                range: DateRange { from, to },
                dry_run,
                resync,
            };
            spend(&ctx, &task, &opts, &mut stdout).await
        }
    }
}
