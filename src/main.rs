use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::debug;
use serde_json::json;
use squadron_schedule::database::RealtimeDatabase;
use squadron_schedule::firebase::{
    DATABASE_URL_VAR, FirebaseClient, FirebaseConfig, PROJECT_ID_VAR, SERVICE_ACCOUNT_KEY_VAR,
};
use squadron_schedule::hours::{HoursArgs, download_chart_data};
use squadron_schedule::messaging::CloudMessaging;
use squadron_schedule::notify::{ScheduleNotifier, schedule_message};
use squadron_schedule::set_up_logger;

#[derive(Debug)]
enum Action {
    Hours {
        squadron: String,
        days: u32,
        name: String,
    },
    Notify {
        squadron: String,
        date: String,
        dry_run: bool,
    },
}

struct Args {
    verbose: bool,
    project_id: Option<String>,
    database_url: Option<String>,
    service_account_key: Option<String>,
    action: Action,
}

fn squadron_arg() -> Arg {
    Arg::new("squadron")
        .short('s')
        .long("squadron")
        .required(true)
        .help("Squadron id, as it appears in the database.")
}

fn string_arg(matches: &ArgMatches, id: &str) -> Option<String> {
    matches.get_one::<String>(id).cloned()
}

fn parse_args() -> Result<Args> {
    let matches = Command::new("squadron-schedule")
        .version("0.1")
        .author("Jacob Luszcz")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Verbose mode. Outputs DEBUG and higher log messages."),
        )
        .arg(
            Arg::new("project")
                .long("project")
                .env(PROJECT_ID_VAR)
                .global(true)
                .help("Firebase project id."),
        )
        .arg(
            Arg::new("database-url")
                .long("database-url")
                .env(DATABASE_URL_VAR)
                .global(true)
                .help("Realtime Database URL. Defaults to the project's default database."),
        )
        .arg(
            Arg::new("service-account-key")
                .long("service-account-key")
                .env(SERVICE_ACCOUNT_KEY_VAR)
                .hide_env_values(true)
                .global(true)
                .help("Service account key JSON."),
        )
        .subcommand(
            Command::new("hours")
                .about("Sum a person's flight hours over a squadron's most recent dates.")
                .arg(squadron_arg())
                .arg(
                    Arg::new("days")
                        .short('d')
                        .long("days")
                        .required(true)
                        .value_parser(clap::value_parser!(u32))
                        .help("Number of most recent dates to include."),
                )
                .arg(
                    Arg::new("name")
                        .short('n')
                        .long("name")
                        .required(true)
                        .help("Student or instructor name to match."),
                ),
        )
        .subcommand(
            Command::new("notify")
                .about("Send the new schedule notification for a date.")
                .arg(squadron_arg())
                .arg(
                    Arg::new("date")
                        .long("date")
                        .required(true)
                        .help("Schedule date, as YYYY-MM-DD."),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Print the notification rather than sending it."),
                ),
        )
        .get_matches();

    let action = match matches.subcommand() {
        Some(("hours", sub)) => Action::Hours {
            squadron: string_arg(sub, "squadron").context("squadron is required")?,
            days: sub.get_one::<u32>("days").copied().context("days is required")?,
            name: string_arg(sub, "name").context("name is required")?,
        },
        Some(("notify", sub)) => Action::Notify {
            squadron: string_arg(sub, "squadron").context("squadron is required")?,
            date: string_arg(sub, "date").context("date is required")?,
            dry_run: sub.get_flag("dry-run"),
        },
        _ => anyhow::bail!("Unknown subcommand"),
    };

    Ok(Args {
        verbose: matches.get_flag("verbose"),
        project_id: string_arg(&matches, "project"),
        database_url: string_arg(&matches, "database-url"),
        service_account_key: string_arg(&matches, "service-account-key"),
        action,
    })
}

impl Args {
    fn firebase_config(&self) -> Result<FirebaseConfig> {
        Ok(FirebaseConfig::new(
            self.service_account_key.clone().with_context(|| {
                format!("--service-account-key or {SERVICE_ACCOUNT_KEY_VAR} required")
            })?,
            self.project_id
                .clone()
                .with_context(|| format!("--project or {PROJECT_ID_VAR} required"))?,
            self.database_url.clone(),
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args()?;
    set_up_logger(module_path!(), args.verbose)?;
    debug!("{:?}", args.action);

    match &args.action {
        Action::Notify {
            squadron,
            date,
            dry_run: true,
        } => {
            let message = schedule_message(squadron, date);
            println!("{}", serde_json::to_string_pretty(&message)?);
        }
        Action::Notify { squadron, date, .. } => {
            let config = args.firebase_config()?;
            let messaging = CloudMessaging::new(FirebaseClient::new(&config)?, &config);
            ScheduleNotifier::new(Arc::new(messaging))
                .notify(squadron, date)
                .await;
        }
        Action::Hours {
            squadron,
            days,
            name,
        } => {
            let config = args.firebase_config()?;
            let database = RealtimeDatabase::new(FirebaseClient::new(&config)?, &config);
            let hours = download_chart_data(
                &database,
                HoursArgs {
                    squadron: Some(json!(squadron)),
                    days: Some(json!(days)),
                    name: Some(json!(name)),
                },
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&hours)?);
        }
    }

    Ok(())
}
