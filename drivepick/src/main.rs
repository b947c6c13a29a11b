use std::sync::Arc;

use anyhow::Context;
use drivepick::storage::TokenStorage;
use drivepick::store::ROOT_FOLDER_ID;
use drivepick::{Controller, Notice, NoticeLevel, PickerConfig, Session, SkipReason, SyncOutcome};
use drivepick_core::{DriveClient, MemoryGateway};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
enum CliMode {
    List(Option<String>),
    Search(String),
    ShowSettings,
    Login(String),
    Logout,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliArgs {
    mode: CliMode,
    demo: bool,
}

fn parse_cli_args<I>(args: I) -> anyhow::Result<CliArgs>
where
    I: IntoIterator<Item = String>,
{
    let mut mode = CliMode::List(None);
    let mut demo = false;
    let mut args = args.into_iter().skip(1).peekable();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--demo" => demo = true,
            "--list" => mode = CliMode::List(args.next_if(|next| !next.starts_with("--"))),
            "--search" => {
                let query = args.next().context("--search needs a query")?;
                mode = CliMode::Search(query);
            }
            "--login" => {
                let token = args.next().context("--login needs a token")?;
                mode = CliMode::Login(token);
            }
            "--show-settings" => mode = CliMode::ShowSettings,
            "--logout" => mode = CliMode::Logout,
            "--help" | "-h" => mode = CliMode::Help,
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }
    Ok(CliArgs { mode, demo })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn,hyper=warn,hyper_util=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn connect(config: &PickerConfig) -> anyhow::Result<(Controller, UnboundedReceiver<Notice>)> {
    if config.demo {
        // The sample drive parents its root items under the plain root id.
        let config = PickerConfig {
            root_alias: ROOT_FOLDER_ID.to_string(),
            ..config.clone()
        };
        let gateway = Arc::new(MemoryGateway::demo());
        return Ok(Controller::new(
            gateway.clone(),
            gateway,
            Arc::new(Session::signed_in()),
            &config,
        ));
    }

    let token = config.token.clone().or_else(|| {
        TokenStorage::new()
            .and_then(|storage| storage.get_token())
            .map_err(|err| tracing::debug!("no saved token: {err}"))
            .ok()
    });
    let session = if token.is_some() {
        Session::signed_in()
    } else {
        Session::signed_out()
    };
    let client = DriveClient::with_base_url(&config.api_url, token.unwrap_or_default())
        .with_context(|| format!("invalid DRIVEPICK_API_URL {}", config.api_url))?;
    let client = Arc::new(client);
    Ok(Controller::new(
        client.clone(),
        client,
        Arc::new(session),
        config,
    ))
}

fn ensure_applied(
    outcome: SyncOutcome,
    notices: &mut UnboundedReceiver<Notice>,
) -> anyhow::Result<()> {
    while let Ok(notice) = notices.try_recv() {
        match notice.level {
            NoticeLevel::Error => tracing::error!("{}: {}", notice.title, notice.description),
            NoticeLevel::Info | NoticeLevel::Success => {
                tracing::info!("{}: {}", notice.title, notice.description)
            }
        }
    }
    match outcome {
        SyncOutcome::Applied => Ok(()),
        SyncOutcome::Skipped(SkipReason::NotAuthenticated) => {
            anyhow::bail!("not signed in: set DRIVEPICK_TOKEN or run --login TOKEN")
        }
        other => anyhow::bail!("request did not complete: {other:?}"),
    }
}

fn print_help() {
    println!("Usage: drivepick [--demo] [--list [FOLDER_ID] | --search QUERY | --show-settings]");
    println!("       drivepick [--login TOKEN | --logout]");
    println!("  --demo            Use the built-in sample drive instead of the remote service");
    println!("  --list [FOLDER]   Print the root listing, or FOLDER under the root, as JSON");
    println!("  --search QUERY    Search all files by name and print the results as JSON");
    println!("  --show-settings   Print the effective settings as JSON");
    println!("  --login TOKEN     Save an API token in the system keyring");
    println!("  --logout          Remove the saved API token and exit");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = parse_cli_args(std::env::args())?;
    let mut config = PickerConfig::from_env();
    config.demo |= cli.demo;

    match cli.mode {
        CliMode::Help => print_help(),
        CliMode::ShowSettings => println!("{}", serde_json::to_string_pretty(&config)?),
        CliMode::Login(token) => {
            TokenStorage::new()?.save_token(token.trim())?;
            tracing::info!("api token saved");
        }
        CliMode::Logout => {
            TokenStorage::new()?.delete_token()?;
            tracing::info!("saved token removed");
        }
        CliMode::List(folder_id) => {
            let (controller, mut notices) = connect(&config)?;
            ensure_applied(controller.load_current_folder().await, &mut notices)?;
            if let Some(folder_id) = folder_id.filter(|id| id != ROOT_FOLDER_ID) {
                let folder = controller
                    .view()
                    .folders
                    .into_iter()
                    .find(|folder| folder.id == folder_id)
                    .with_context(|| format!("no folder {folder_id} in {}", config.root_name))?;
                ensure_applied(controller.navigate_into(&folder).await, &mut notices)?;
            }
            println!("{}", serde_json::to_string_pretty(&controller.view())?);
        }
        CliMode::Search(query) => {
            let (controller, mut notices) = connect(&config)?;
            ensure_applied(controller.on_search_query_change(&query).await, &mut notices)?;
            println!("{}", serde_json::to_string_pretty(&controller.view())?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<CliArgs> {
        parse_cli_args(
            std::iter::once("drivepick")
                .chain(args.iter().copied())
                .map(str::to_string),
        )
    }

    #[test]
    fn parse_cli_args_defaults_to_root_listing() {
        let cli = parse(&[]).unwrap();
        assert_eq!(cli.mode, CliMode::List(None));
        assert!(!cli.demo);
    }

    #[test]
    fn parse_cli_args_reads_optional_folder() {
        assert_eq!(parse(&["--list", "docs"]).unwrap().mode, CliMode::List(Some("docs".into())));
        let cli = parse(&["--list", "--demo"]).unwrap();
        assert_eq!(cli.mode, CliMode::List(None));
        assert!(cli.demo);
    }

    #[test]
    fn parse_cli_args_requires_search_query() {
        assert_eq!(
            parse(&["--demo", "--search", "paper"]).unwrap().mode,
            CliMode::Search("paper".into())
        );
        assert!(parse(&["--search"]).is_err());
    }

    #[test]
    fn parse_cli_args_supports_token_commands() {
        assert_eq!(parse(&["--logout"]).unwrap().mode, CliMode::Logout);
        assert_eq!(
            parse(&["--login", "abc"]).unwrap().mode,
            CliMode::Login("abc".into())
        );
        assert!(parse(&["--login"]).is_err());
    }

    #[test]
    fn parse_cli_args_rejects_unknown_flags() {
        assert!(parse(&["--sync"]).is_err());
        assert_eq!(parse(&["-h"]).unwrap().mode, CliMode::Help);
    }
}
