use std::time::Duration;

use anyhow::Result;
use tasklist_core::{AppError, Config};
use tasklist_services::{
    LoadState, MemoryStore, RetryConfig, Session, TaskBackend, TaskClient, TaskListOptions,
    UserAction,
};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "commands: add <name> | toggle <n> | delete <n> | search [pattern] | \
list | failures | retry <n> | dismiss <n> | reload | quit";

#[tokio::main]
async fn main() -> Result<()> {
    tasklist_core::init()?;

    let (config, _) = Config::load_validated()?;
    let offline = std::env::args().any(|a| a == "--memory");

    let backend = if offline {
        tracing::info!("Using in-memory task store");
        TaskBackend::memory(MemoryStore::new())
    } else {
        let client = TaskClient::new(
            &config.remote.base_url,
            Duration::from_secs(config.remote.timeout_secs),
        )
        .map_err(AppError::from)?
        .with_retry(RetryConfig::from(config.retry.clone()));
        tracing::info!("Using task store at {}", client.base_url());
        TaskBackend::http(client)
    };

    let mut session = Session::new(
        backend,
        TaskListOptions::from(&config),
        tokio::runtime::Handle::current(),
    );

    session.start();
    session.settle().await;
    render(&session);
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (cmd, arg) = line.split_once(' ').unwrap_or((line, ""));

        let actions = match (cmd, arg.parse::<usize>()) {
            ("quit" | "exit", _) => break,
            ("add", _) => vec![UserAction::SetInput(arg.to_string()), UserAction::Submit],
            ("toggle", Ok(n)) => vec![UserAction::Toggle(n)],
            ("delete", Ok(n)) => vec![UserAction::Delete(n)],
            ("retry", Ok(n)) => vec![UserAction::Retry(n)],
            ("dismiss", Ok(n)) => vec![UserAction::Dismiss(n)],
            ("search", _) => vec![UserAction::Search(arg.to_string())],
            ("reload", _) => vec![UserAction::Reload],
            ("failures", _) => {
                render_failures(&session);
                continue;
            }
            ("list" | "", _) => Vec::new(),
            _ => {
                println!("{}", HELP);
                continue;
            }
        };

        for action in actions {
            session.dispatch(action);
        }
        if session.in_flight() > 0 {
            render(&session);
            session.settle().await;
        }
        render(&session);
    }

    tracing::info!("Task list closed");
    Ok(())
}

fn render(session: &Session) {
    let state = session.state();

    let rows = match (state.load_state(), state.visible_rows()) {
        (LoadState::Failed(message), _) => {
            println!("[load failed] {} (type `reload`)", message);
            return;
        }
        (_, None) => {
            println!("[loading]");
            return;
        }
        (_, Some(rows)) => rows,
    };

    if state.show_search() {
        let pattern = state.pattern();
        match state.pattern_error() {
            Some(e) => println!("search: {:?} ({})", pattern, e.user_message()),
            None if !pattern.is_empty() => println!("search: {:?}", pattern),
            None => {}
        }
    }

    for (i, row) in rows.iter().enumerate() {
        let task = row.task();
        let mark = if task.done { "x" } else { " " };
        let sync = if task.is_persisted() { "" } else { " (saving)" };
        println!("{:>3}. [{}] {}{}", i, mark, task.name, sync);
    }

    if !state.failures().is_empty() {
        println!(
            "{} change(s) not saved; type `failures` to review",
            state.failures().len()
        );
    }
}

fn render_failures(session: &Session) {
    for (i, failure) in session.state().failures().iter().enumerate() {
        println!("{:>3}. {:?}: {}", i, failure.mutation, failure.message);
    }
}
