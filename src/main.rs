mod app;
mod domain;
mod store;
mod ui;
mod usecase;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use time::OffsetDateTime;

use app::App;
use domain::task::Task;
use store::TaskStore;
use store::file::FileStorage;
use store::memory::MemoryStorage;

#[derive(Parser, Debug)]
#[command(author, version, about = "tarea - minimal todo TUI with due dates", long_about = None)]
struct Args {
    /// Tick interval of render loop in milliseconds
    #[arg(long, default_value_t = 120)]
    tick_ms: u64,

    /// Start with demo tasks in a throwaway store
    #[arg(long, default_value_t = false)]
    demo: bool,

    /// Keep tasks in memory only instead of the JSON file
    #[arg(long, default_value_t = false)]
    memory: bool,

    /// Path to the tasks JSON file (default: OS data dir)
    #[arg(long)]
    store_path: Option<std::path::PathBuf>,
}

fn main() -> Result<()> {
    if std::env::var("TAREA_DEBUG").is_ok() {
        // Stderr, not stdout: the TUI owns the alternate screen.
        tracing_subscriber::fmt()
            .with_env_filter("tarea=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    let args = Args::parse();

    let mut store = if args.demo {
        TaskStore::with_seed(Arc::new(MemoryStorage::default()), seed_tasks())?
    } else if args.memory {
        TaskStore::new(Arc::new(MemoryStorage::default()))?
    } else if let Some(path) = args.store_path.as_ref() {
        TaskStore::new(Arc::new(FileStorage::new(path)))?
    } else {
        TaskStore::new(Arc::new(FileStorage::open_default()?))?
    };
    if !args.demo {
        // The one startup load; demo seeds would be clobbered by it.
        store.load();
    }

    let app = App::new(store);
    ui::run(app, Duration::from_millis(args.tick_ms))
}

fn seed_tasks() -> Vec<Task> {
    let now = OffsetDateTime::now_utc();
    vec![
        Task::with_due("Pay rent", now - time::Duration::days(2)),
        Task::new("Buy groceries"),
        Task::with_due("Call the dentist", now + time::Duration::days(1)),
    ]
}
