use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io;

use threadpick::app::{fetch_preview, App, Key, Mode};
use threadpick::archive::{is_fresh, Archive, Lei};
use threadpick::config::Config;
use threadpick::edition::edition_for;
use threadpick::processor::ThreadProcessor;
use threadpick::resume::ResumeStore;
use threadpick::threads::{build_threads, sort_by_age};
use threadpick::{logging, ui};

/// Browse recent mailing list threads and export the ones worth writing about
#[derive(Parser)]
#[command(name = "threadpick", version)]
struct Cli {
    /// Override the edition number (default: derived from today's date)
    #[arg(long)]
    edition: Option<i64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init()?;
    let config = Config::load();

    let now = Local::now().naive_local();
    let today = now.date();
    let edition = cli.edition.unwrap_or_else(|| edition_for(today));

    let lei = Lei::connect(&config.archive)?;
    check_archive(&lei, &config, now);

    let criteria = config.criteria();
    let messages = lei
        .query(criteria.window())
        .context("Failed to query the archive")?;
    if messages.is_empty() {
        println!("No messages found in the search window.");
        return Ok(());
    }

    let (mut threads, _) = build_threads(messages, &criteria, now);
    sort_by_age(&mut threads);
    if threads.is_empty() {
        println!("No threads match the criteria.");
        return Ok(());
    }

    let store = ResumeStore::new(config.output.dir_path(), config.output.title.clone());
    let index = store.load(edition);
    if !index.done_ids.is_empty() {
        tracing::info!(
            "{} thread(s) already exported for edition {}",
            index.done_ids.len(),
            edition
        );
    }

    let mut app =
        App::new(threads, index.done_ids, Some(edition)).with_preview(config.layout.preview);
    run_selector(&mut app, &lei, &config)?;

    if app.mode == Mode::Aborted {
        eprintln!("Aborted.");
        std::process::exit(130);
    }

    let selected = app.selected_ids();
    if selected.is_empty() {
        println!("No threads selected.");
        return Ok(());
    }

    let processor = ThreadProcessor::new(&lei, &store, edition);
    let report = processor.process(&app.threads, &selected, today)?;

    for id in &report.failed {
        eprintln!("Failed to export {}", id);
    }
    if report.recorded > 0 {
        println!("Index updated: {}", store.index_path(edition).display());
    }
    println!(
        "Exported {}/{} thread(s) to {}/",
        report.exported.len(),
        selected.len(),
        report.output_dir.display()
    );

    Ok(())
}

/// Warn when there is no local mirror or it has not been updated lately
fn check_archive(lei: &Lei, config: &Config, now: chrono::NaiveDateTime) {
    let Some(repo) = lei.repo() else {
        tracing::warn!("No local archive found; previews and exports may fail");
        return;
    };
    tracing::info!("Using archive {}", repo.display());

    match lei.latest_message_date() {
        Ok(latest) if !is_fresh(latest, now, config.archive.stale_after_days) => {
            tracing::warn!(
                "Archive looks stale (latest message: {}); consider `lei up {}`",
                latest
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                repo.display()
            );
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("Could not check archive freshness: {}", e),
    }
}

fn run_selector(app: &mut App, archive: &dyn Archive, config: &Config) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, app, archive, config);
    let restored = restore_terminal(&mut terminal);
    result.and(restored)
}

/// Undo raw mode and the alternate screen, attempting every step even when
/// an earlier one fails
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    let raw = disable_raw_mode();
    let screen = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let cursor = terminal.show_cursor();
    raw?;
    screen?;
    cursor?;
    Ok(())
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    archive: &dyn Archive,
    config: &Config,
) -> Result<()> {
    while !app.is_finished() {
        let size = terminal.size()?;
        app.set_viewport(ui::list_rows(size.height));
        if ui::preview_visible(app, size.width, &config.layout) {
            app.load_preview_if_needed(|blob| {
                fetch_preview(archive, blob, config.layout.preview_max_lines)
            });
        }

        terminal.draw(|f| ui::render(f, app, &config.layout, &config.theme))?;

        // Resize events fall through to a redraw
        if let Event::Key(key) = event::read()? {
            if let Some(key) = Key::from_event(&key) {
                app.update(key);
            }
        }
    }
    Ok(())
}
