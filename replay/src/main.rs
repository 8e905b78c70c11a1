//! resona-replay - feeds a recorded event stream through the aggregation registry.
//!
//! Events are read as JSON lines (see `events.rs`). The registry clock follows
//! event timestamps and the realtime refresh runs every `realtime_tick_ms` of
//! event time, so a replay reproduces what a live session would have shown.
//!
//! Usage: resona-replay <events.jsonl> [settings.toml]
//!
//! Output: per-entity table on stdout; history files under `log_dir`.

mod events;

use resona_core::config::{load_settings, load_settings_from};
use resona_core::game_data::SkillNames;
use resona_core::stats::REALTIME_WINDOW_MS;
use resona_core::{PlayerCache, Registry};
use resona_types::Settings;
use resona_types::formatting::{format_compact, format_duration_ms, format_pct_ratio, format_rate};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing_subscriber::filter::EnvFilter;

use events::{FollowUp, ReplayEvent};

/// Initialize logging, writing to RESONA_LOG_PATH if set, otherwise stderr.
fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    if let Ok(path) = std::env::var("RESONA_LOG_PATH") {
        if let Ok(file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
        {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_ansi(false)
                .with_writer(file)
                .init();
            return;
        }
    }

    // Fallback to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        tracing::error!("Usage: resona-replay <events.jsonl> [settings.toml]");
        std::process::exit(1);
    }

    let events_path = Path::new(&args[1]);
    let settings = match args.get(2) {
        Some(path) => load_settings_from(Path::new(path)),
        None => load_settings(),
    };

    let file = match File::open(events_path) {
        Ok(file) => file,
        Err(e) => {
            tracing::error!(error = %e, path = ?events_path, "Failed to open event stream");
            std::process::exit(1);
        }
    };

    let mut events = BufReader::new(file)
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| parse_line(idx + 1, line));

    let Some(first) = events.next() else {
        tracing::warn!(path = ?events_path, "No events to replay");
        return;
    };

    let now = Arc::new(AtomicI64::new(first.timestamp()));
    let mut registry = build_registry(settings, Arc::clone(&now));
    let tick = registry.settings().realtime_tick_ms.max(1) as i64;
    let mut next_tick = first.timestamp() + tick;
    let mut replayed = 0usize;

    for event in std::iter::once(first).chain(events) {
        let ts = event.timestamp().max(now.load(Ordering::SeqCst));

        while next_tick <= ts {
            now.store(next_tick, Ordering::SeqCst);
            registry.update_all_realtime_dps();
            if let Err(e) = registry.flush_pending().await {
                tracing::warn!(error = %e, "Deferred history flush failed");
            }
            next_tick += tick;
            // Windows are empty after a quiet second; skip the idle ticks.
            if ts - next_tick > REALTIME_WINDOW_MS {
                next_tick = ts - (ts - next_tick) % tick;
            }
        }
        now.store(ts, Ordering::SeqCst);

        let result = match event.apply(&mut registry) {
            FollowUp::None => Ok(()),
            FollowUp::Log(line) => registry.add_log(&line).await,
            FollowUp::Reset => registry.reset_statistics().await,
            FollowUp::Clear => registry.clear_all().await,
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Lifecycle write failed, continuing replay");
        }
        replayed += 1;
    }

    registry.update_all_realtime_dps();
    tracing::info!(events = replayed, entities = registry.entity_count(), "Replay finished");
    print_table(&registry, now.load(Ordering::SeqCst));

    if let Err(e) = registry.flush_pending().await {
        tracing::error!(error = %e, "Deferred history flush failed");
    }
    if let Err(e) = registry.save_player_cache().await {
        tracing::error!(error = %e, "Failed to save player cache");
    }
    if let Err(e) = registry.clear_all().await {
        tracing::error!(error = %e, "Final history flush failed");
        std::process::exit(1);
    }
}

fn parse_line(line_no: usize, line: std::io::Result<String>) -> Option<ReplayEvent> {
    let line = match line {
        Ok(line) => line,
        Err(e) => {
            tracing::warn!(line_no, error = %e, "Unreadable line");
            return None;
        }
    };
    if line.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(&line) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!(line_no, error = %e, "Skipping malformed event");
            None
        }
    }
}

fn build_registry(settings: Settings, now: Arc<AtomicI64>) -> Registry {
    let skill_names = match &settings.skill_names {
        Some(path) => SkillNames::load(path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load skill names, showing raw ids");
            SkillNames::new()
        }),
        None => SkillNames::new(),
    };
    let players = PlayerCache::load(&settings.player_cache_path()).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load player cache, starting empty");
        PlayerCache::new()
    });

    Registry::new(settings)
        .with_clock(Arc::new(move || now.load(Ordering::SeqCst)))
        .with_skill_names(Arc::new(skill_names))
        .with_player_cache(players)
}

fn print_table(registry: &Registry, now: i64) {
    println!(
        "Session {} ({} elapsed)",
        registry.session_start(),
        format_duration_ms(now - registry.session_start())
    );
    println!(
        "{:>10}  {:<16} {:<24} {:>9} {:>8} {:>8} {:>9} {:>8} {:>9}",
        "id", "name", "profession", "damage", "dps", "crit", "healing", "hps", "taken"
    );
    for (id, s) in registry.all_users_data() {
        println!(
            "{:>10}  {:<16} {:<24} {:>9} {:>8} {:>8} {:>9} {:>8} {:>9}",
            id,
            s.name,
            s.profession,
            format_compact(s.total_damage.total),
            format_rate(s.total_dps),
            format_pct_ratio(s.total_count.critical, s.total_count.total),
            format_compact(s.total_healing.total),
            format_rate(s.total_hps),
            format_compact(s.taken_damage),
        );
    }
}
