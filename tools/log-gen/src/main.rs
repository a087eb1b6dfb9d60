//! log-gen: synthetic application-error logs for pipeline testing
//!
//! Usage:
//!   log-gen                    # 20 app errors + 5 systemd failures to stdout
//!   log-gen -n 50              # 50 app errors
//!   log-gen -o system.log      # append to a file instead of stdout
//!
//! Entries are spread over the last hour and sorted by timestamp, in the
//! format `2026-02-19 10:00:00,000 ERROR zoom[1234]: message`.

use std::env;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::process;

use chrono::{DateTime, Duration, Local};
use rand::seq::IndexedRandom;
use rand::Rng;

const APPS: &[&str] = &[
    "zoom", "Word", "Excel", "Safari", "Chrome", "Slack", "Teams", "Photoshop", "Finder", "Mail",
    "Calendar", "nginx", "mysql", "redis", "docker",
];

const ERRORS: &[&str] = &[
    "Application crashed: out of memory",
    "Failed to initialize component",
    "Application exited unexpectedly with code 1",
    "Document save failed: disk full",
    "Application terminated unexpectedly",
    "Connection failed: timeout",
    "Worker process crashed with signal 11",
    "Segmentation fault (core dumped)",
    "Fatal error: unable to allocate memory",
    "Process killed due to high CPU usage",
    "Failed to connect to server: connection refused",
    "Database connection lost",
    "File not found: config.json",
    "Permission denied: /var/log/app.log",
    "SSL handshake failed",
];

// Weighted towards errors; the collector should mostly see noise worth
// analyzing.
const SEVERITIES: &[(&str, u32)] = &[("INFO", 10), ("WARNING", 20), ("ERROR", 50), ("CRITICAL", 20)];

const SYSTEMD_TEMPLATES: &[&str] = &[
    "{unit}: Main process exited, status=1/FAILURE",
    "{unit}: Failed with result 'exit-code'",
    "{unit}: Service hold-off time over, scheduling restart",
    "{unit}: Restarting...",
];

fn pick_severity(rng: &mut impl Rng) -> &'static str {
    let total: u32 = SEVERITIES.iter().map(|(_, w)| w).sum();
    let mut roll = rng.random_range(0..total);
    for (name, weight) in SEVERITIES {
        if roll < *weight {
            return name;
        }
        roll -= weight;
    }
    "ERROR"
}

fn app_entry(rng: &mut impl Rng, ts: DateTime<Local>) -> String {
    let app = APPS.choose(rng).unwrap();
    let error = ERRORS.choose(rng).unwrap();
    let severity = pick_severity(rng);
    let pid: u32 = rng.random_range(1000..10000);
    let millis: u32 = rng.random_range(0..1000);
    format!(
        "{},{:03} {} {}[{}]: {}",
        ts.format("%Y-%m-%d %H:%M:%S"),
        millis,
        severity,
        app,
        pid,
        error
    )
}

fn systemd_entry(rng: &mut impl Rng, ts: DateTime<Local>, app: &str) -> String {
    let template = SYSTEMD_TEMPLATES.choose(rng).unwrap();
    let unit = format!("{}.service", app);
    format!(
        "{},000 INFO systemd[1]: {}",
        ts.format("%Y-%m-%d %H:%M:%S"),
        template.replace("{unit}", &unit)
    )
}

fn generate(count: usize, crashes: usize) -> Vec<String> {
    let mut rng = rand::rng();
    let now = Local::now();

    let mut entries: Vec<(DateTime<Local>, String)> = Vec::with_capacity(count + crashes);
    for _ in 0..count {
        let ts = now - Duration::minutes(rng.random_range(0..=60));
        entries.push((ts, app_entry(&mut rng, ts)));
    }

    let mut apps: Vec<&str> = APPS.to_vec();
    for _ in 0..crashes.min(apps.len()) {
        let idx = rng.random_range(0..apps.len());
        let app = apps.swap_remove(idx);
        let ts = now - Duration::minutes(rng.random_range(0..=60));
        entries.push((ts, systemd_entry(&mut rng, ts, app)));
    }

    entries.sort_by_key(|(ts, _)| *ts);
    entries.into_iter().map(|(_, line)| line).collect()
}

fn parse_args() -> (usize, usize, Option<String>) {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut count = 20;
    let mut crashes = 5;
    let mut output = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-n" | "--count" => {
                i += 1;
                count = args.get(i).and_then(|v| v.parse().ok()).unwrap_or_else(|| usage());
            }
            "-c" | "--crashes" => {
                i += 1;
                crashes = args.get(i).and_then(|v| v.parse().ok()).unwrap_or_else(|| usage());
            }
            "-o" | "--output" => {
                i += 1;
                output = Some(args.get(i).cloned().unwrap_or_else(|| usage()));
            }
            _ => usage(),
        }
        i += 1;
    }
    (count, crashes, output)
}

fn usage() -> ! {
    eprintln!("Usage: log-gen [-n COUNT] [-c CRASHES] [-o FILE]");
    eprintln!("  -n  Number of application error entries (default 20)");
    eprintln!("  -c  Number of systemd unit failures (default 5)");
    eprintln!("  -o  Append to FILE instead of stdout");
    process::exit(2);
}

fn main() {
    let (count, crashes, output) = parse_args();
    let entries = generate(count, crashes);

    let result = match output {
        Some(path) => OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut f| {
                for line in &entries {
                    writeln!(f, "{}", line)?;
                }
                eprintln!("log-gen: wrote {} entries to {}", entries.len(), path);
                Ok(())
            }),
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            entries.iter().try_for_each(|line| writeln!(out, "{}", line))
        }
    };

    if let Err(e) = result {
        eprintln!("log-gen: write failed: {}", e);
        process::exit(1);
    }
}
