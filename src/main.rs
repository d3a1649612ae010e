//! Bond bot entry point.
//!
//! Orchestrates the two evaluation loops:
//! 1. Rebase loop — claim-and-autostake shortly before each rebase event
//! 2. Bonding loop — bond into whichever instrument shows the best discount
//!
//! Both loops share one submission gate and one audit journal. A
//! supervisor restarts them with bounded exponential backoff if either
//! ever exits.

mod config;
mod journal;

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{error, info, warn};

use common::native_tokens;
use paper_ledger::PaperLedger;
use strategy::{
    funding_sufficient, select_candidate, use_pending_rewards, BondEngine, NullSink, RebaseEngine,
    SharedAuditSink,
};

use crate::journal::{resolve_moves_dir, MoveJournal};

/// Automatic bonding and rebase compounding bot
#[derive(Parser)]
#[command(name = "bond-bot", about = "Automatic bonding and rebase compounding bot")]
struct Cli {
    /// Print the resolved configuration and exit.
    #[arg(long)]
    check_config: bool,

    /// Run a single bonding evaluation without executing, then exit.
    #[arg(long)]
    dry_run: bool,
}

const RESTART_BACKOFF_START: Duration = Duration::from_secs(1);
const RESTART_BACKOFF_MAX: Duration = Duration::from_secs(300);
/// A run this long resets the restart backoff.
const STABLE_RUN: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bond_bot=info,strategy=info,paper_ledger=info".into()),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    info!("🏛️  Bond Bot starting up...");

    // Load configuration.
    let cfg = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Strategy: claim≥{} OHM, bond≥{} sOHM, discount≥{}%, use_pending={}",
        cfg.strategy.min_pending_reward_to_claim,
        cfg.strategy.min_staked_balance_to_bond,
        cfg.strategy.min_bond_discount_percent,
        cfg.strategy.use_pending_rewards,
    );
    info!(
        "Timing: bond_poll={}s, rebase_poll={}s, proximity={} blocks, cooldown={}s, confirm_timeout={}s",
        cfg.timing.bond_poll_interval_secs,
        cfg.timing.rebase_poll_interval_secs,
        cfg.timing.rebase_proximity_blocks,
        cfg.timing.post_rebase_cooldown_secs,
        cfg.timing.confirm_timeout_secs,
    );
    info!(
        "Gas: limit={}, price={} gwei",
        cfg.gas.default_gas, cfg.gas.default_gas_price
    );

    // ── Check-config mode ────────────────────────────────────────────
    if cli.check_config {
        match toml::to_string_pretty(&cfg) {
            Ok(rendered) => println!("{}", rendered),
            Err(e) => {
                error!("Failed to render configuration: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    if !cfg.paper_mode {
        error!(
            "No live ledger backend is wired in this build; set paper_mode = true \
             or provide a RemoteLedger implementation for your network"
        );
        std::process::exit(1);
    }

    let ledger = Arc::new(PaperLedger::new(&cfg.paper));
    let gate = Arc::new(Mutex::new(()));

    // ── Dry-run mode ─────────────────────────────────────────────────
    if cli.dry_run {
        info!("Running single bonding evaluation (dry-run, not executing)...");
        let sink: SharedAuditSink = Arc::new(Mutex::new(NullSink));
        let engine = BondEngine::new(ledger.clone(), &cfg, gate.clone(), sink);

        let snapshot = match engine.snapshot().await {
            Ok(s) => s,
            Err(e) => {
                error!("Snapshot failed: {}", e);
                std::process::exit(1);
            }
        };
        info!(
            "FRAX: {:.2}% | OHM-FRAX LP: {:.2}% | pending: {:.4} OHM | staked: {:.4} sOHM",
            snapshot.frax_discount,
            snapshot.lp_discount,
            native_tokens(snapshot.pending.total()),
            native_tokens(snapshot.staked_balance),
        );

        let thresholds = cfg.strategy.thresholds();
        let use_pending = use_pending_rewards(&snapshot, &thresholds);
        match select_candidate(&snapshot, thresholds.min_bond_discount_percent) {
            Some(target) if funding_sufficient(&snapshot, target, use_pending, &thresholds) => {
                info!(
                    "→ would execute the {} strategy at {:.2}% discount, funding from {}",
                    target.label(),
                    snapshot.discount_of(target),
                    if use_pending {
                        "pending rewards"
                    } else {
                        "staked balance"
                    },
                );
            }
            Some(target) => {
                info!(
                    "→ good discount on {} ({:.2}%), but not enough sOHM balance",
                    target.label(),
                    snapshot.discount_of(target),
                );
            }
            None => info!("→ no bond clears the discount threshold"),
        }
        return;
    }

    // ── Audit journal ────────────────────────────────────────────────
    let moves_dir = resolve_moves_dir();
    let mut journal = match MoveJournal::open(moves_dir) {
        Ok(j) => j,
        Err(e) => {
            error!("Failed to initialize move journal: {}", e);
            std::process::exit(1);
        }
    };
    info!("Move journal path: {}", journal.dir().display());
    journal.write_event(serde_json::json!({
        "ts": journal::now_iso(),
        "kind": "bot_start",
        "paper_mode": cfg.paper_mode,
        "min_bond_discount_percent": cfg.strategy.min_bond_discount_percent,
        "use_pending_rewards": cfg.strategy.use_pending_rewards,
        "bond_poll_interval_secs": cfg.timing.bond_poll_interval_secs,
        "rebase_poll_interval_secs": cfg.timing.rebase_poll_interval_secs,
    }));
    let sink: SharedAuditSink = Arc::new(Mutex::new(journal));

    // ── Supervised loops ─────────────────────────────────────────────
    let mut backoff = RESTART_BACKOFF_START;
    loop {
        let started = Instant::now();
        let bond = BondEngine::new(ledger.clone(), &cfg, gate.clone(), sink.clone());
        let rebase = RebaseEngine::new(ledger.clone(), &cfg, gate.clone(), sink.clone());
        let mut bond_handle = tokio::spawn(bond.run());
        let mut rebase_handle = tokio::spawn(rebase.run());

        info!("🚀 Bond Bot is running. Press Ctrl+C to stop.");

        let restart = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                false
            }
            r = &mut bond_handle => {
                error!("Bonding loop exited: {:?}", r);
                true
            }
            r = &mut rebase_handle => {
                error!("Rebase loop exited: {:?}", r);
                true
            }
        };

        bond_handle.abort();
        rebase_handle.abort();

        if !restart {
            info!("Bond Bot stopped.");
            return;
        }

        if started.elapsed() >= STABLE_RUN {
            backoff = RESTART_BACKOFF_START;
        }
        warn!("Restarting loops in {}s", backoff.as_secs());
        sleep(backoff).await;
        backoff = (backoff * 2).min(RESTART_BACKOFF_MAX);
    }
}
