// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Cellarium: Wine Cellar Placement & Reorganization Engine
//!
//! Command-line front end over the zone matcher, slot allocator, cellar
//! analyzer and move planner.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use cellarium::allocation::{InMemoryAllocationStore, SqliteAllocationStore, ZoneAllocationStore};
use cellarium::analysis::{AnalysisReport, CellarAnalyzer};
use cellarium::config::AppConfig;
use cellarium::matcher::{ZoneMatch, ZoneMatcher};
use cellarium::placement::{PlacementOptions, PlacementOutcome, SlotAllocator};
use cellarium::planner::{free_slots_by_zone, EffortPlanner, MoveSuggestion, PlannedMoves};
use cellarium::slots::{CellarLayout, SlotId};
use cellarium::wine::{normalize, RawWine};
use cellarium::zones::ZoneRegistry;
use cellarium::{CellariumError, Result};

/// Cellarium CLI - wine cellar placement and reorganization
#[derive(Parser, Debug)]
#[command(name = "cellarium")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "Decides where bottles go and plans how to tidy the cellar", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "cellarium.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Recommend a zone for one wine
    Match {
        /// JSON file holding one wine record
        wine: PathBuf,
    },

    /// Find a slot for a new bottle
    Place {
        /// JSON file holding one wine record
        wine: PathBuf,

        /// Inventory of bottles already in the cellar (JSON array)
        #[arg(short, long)]
        inventory: Option<PathBuf>,

        /// Place into this zone instead of the recommended one
        #[arg(long)]
        zone: Option<String>,

        /// Record the placement in the allocation database
        #[arg(long)]
        commit: bool,

        /// Never fall back to the unclassified zone
        #[arg(long)]
        no_fallback: bool,
    },

    /// Record a bottle leaving a zone
    Remove {
        /// Zone the bottle was taken from
        #[arg(long)]
        zone: String,
    },

    /// Audit the cellar for misplaced bottles
    #[command(alias = "analyze")]
    Analyse {
        /// Inventory of placed bottles (JSON array)
        #[arg(short, long)]
        inventory: PathBuf,
    },

    /// Suggest moves for misplaced bottles
    Plan {
        /// Inventory of placed bottles (JSON array)
        #[arg(short, long)]
        inventory: PathBuf,

        /// Use the effort planner (swaps, confidence floor, effort budget)
        #[arg(long)]
        effort: bool,
    },

    /// Zone catalogue and row allocations
    Zones {
        #[command(subcommand)]
        action: ZoneCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Initialize a new cellar
    Init {
        /// Directory to initialize (default: current)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ZoneCommands {
    /// List configured zones in matching order
    List,

    /// Show rows currently bound to zones
    Allocations,

    /// Release every row bound to a zone
    Release {
        zone_id: String,
    },

    /// Vacuum the allocation database (reclaim space)
    Vacuum,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "cellarium.json")]
        output: PathBuf,
    },

    /// Validate configuration file and zone catalogue
    Validate,
}

/// Components wired from one configuration
struct Engine {
    config: AppConfig,
    registry: Arc<ZoneRegistry>,
    matcher: ZoneMatcher,
    store: Arc<SqliteAllocationStore>,
    allocator: SlotAllocator,
}

impl Engine {
    fn open(config: AppConfig) -> Result<Self> {
        let registry = Arc::new(config.zone_registry()?);
        let matcher = ZoneMatcher::new(registry.clone(), config.matching.clone());
        let store = Arc::new(SqliteAllocationStore::open(&config.database.path)?);
        info!("Allocation database: {}", config.database.path);
        let allocator = SlotAllocator::new(
            registry.clone(),
            config.layout.clone(),
            config.placement.overflow.clone(),
            store.clone(),
        );
        Ok(Self {
            config,
            registry,
            matcher,
            store,
            allocator,
        })
    }

    fn options(&self) -> PlacementOptions {
        PlacementOptions::from(&self.config.placement)
    }

    fn analyzer(&self) -> CellarAnalyzer {
        CellarAnalyzer::new(
            self.matcher.clone(),
            self.allocator.clone(),
            self.config.analysis.clone(),
            self.options(),
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load(&cli.config)?;
    let json = cli.format == "json";

    match cli.command {
        Commands::Match { wine } => run_match(config, &wine, json),
        Commands::Place { wine, inventory, zone, commit, no_fallback } => {
            run_place(config, &wine, inventory.as_deref(), zone, commit, no_fallback, json).await
        }
        Commands::Remove { zone } => run_remove(config, &zone).await,
        Commands::Analyse { inventory } => run_analyse(config, &inventory, json).await,
        Commands::Plan { inventory, effort } => run_plan(config, &inventory, effort, json).await,
        Commands::Zones { action } => run_zones_command(config, action, json).await,
        Commands::Config { action } => run_config_command(config, action, &cli.config),
        Commands::Init { dir, force } => run_init(dir, force).await,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_wine(path: &Path) -> Result<RawWine> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Read an inventory file, rejecting slots outside the layout or held twice
fn load_inventory(path: &Path, layout: &CellarLayout) -> Result<Vec<RawWine>> {
    let content = std::fs::read_to_string(path)?;
    let wines: Vec<RawWine> = serde_json::from_str(&content)?;

    let mut holders: HashMap<SlotId, i64> = HashMap::new();
    for wine in &wines {
        let Some(slot) = wine.slot else { continue };
        if !layout.contains(&slot) {
            return Err(CellariumError::InvalidSlot(format!(
                "{} (wine {}) is outside the cellar layout",
                slot, wine.id
            )));
        }
        if let Some(other) = holders.insert(slot, wine.id) {
            return Err(CellariumError::InvalidSlot(format!(
                "{} is held by both wine {} and wine {}",
                slot, other, wine.id
            )));
        }
    }
    info!("Loaded {} wines from {:?}", wines.len(), path);
    Ok(wines)
}

fn occupied_slots(wines: &[RawWine]) -> HashSet<SlotId> {
    wines.iter().filter_map(|w| w.slot).collect()
}

fn print_match(zone_match: &ZoneMatch) {
    println!("Zone: {} ({})", zone_match.zone_name, zone_match.zone_id);
    println!("  Confidence: {} (score {})", zone_match.confidence, zone_match.score);
    println!("  Reason: {}", zone_match.reason);
    if zone_match.requires_review {
        println!("  Needs manual review");
    }
    if !zone_match.alternatives.is_empty() {
        println!("  Alternatives:");
        for alt in &zone_match.alternatives {
            println!("    {} - {} [{}]", alt.zone_name, alt.score, alt.matched.join(", "));
        }
    }
}

fn print_moves(moves: &[MoveSuggestion]) {
    if moves.is_empty() {
        println!("No moves needed");
        return;
    }
    for m in moves {
        let destination = m.to.map(|s| s.to_string()).unwrap_or_else(|| "?".to_string());
        println!(
            "  P{} {:<6} {} {} -> {} ({}) - {}",
            m.priority, m.kind, m.wine_name, m.from, destination, m.target_zone_id, m.reason
        );
    }
}

/// Classify a single wine
fn run_match(config: AppConfig, path: &Path, json: bool) -> Result<()> {
    let registry = Arc::new(config.zone_registry()?);
    let matcher = ZoneMatcher::new(registry, config.matching);
    let wine = normalize(&read_wine(path)?);
    let zone_match = matcher.find_best_zone(&wine);

    if json {
        return print_json(&zone_match);
    }
    println!("{}", wine.name);
    print_match(&zone_match);
    Ok(())
}

/// Find a slot for a new bottle
async fn run_place(
    config: AppConfig,
    wine_path: &Path,
    inventory: Option<&Path>,
    zone: Option<String>,
    commit: bool,
    no_fallback: bool,
    json: bool,
) -> Result<()> {
    let engine = Engine::open(config)?;
    let raw = read_wine(wine_path)?;
    let wines = match inventory {
        Some(path) => load_inventory(path, &engine.config.layout)?,
        None => Vec::new(),
    };

    let mut options = engine.options();
    if no_fallback {
        options.allow_fallback = false;
    }

    let allocator = if commit {
        engine.allocator.clone()
    } else {
        let snapshot = engine.store.active_allocations().await?;
        engine
            .allocator
            .with_store(Arc::new(InMemoryAllocationStore::from_snapshot(snapshot)))
    };
    let outcome: PlacementOutcome = allocator
        .place_bottle(&engine.matcher, &raw, &occupied_slots(&wines), zone.as_deref(), options)
        .await?;

    if json {
        return print_json(&outcome);
    }

    print_match(&outcome.zone_match);
    match &outcome.placement {
        Some(p) => {
            println!("Slot: {} in {}", p.slot_id, engine.registry.display_name(&p.zone_id));
            if p.is_overflow {
                println!("  Overflow via {}", p.overflow_path.join(" -> "));
            }
            if !commit {
                println!("  (dry run - use --commit to record the placement)");
            }
        }
        None => println!("No free slot in {} or its overflow zones; place manually", outcome.target_zone_id),
    }
    Ok(())
}

/// Record a bottle leaving a zone
async fn run_remove(config: AppConfig, zone: &str) -> Result<()> {
    let engine = Engine::open(config)?;
    let remaining = engine.allocator.remove_bottle(zone).await?;
    if remaining == 0 {
        println!("{} is empty; its rows have been released", engine.registry.display_name(zone));
    } else {
        println!("{} now holds {} bottles", engine.registry.display_name(zone), remaining);
    }
    Ok(())
}

async fn analyse(engine: &Engine, inventory: &Path) -> Result<(Vec<RawWine>, AnalysisReport)> {
    let wines = load_inventory(inventory, &engine.config.layout)?;
    let report = engine.analyzer().analyse_cellar(&wines).await?;
    Ok((wines, report))
}

/// Full cellar audit
async fn run_analyse(config: AppConfig, inventory: &Path, json: bool) -> Result<()> {
    let engine = Engine::open(config)?;
    let (_, report) = analyse(&engine, inventory).await?;

    if json {
        return print_json(&report);
    }

    let s = &report.summary;
    println!("Cellar analysis {} ({})", report.id, report.generated_at.format("%Y-%m-%d %H:%M"));
    println!("  Wines: {} ({} cellar, {} fridge, {} unplaced)", s.total_wines, s.cellar_wines, s.fridge_wines, s.unplaced_wines);
    println!("  Correctly placed: {}", s.correctly_placed);
    println!("  Misplaced: {}", s.misplaced);
    println!("  Buffer occupants: {}", s.buffer_occupants);
    println!("  Needs review: {}", s.needs_review);

    println!("\nZones:");
    for zone in &report.zones {
        println!(
            "  {:<32} rows {:?} {:>3}/{:<3} {:>5.1}% frag {:>5.1}% {}",
            zone.zone_name, zone.rows, zone.bottle_count, zone.capacity, zone.utilization, zone.fragmentation, zone.health
        );
    }

    if !report.misplaced.is_empty() {
        println!("\nMisplaced:");
        for wine in &report.misplaced {
            println!(
                "  {} at {} ({}) belongs in {} [{}]",
                wine.name,
                wine.current_slot,
                wine.current_zone_id.as_deref().unwrap_or("no zone"),
                wine.recommended_zone_name,
                wine.confidence
            );
        }
    }

    if !report.alerts.is_empty() {
        println!("\nAlerts:");
        for alert in &report.alerts {
            println!("  [{:?}] {}", alert.severity, alert.message);
        }
    }

    println!("\nSuggested moves:");
    print_moves(&report.suggested_moves);

    println!();
    for line in &report.narratives {
        println!("{}", line);
    }
    Ok(())
}

/// Move suggestions, optionally through the effort planner
async fn run_plan(config: AppConfig, inventory: &Path, effort: bool, json: bool) -> Result<()> {
    let engine = Engine::open(config)?;
    let (wines, report) = analyse(&engine, inventory).await?;

    if !effort {
        if json {
            return print_json(&report.suggested_moves);
        }
        println!("{} misplaced bottles:", report.misplaced.len());
        print_moves(&report.suggested_moves);
        return Ok(());
    }

    let allocations = engine.store.active_allocations().await?;
    let free = free_slots_by_zone(&allocations, &engine.config.layout, &occupied_slots(&wines));
    let plan: PlannedMoves = EffortPlanner::from(&engine.config.planning).plan_moves(&report.misplaced, &free);

    if json {
        return print_json(&plan);
    }
    println!("{}", plan.summary());
    print_moves(&plan.moves);
    for skipped in &plan.skipped {
        println!("  skipped wine {}: {}", skipped.wine_id, skipped.reason);
    }
    Ok(())
}

/// Zone catalogue and allocation commands
async fn run_zones_command(config: AppConfig, action: ZoneCommands, json: bool) -> Result<()> {
    match action {
        ZoneCommands::List => {
            let registry = config.zone_registry()?;
            if json {
                return print_json(&registry.iter().collect::<Vec<_>>());
            }
            println!("Zones ({}):", registry.len());
            for zone in registry.iter() {
                let overflow = zone.overflow_zone_id.as_deref().unwrap_or("-");
                println!(
                    "  {:<22} {:<10} rows {:?} -> {}",
                    zone.id,
                    format!("{:?}", zone.kind).to_lowercase(),
                    zone.preferred_rows,
                    overflow
                );
            }
        }
        ZoneCommands::Allocations => {
            let engine = Engine::open(config)?;
            let allocations = engine.store.active_allocations().await?;
            if json {
                return print_json(&allocations);
            }
            if allocations.is_empty() {
                println!("No rows are bound to zones");
            }
            for allocation in allocations.values() {
                println!(
                    "  {:<32} rows {:?} ({} bottles, since {})",
                    engine.registry.display_name(&allocation.zone_id),
                    allocation.rows,
                    allocation.wine_count,
                    allocation.first_wine_at.format("%Y-%m-%d")
                );
            }
        }
        ZoneCommands::Release { zone_id } => {
            let engine = Engine::open(config)?;
            if engine.store.release_zone(&zone_id).await? {
                println!("Released rows of {}", zone_id);
            } else {
                warn!("Zone {} had no rows bound", zone_id);
            }
        }
        ZoneCommands::Vacuum => {
            let engine = Engine::open(config)?;
            engine.store.vacuum()?;
            println!("Database vacuumed successfully");
        }
    }
    Ok(())
}

/// Run config commands
fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            print_json(&config)?;
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            let registry = config.zone_registry()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Zones: {}", registry.len());
            println!("  Cellar rows: {}", config.layout.rows);
            println!("  Database: {}", config.database.path);
        }
    }
    Ok(())
}

/// Initialize a new cellar
async fn run_init(dir: Option<PathBuf>, force: bool) -> Result<()> {
    let target = dir.unwrap_or_else(|| PathBuf::from("."));
    let config_path = target.join("cellarium.json");

    if config_path.exists() && !force {
        return Err(CellariumError::Config(
            "cellarium.json already exists. Use --force to overwrite".to_string(),
        ));
    }
    std::fs::create_dir_all(&target)?;

    // Write the built-in catalogue out so it can be edited
    let zones_path = target.join("zones.json");
    let registry = ZoneRegistry::builtin();
    std::fs::write(&zones_path, serde_json::to_string_pretty(&registry.iter().collect::<Vec<_>>())?)?;

    let mut config = AppConfig::default();
    config.zones_path = Some(zones_path.to_string_lossy().to_string());
    config.database.path = target.join("cellarium.db").to_string_lossy().to_string();
    config.save(&config_path)?;

    SqliteAllocationStore::open(&config.database.path)?;

    println!("Cellarium initialized in {:?}", target);
    println!("\nCreated:");
    println!("  - cellarium.json");
    println!("  - zones.json");
    println!("  - cellarium.db");
    Ok(())
}
