use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tekken_stats::calculate::{
    character_win_rates, most_popular_by_region, popular_characters, LeaderboardFilter,
};
use tekken_stats::config::AppConfig;
use tekken_stats::enums::{EnumsMapper, StaticEnumsMapper};
use tekken_stats::ingest::{ingest_battles, read_battles};
use tekken_stats::models::{Player, PlayerId};
use tekken_stats::storage::{
    LadderStore, PastPlayerNamesRepository, PlayerRepository, StorageConfig,
};

#[derive(Parser)]
#[command(name = "tekken-stats")]
#[command(about = "Ranked ladder statistics tracker")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a JSONL file of battle reports
    Ingest {
        /// Battle feed file
        path: PathBuf,

        /// Also ingest non-ranked battles
        #[arg(long)]
        all_types: bool,
    },

    /// Show a player's profile and character stats
    Player { id: String },

    /// Show a player's name history
    Names { id: String },

    /// Delete a player and everything it owns
    DeletePlayer { id: String },

    /// Character popularity per region
    Popular {
        /// Only this region
        #[arg(long)]
        region: Option<i32>,

        /// Only this game version
        #[arg(long)]
        version: Option<i32>,

        /// Only the top character of each region
        #[arg(long)]
        top: bool,
    },

    /// Character win-rate rankings
    Rankings {
        /// Minimum battles per character (default from config)
        #[arg(long)]
        min_battles: Option<u64>,

        /// Only this game version
        #[arg(long)]
        version: Option<i32>,

        /// Only this region
        #[arg(long)]
        region: Option<i32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(log_level) = cli.log_level {
        config.log_level = log_level;
    }

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting tekken-stats v{}", env!("CARGO_PKG_VERSION"));

    let store = LadderStore::open(StorageConfig::new(config.data_dir.clone()))
        .context("Failed to open ladder store")?;

    match cli.command {
        Commands::Ingest { path, all_types } => {
            let battles = read_battles(&path)
                .with_context(|| format!("Failed to read battles from {:?}", path))?;
            let mut ingest_config = config.ingest.clone();
            if all_types {
                ingest_config.ranked_only = false;
            }

            let result = ingest_battles(&store, battles, &ingest_config).await?;

            println!("\n=== Ingest Results ===");
            println!("Battles ingested:  {}", result.battles_ingested);
            println!("Duplicates:        {}", result.duplicates_skipped);
            println!("Unranked skipped:  {}", result.unranked_skipped);
            println!("Invalid skipped:   {}", result.invalid_skipped);
            println!("Players created:   {}", result.players_created);
            println!("Players updated:   {}", result.players_updated);
        }
        Commands::Player { id } => {
            let mapper = load_mapper(&config)?;
            match store.players().find_by_id(&PlayerId::from(id.as_str())).await? {
                Some(player) => print_player(&player, &mapper),
                None => println!("No player with id {}", id),
            }
        }
        Commands::Names { id } => {
            let names = store
                .player_names()
                .find_by_player(&PlayerId::from(id.as_str()))
                .await?;
            if names.is_empty() {
                println!("No past names for {}", id);
            }
            for name in names {
                println!("{:<24} until {}", name.name, format_timestamp(name.recorded_at));
            }
        }
        Commands::DeletePlayer { id } => {
            if store.players().delete_by_id(&PlayerId::from(id.as_str())).await? {
                println!("Deleted player {}", id);
            } else {
                println!("No player with id {}", id);
            }
        }
        Commands::Popular {
            region,
            version,
            top,
        } => {
            let mapper = load_mapper(&config)?;
            let filter = LeaderboardFilter {
                game_version: version,
                region_id: region,
                min_battles: 0,
            };
            let players = store.players().find_all().await?;
            let rows = if top {
                most_popular_by_region(&players, &filter)
            } else {
                popular_characters(&players, &filter)
            };

            println!(
                "{:>6}  {:<16} {:>10} {:>10} {:>10} {:>8}",
                "Region", "Character", "Battles", "Wins", "Losses", "Win %"
            );
            for row in rows {
                println!(
                    "{:>6}  {:<16} {:>10} {:>10} {:>10} {:>7.2}%",
                    row.region_id,
                    character_label(&mapper, &row.character_id),
                    row.total_battles,
                    row.total_wins,
                    row.total_losses,
                    row.winrate_percentage
                );
            }
        }
        Commands::Rankings {
            min_battles,
            version,
            region,
        } => {
            let mapper = load_mapper(&config)?;
            let filter = LeaderboardFilter {
                game_version: version,
                region_id: region,
                min_battles: min_battles.unwrap_or(config.leaderboard.min_battles),
            };
            let players = store.players().find_all().await?;

            println!(
                "{:>4}  {:<16} {:>8} {:>10} {:>8}",
                "#", "Character", "Win %", "Battles", "Players"
            );
            for (rank, row) in character_win_rates(&players, &filter).iter().enumerate() {
                println!(
                    "{:>4}  {:<16} {:>7.2}% {:>10} {:>8}",
                    rank + 1,
                    character_label(&mapper, &row.character_id),
                    row.winrate_percentage,
                    row.total_battles,
                    row.player_count
                );
            }
        }
    }

    Ok(())
}

fn load_mapper(config: &AppConfig) -> Result<StaticEnumsMapper> {
    match &config.enums_file {
        Some(path) => StaticEnumsMapper::from_file(path)
            .with_context(|| format!("Failed to load name tables from {:?}", path)),
        None => Ok(StaticEnumsMapper::default()),
    }
}

fn character_label(mapper: &dyn EnumsMapper, id: &tekken_stats::models::CharacterId) -> String {
    mapper.character_name(id).unwrap_or_else(|| id.to_string())
}

fn format_timestamp(secs: i64) -> String {
    if secs == 0 {
        return "never".to_string();
    }
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}

fn print_player(player: &Player, mapper: &dyn EnumsMapper) {
    let main = player.most_played_character_info(mapper);

    println!("\n=== {} ({}) ===", player.name, player.player_id);
    println!("Polaris ID:    {}", player.polaris_id);
    println!("Tekken power:  {}", player.tekken_power);
    println!(
        "Region/area:   {}/{}",
        player.region_id.map_or("-".to_string(), |r| r.to_string()),
        player.area_id.map_or("-".to_string(), |a| a.to_string())
    );
    println!("Language:      {}", player.language.as_deref().unwrap_or("-"));
    println!("Latest battle: {}", format_timestamp(player.latest_battle));
    println!("Main:          {} ({})", main.character_name, main.dan_rank);

    if !player.player_names.is_empty() {
        let names: Vec<&str> = player.player_names.iter().map(|n| n.name.as_str()).collect();
        println!("Also known as: {}", names.join(", "));
    }

    if !player.character_stats.is_empty() {
        println!(
            "\n{:<16} {:>8} {:>6} {:>6}  {:<20}",
            "Character", "Version", "Wins", "Losses", "Rank"
        );
        for stats in player.character_stats.values() {
            println!(
                "{:<16} {:>8} {:>6} {:>6}  {:<20}",
                character_label(mapper, &stats.character_id),
                stats.game_version,
                stats.wins,
                stats.losses,
                mapper
                    .dan_name(stats.dan_rank)
                    .unwrap_or_else(|| stats.dan_rank.to_string())
            );
        }
    }
}
