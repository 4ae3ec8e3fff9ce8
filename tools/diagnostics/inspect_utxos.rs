//! UTXO Inspection Tool
//!
//! Fetches the UTXO set for an address, a comma-separated address list, or
//! an extended public key, then prints the filtered view, balance totals and
//! privacy heuristics.
//!
//! ## Usage
//!
//! ```bash
//! # Single address
//! cargo run --bin inspect-utxos -- bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq
//!
//! # Several addresses, confirmed only, largest first
//! cargo run --bin inspect-utxos -- "1A1z..., bc1q..." --status confirmed
//!
//! # Extended key, exported to CSV
//! cargo run --bin inspect-utxos -- zpub6r... --csv utxos.csv
//!
//! # Re-open a previous JSON export instead of fetching
//! cargo run --bin inspect-utxos -- --import utxos.json --sort age
//! ```

use clap::{Parser, ValueEnum};
use std::time::{SystemTime, UNIX_EPOCH};

use rustyutxo::analytics::shorten;
use rustyutxo::config::init_global_config;
use rustyutxo::export::{format_btc_amount, read_json_file, write_csv_file, write_json_file};
use rustyutxo::metrics::{gather_metrics, init_metrics};
use rustyutxo::telemetry::{init_tracing, TelemetryConfig};
use rustyutxo::{
    AggregatingFetcher, EngineSettings, FetchDisposition, SortDirection, SortField, StatusFilter,
    UtxoController, ViewState,
};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum StatusArg {
    All,
    Confirmed,
    Unconfirmed,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SortArg {
    Amount,
    Age,
    Status,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum DirectionArg {
    Asc,
    Desc,
}

#[derive(Parser, Debug)]
#[clap(name = "inspect-utxos")]
#[clap(about = "Aggregate and inspect UTXOs for addresses or an extended public key", long_about = None)]
struct Args {
    /// Address, comma-separated addresses, or xpub/ypub/zpub/tpub/upub/vpub
    input: Option<String>,

    /// Load UTXOs from a JSON export instead of fetching
    #[clap(long, conflicts_with = "input")]
    import: Option<String>,

    /// Config file name (without extension)
    #[clap(long, default_value = "config")]
    config: String,

    /// Override the Esplora base URL
    #[clap(long)]
    base_url: Option<String>,

    #[clap(long, value_enum, default_value_t = StatusArg::All)]
    status: StatusArg,

    /// Minimum amount in satoshis
    #[clap(long)]
    min: Option<i64>,

    /// Maximum amount in satoshis (0 = no limit)
    #[clap(long)]
    max: Option<i64>,

    #[clap(long, value_enum, default_value_t = SortArg::Amount)]
    sort: SortArg,

    #[clap(long, value_enum, default_value_t = DirectionArg::Desc)]
    direction: DirectionArg,

    /// Write the full UTXO set to a JSON file
    #[clap(long)]
    json: Option<String>,

    /// Write the visible UTXOs to a CSV file
    #[clap(long)]
    csv: Option<String>,

    /// Print Prometheus metrics after the run
    #[clap(long, default_value_t = false)]
    metrics: bool,
}

impl Args {
    fn view_state(&self) -> ViewState {
        ViewState {
            status_filter: match self.status {
                StatusArg::All => StatusFilter::All,
                StatusArg::Confirmed => StatusFilter::Confirmed,
                StatusArg::Unconfirmed => StatusFilter::Unconfirmed,
            },
            min_amount_sats: self.min,
            max_amount_sats: self.max,
            sort_field: match self.sort {
                SortArg::Amount => SortField::Amount,
                SortArg::Age => SortField::Age,
                SortArg::Status => SortField::Status,
            },
            sort_direction: match self.direction {
                DirectionArg::Asc => SortDirection::Ascending,
                DirectionArg::Desc => SortDirection::Descending,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let _guard = init_tracing(TelemetryConfig::default())?;
    init_metrics();
    init_global_config(&args.config)?;

    let mut settings = EngineSettings::current();
    if let Some(base_url) = &args.base_url {
        settings.esplora_base_url = base_url.clone();
    }

    let controller = UtxoController::new(AggregatingFetcher::from_settings(&settings)?);
    controller.set_view_state(args.view_state()).await;

    let disposition = match (&args.import, &args.input) {
        (Some(path), _) => {
            println!("📂 Importing UTXOs from {}", path);
            controller.replace_utxos(read_json_file(path)?).await
        }
        (None, Some(input)) => {
            println!("⏳ Fetching UTXOs from {}", settings.esplora_base_url);
            controller.load(input).await
        }
        (None, None) => {
            eprintln!("❌ Provide an address, address list, extended key, or --import <file>");
            std::process::exit(2);
        }
    };

    if let FetchDisposition::Failed(e) = &disposition {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let state = controller.snapshot().await;

    if !state.source_errors.is_empty() {
        println!("\n⚠️  {} source(s) failed:", state.source_errors.len());
        for (source, error) in &state.source_errors {
            println!("   {} - {}", shorten(source), error);
        }
    }

    println!("\n💰 Summary ({} filter):", state.view_state.status_filter);
    println!("   Total:       {} BTC ({} sats)", format_btc_amount(state.summary.total_sats), state.summary.total_sats);
    println!("   UTXOs:       {} of {}", state.summary.count, state.utxos.len());
    println!("   Confirmed:   {}", state.summary.confirmed_count);
    println!("   Unconfirmed: {}", state.summary.unconfirmed_count);

    println!("\n📋 UTXOs:");
    for utxo in &state.visible {
        let height = utxo
            .confirmation()
            .block_height
            .map(|h| h.to_string())
            .unwrap_or_else(|| "pending".to_string());
        println!(
            "   {}:{}  {} BTC  {}  {}",
            shorten(utxo.txid()),
            utxo.vout(),
            format_btc_amount(utxo.value_sats()),
            height,
            utxo.origin_address().map(shorten).unwrap_or_default()
        );
    }

    println!("\n🔍 Privacy analytics:");
    if state.analytics.is_empty() {
        println!("   No address reuse or common spends detected");
    }
    for line in &state.analytics.multi_utxo_addresses {
        println!("   {}", line);
    }
    for line in &state.analytics.common_spend_events {
        println!("   {}", line);
    }

    if let Some(path) = &args.json {
        write_json_file(path, &state.utxos)?;
        println!("\n✅ Wrote {} UTXOs to {}", state.utxos.len(), path);
    }
    if let Some(path) = &args.csv {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        write_csv_file(path, &state.visible, now)?;
        println!("\n✅ Wrote {} UTXOs to {}", state.visible.len(), path);
    }

    if args.metrics {
        println!("\n{}", gather_metrics());
    }

    Ok(())
}
