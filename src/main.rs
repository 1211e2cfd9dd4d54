// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
#[cfg(feature = "tui")]
use std::sync::Arc;

use power_play::reference::{find_chex_dispute, CHEX_DISPUTE_TYPES, CONSUMER_LAWS, DISPUTE_LIBRARY};
use power_play::{
    scanner_from_config, AppConfig, AppState, EntryKind, Finding, LetterOutcome, Plan,
    RuleEngine, ScanStage, SqliteStore, StubCheckout,
};

const USAGE: &str = "\
Usage: power-play [command]

Commands:
  (none) | ui [image]              Launch the terminal UI (optionally scanning an image first)
  scan <image> [--letters <dir>]   OCR a report and list findings; optionally write dispute PDFs
  classify <text-file>             Run the violation rules on already-extracted text
  ledger [list]                    Show ledger entries and totals
  ledger add <amount> <kind>       Add an income/expense entry
  ledger rm <id>                   Remove an entry
  ledger export <path>             Write the ledger as CSV
  premium [status|toggle]          Show or flip the PRO entitlement
  checkout <monthly|one-time>      Start a checkout for a plan
  laws                             Consumer rights reference
  chex [id]                        ChexSystems dispute forms
  help                             Show this message";

#[tokio::main]
async fn main() -> Result<()> {
    power_play::init_tracing("power_play=info");

    let args: Vec<String> = env::args().skip(1).collect();
    let config = AppConfig::from_env();

    match args.first().map(String::as_str) {
        None => run_ui_mode(&config, None).await,
        Some("ui") => run_ui_mode(&config, args.get(1).map(PathBuf::from)).await,
        Some("scan") => run_scan(&config, &args[1..]).await,
        Some("classify") => run_classify(&args[1..]),
        Some("ledger") => run_ledger(&config, &args[1..]),
        Some("premium") => run_premium(&config, &args[1..]),
        Some("checkout") => run_checkout(&config, &args[1..]),
        Some("laws") => {
            print_laws();
            Ok(())
        }
        Some("chex") => print_chex(&config, args.get(1).map(String::as_str)),
        Some("help") | Some("--help") | Some("-h") => {
            println!("{}", USAGE);
            Ok(())
        }
        Some(other) => {
            eprintln!("❌ Unknown command: {}\n", other);
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }
}

fn open_state(config: &AppConfig) -> Result<AppState> {
    let store = SqliteStore::open(&config.db_path)?;
    AppState::load(Box::new(store))
}

// ============================================================================
// SCAN
// ============================================================================

async fn run_scan(config: &AppConfig, args: &[String]) -> Result<()> {
    let image_path = match args.first() {
        Some(path) => Path::new(path),
        None => bail!("scan needs an image path"),
    };
    let letters_dir = flag_value(args, "--letters").map(PathBuf::from);

    let image = fs::read(image_path)
        .with_context(|| format!("Failed to read image: {:?}", image_path))?;

    let scanner = scanner_from_config(config).with_stage_listener(print_stage);

    let findings = match scanner.scan(&image).await {
        Ok(findings) => findings,
        Err(e) => {
            eprintln!("❌ {}", e.user_notice());
            std::process::exit(1);
        }
    };

    print_findings(&findings);

    if let Some(dir) = letters_dir {
        let state = open_state(config)?;
        write_letters(&state, &findings, &dir)?;
    }

    Ok(())
}

fn print_stage(stage: ScanStage) {
    match stage {
        ScanStage::RunningOcr => println!("📷 {}", stage.status_message()),
        ScanStage::Analyzing => println!("🔍 {}", stage.status_message()),
        ScanStage::Idle => {}
    }
}

fn run_classify(args: &[String]) -> Result<()> {
    let path = match args.first() {
        Some(path) => Path::new(path),
        None => bail!("classify needs a text file"),
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read text file: {:?}", path))?;

    print_findings(&RuleEngine::builtin().classify(&text));
    Ok(())
}

fn print_findings(findings: &[Finding]) {
    println!("\n🔎 {} finding(s)", findings.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for (i, finding) in findings.iter().enumerate() {
        println!("{}. {}  [{}]", i + 1, finding.title, finding.code);
        println!("   {}", finding.text);
    }
}

fn write_letters(state: &AppState, findings: &[Finding], dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;

    for finding in findings {
        match state.draft_letter_today(finding) {
            LetterOutcome::Ready(letter) => {
                let path = dir.join(&letter.file_name);
                fs::write(&path, letter.to_pdf()?)
                    .with_context(|| format!("Failed to write {:?}", path))?;
                println!("✓ Wrote {}", path.display());
            }
            LetterOutcome::UpgradeRequired => {
                println!("\n👑 PDF drafting is a PRO feature. Run `power-play checkout monthly` to upgrade.");
                return Ok(());
            }
        }
    }

    Ok(())
}

// ============================================================================
// LEDGER
// ============================================================================

fn run_ledger(config: &AppConfig, args: &[String]) -> Result<()> {
    let mut state = open_state(config)?;

    match args.first().map(String::as_str) {
        None | Some("list") => {}
        Some("add") => {
            let (amount, kind) = match (args.get(1), args.get(2).and_then(|k| EntryKind::parse(k))) {
                (Some(amount), Some(kind)) => (amount, kind),
                _ => bail!("usage: ledger add <amount> <income|expense>"),
            };
            match state.add_entry_str(amount, kind) {
                Some(id) => println!("✓ Added {} {} (id {})", kind.as_str(), amount, id),
                None => println!("Amount must be a positive number; nothing added."),
            }
        }
        Some("rm") => {
            let id: i64 = match args.get(1).and_then(|id| id.parse().ok()) {
                Some(id) => id,
                None => bail!("usage: ledger rm <id>"),
            };
            if state.remove_entry(id) {
                println!("✓ Removed {}", id);
            } else {
                println!("No entry with id {}", id);
            }
        }
        Some("export") => {
            let path = match args.get(1) {
                Some(path) => Path::new(path),
                None => bail!("usage: ledger export <path>"),
            };
            let file = fs::File::create(path)
                .with_context(|| format!("Failed to create {:?}", path))?;
            state.ledger().export_csv(file)?;
            println!("✓ Exported {} entries to {}", state.ledger().len(), path.display());
            return Ok(());
        }
        Some(other) => bail!("unknown ledger command: {}", other),
    }

    if let Some(err) = state.last_persist_error() {
        eprintln!("⚠️  Changes kept in memory only: {}", err);
    }

    print_ledger(&state);
    Ok(())
}

fn print_ledger(state: &AppState) {
    let totals = state.aggregates();

    println!("\n💰 Budget Master");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for entry in state.ledger().entries() {
        println!(
            "{:>15}  {:<8} {:<8} {}{:.2}",
            entry.id,
            entry.category,
            entry.kind.as_str(),
            entry.kind.sign(),
            entry.amount
        );
    }
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Income:   {:>10.2}", totals.income);
    println!("Expenses: {:>10.2}", totals.expenses);
    println!("Surplus:  {:>10.2}", totals.surplus);
}

// ============================================================================
// ENTITLEMENT
// ============================================================================

fn run_premium(config: &AppConfig, args: &[String]) -> Result<()> {
    let mut state = open_state(config)?;

    if args.first().map(String::as_str) == Some("toggle") {
        state.toggle_premium();
    }

    if state.is_premium() {
        println!("👑 PRO UNLOCKED - Active Subscription");
    } else {
        println!("UPGRADE TO PRO - Full AI Legal Access");
    }
    Ok(())
}

fn run_checkout(config: &AppConfig, args: &[String]) -> Result<()> {
    let plan = match args.first().and_then(|p| Plan::parse(p)) {
        Some(plan) => plan,
        None => bail!("usage: checkout <monthly|one-time>"),
    };

    println!("{} plan - {}", plan.name(), plan.price_label());
    for feature in plan.features() {
        println!("  ✓ {}", feature);
    }

    let backend = StubCheckout::new(
        &config.checkout.monthly_price_id,
        &config.checkout.one_time_price_id,
    );

    match backend.checkout(plan) {
        Ok(purchase) => {
            let mut state = open_state(config)?;
            state.set_premium(true);
            println!("✅ Purchase complete ({})", purchase.reference);
        }
        Err(e) => println!("\n{}", e),
    }
    Ok(())
}

// ============================================================================
// REFERENCE
// ============================================================================

fn print_laws() {
    println!("📚 Dispute Library");
    for item in DISPUTE_LIBRARY {
        println!("  • {} - Target: {}", item.title, item.target);
    }

    println!("\n⚖️  Consumer Rights Reference");
    for law in CONSUMER_LAWS {
        println!("\n{} ({})", law.title, law.code);
        println!("  {}", law.description);
        for right in law.rights {
            println!("  • {}", right);
        }
    }
}

fn print_chex(config: &AppConfig, id: Option<&str>) -> Result<()> {
    let state = open_state(config)?;

    let disputes: Vec<_> = match id {
        Some(id) => match find_chex_dispute(id) {
            Some(dispute) => vec![dispute],
            None => bail!("unknown dispute type: {}", id),
        },
        None => CHEX_DISPUTE_TYPES.iter().collect(),
    };

    println!("🏦 ChexSystems Dispute Forms");
    for dispute in disputes {
        println!("\n{} [{}]", dispute.title, dispute.id);
        println!("  {}", dispute.description);
        println!("  {}", dispute.form_blurb());
    }

    if !state.is_premium() {
        println!("\n👑 Upgrade to access the dispute forms: `power-play checkout monthly`");
    }
    Ok(())
}

// ============================================================================
// UI
// ============================================================================

#[cfg(feature = "tui")]
async fn run_ui_mode(config: &AppConfig, image: Option<PathBuf>) -> Result<()> {
    let state = open_state(config)?;
    let scanner = Arc::new(scanner_from_config(config));
    let checkout = StubCheckout::new(
        &config.checkout.monthly_price_id,
        &config.checkout.one_time_price_id,
    );

    let mut app = ui::App::new(state, scanner, checkout);
    if let Some(path) = image {
        app.start_scan_file(&path);
    }
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");
    Ok(())
}

#[cfg(not(feature = "tui"))]
async fn run_ui_mode(_config: &AppConfig, _image: Option<PathBuf>) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the command line: power-play help");
    std::process::exit(1);
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}
