//! Voucher administration binary
//!
//! Small operator CLI over the ledger: provisioning, seller registry,
//! menu upkeep, listings, and report export. Reads its configuration
//! from the environment (`VOUCHER_DATA_DIR`, `VOUCHER_CODE_LENGTH`).

use anyhow::{bail, Context};
use chrono::NaiveDate;
use serde::Serialize;
use voucher_ledger::report::{
    self, SellerPerformance, TopMenuItem, TransactionSummary, VoucherSummary,
};
use voucher_ledger::{Config, SellerStatus, VoucherFilter, VoucherLedger, VoucherStatus};

#[derive(Serialize)]
struct FullReport {
    vouchers: VoucherSummary,
    transactions: TransactionSummary,
    top_menu: Vec<TopMenuItem>,
    sellers: Vec<SellerPerformance>,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(command) = args.get(1).map(String::as_str) else {
        print_usage();
        return Ok(());
    };

    if command == "help" || command == "--help" {
        print_usage();
        return Ok(());
    }

    let config = Config::from_env()?;
    let ledger = VoucherLedger::open(config).context("Failed to open the voucher store")?;

    match command {
        "provision" => {
            let count: usize = required(&args, 2, "count")?.parse()?;
            let value: i64 = required(&args, 3, "value")?.parse()?;
            let prefix = args.get(4).map(String::as_str).unwrap_or("");

            let created = ledger.provision_vouchers(count, value, prefix)?;
            for voucher in &created {
                println!("{}", voucher.code);
            }
            eprintln!("Provisioned {} vouchers of {}", created.len(), value);
        }
        "create" => {
            let code = required(&args, 2, "code")?;
            let value: i64 = required(&args, 3, "value")?.parse()?;

            let voucher = ledger.create_voucher(code, value)?;
            println!("{}", voucher.code);
        }
        "assign" => {
            let code = required(&args, 2, "code")?;
            let seller = required(&args, 3, "seller")?;
            let sale_date = parse_date(required(&args, 4, "sale date")?)?;

            if !ledger.repository().assign_seller(code, seller, sale_date) {
                bail!("Assignment failed; see log output");
            }
            println!("Assigned {} to {}", code, seller);
        }
        "activate" => {
            let code = required(&args, 2, "code")?;
            let nama = args.get(3).map(String::as_str).unwrap_or("");
            let no_hp = args.get(4).map(String::as_str).unwrap_or("");

            if !ledger
                .repository()
                .update_voucher_detail(code, nama, no_hp, VoucherStatus::Active)
            {
                bail!("Activation failed; see log output");
            }
            println!("Activated {}", code);
        }
        "menu-add" => {
            let kategori = required(&args, 2, "category")?;
            let nama = required(&args, 3, "name")?;
            let harga_sedati = parse_price(required(&args, 4, "sedati price")?)?;
            let harga_twsari = parse_price(required(&args, 5, "twsari price")?)?;

            ledger.repository().upsert_menu_item(
                kategori,
                nama,
                args.get(6).map(String::as_str),
                harga_sedati,
                harga_twsari,
            )?;
            println!("Menu item {} saved", nama);
        }
        "seller" => match required(&args, 2, "seller action")? {
            "register" => {
                let nama = required(&args, 3, "name")?;
                let no_hp = required(&args, 4, "phone")?;
                let seller = ledger.repository().register_seller(nama, no_hp)?;
                println!("Registered {} ({})", seller.nama_seller, seller.status.code());
            }
            "accept" => {
                let nama = required(&args, 3, "name")?;
                ledger.repository().accept_seller(nama)?;
                println!("Accepted {}", nama);
            }
            "remove" => {
                let nama = required(&args, 3, "name")?;
                ledger.repository().remove_seller(nama)?;
                println!("Removed {}", nama);
            }
            "list" => {
                let status = match args.get(3).map(String::as_str) {
                    Some("pending") => Some(SellerStatus::Pending),
                    Some("accepted") => Some(SellerStatus::Accepted),
                    Some(other) => bail!("Unknown seller status: {}", other),
                    None => None,
                };
                for seller in ledger.repository().list_sellers(status)? {
                    println!(
                        "{}\t{}\t{}",
                        seller.nama_seller,
                        seller.no_hp,
                        seller.status.code()
                    );
                }
            }
            other => bail!("Unknown seller action: {}", other),
        },
        "list" => {
            let filter = match args.get(2).map(String::as_str) {
                Some("active") => VoucherFilter::ActiveOnly,
                Some("zero") => VoucherFilter::ZeroBalanceOnly,
                Some("any") | None => VoucherFilter::Any,
                Some(other) => bail!("Unknown filter: {} (use any|active|zero)", other),
            };
            let search = args.get(3).map(String::as_str);

            let total = ledger.repository().count_vouchers(filter, search)?;
            for voucher in ledger.repository().list_vouchers(filter, search, 50, 0)? {
                println!(
                    "{}\t{}\t{}\t{}",
                    voucher.code,
                    voucher.balance,
                    voucher.status.code(),
                    voucher.seller.as_deref().unwrap_or("-")
                );
            }
            eprintln!("{} matching vouchers", total);
        }
        "report" => {
            let repo = ledger.repository();
            let full = FullReport {
                vouchers: report::voucher_summary(repo)?,
                transactions: report::transaction_summary(repo)?,
                top_menu: report::top_menu_items(repo, None, 10)?,
                sellers: report::seller_summary(repo)?,
            };
            println!("{}", serde_json::to_string_pretty(&full)?);
        }
        "export" => match required(&args, 2, "export kind")? {
            "vouchers" => print!("{}", report::vouchers_csv(ledger.repository())?),
            "transactions" => print!("{}", report::transactions_csv(ledger.repository())?),
            other => bail!("Unknown export kind: {} (use vouchers|transactions)", other),
        },
        "stats" => {
            let stats = ledger.stats()?;
            println!("vouchers      ~{}", stats.total_vouchers);
            println!("transactions  ~{}", stats.total_transactions);
            println!("menu items    ~{}", stats.total_menu_items);
            println!("sellers       ~{}", stats.total_sellers);
        }
        other => {
            print_usage();
            bail!("Unknown command: {}", other);
        }
    }

    Ok(())
}

fn required<'a>(args: &'a [String], index: usize, what: &str) -> anyhow::Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .with_context(|| format!("Missing argument: {}", what))
}

fn parse_date(value: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid date (expected YYYY-MM-DD): {}", value))
}

/// A lone `-` means the item is not sold at that branch
fn parse_price(value: &str) -> anyhow::Result<Option<i64>> {
    if value == "-" {
        return Ok(None);
    }
    let price = value
        .parse()
        .with_context(|| format!("Invalid price: {}", value))?;
    Ok(Some(price))
}

fn print_usage() {
    eprintln!("Usage: voucher-admin <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  provision <count> <value> [prefix]          Create vouchers with random codes");
    eprintln!("  create <code> <value>                       Create one voucher with a fixed code");
    eprintln!("  assign <code> <seller> <YYYY-MM-DD>         Assign a seller and sale date");
    eprintln!("  activate <code> [nama] [no_hp]              Set buyer detail and mark active");
    eprintln!("  menu-add <kategori> <nama> <sedati> <twsari> [keterangan]");
    eprintln!("                                              Upsert a menu item ('-' = no price)");
    eprintln!("  seller register <nama> <no_hp>              Register a seller (pending)");
    eprintln!("  seller accept <nama>                        Accept a pending seller");
    eprintln!("  seller remove <nama>                        Remove a seller");
    eprintln!("  seller list [pending|accepted]              List sellers");
    eprintln!("  list [any|active|zero] [search]             List vouchers (first 50)");
    eprintln!("  report                                      Print summaries as JSON");
    eprintln!("  export vouchers|transactions                Print CSV to stdout");
    eprintln!("  stats                                       Approximate store statistics");
}
