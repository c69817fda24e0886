// skyhistory: maintenance tool for the history index
//
// Opens the database named by SKYHISTORY_DATA_DIR (default ~/.skyhistory/mainnet)
// Usage: skyhistory <command> [args...]

use std::env;
use std::sync::atomic::AtomicBool;

use colored::*;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

use skyhistory::config::DbConfig;
use skyhistory::crypto::{Address, Hash};
use skyhistory::history::{HistoryDb, TxRecord, UxRecord, verify_codec};

fn print_usage() {
    println!("{}", "  Usage: skyhistory <command> [args...]".bright_yellow().bold());
    println!();
    println!("{}", "  Commands:".bright_white().bold());
    let commands = [
        ("status", "Parsed height, chain head and bucket sizes"),
        ("verify", "Cross-check every record with both codecs"),
        ("reset", "Erase the history buckets"),
        ("txn <hash>", "Show an indexed transaction"),
        ("address <addr>", "Show transactions and outputs of an address"),
    ];
    for (cmd, about) in commands {
        println!("  {} {:<20} {}", "❯".bright_black(), cmd.bright_green(), about.white());
    }
    println!();
    println!(
        "  {} {}",
        "Environment:".bright_white().bold(),
        "SKYHISTORY_DATA_DIR, SKYHISTORY_SYNC, RUST_LOG".white()
    );
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", "error:".bright_red().bold(), msg);
    std::process::exit(1);
}

fn txn_json(rec: &TxRecord) -> Value {
    json!({
        "txid": rec.hash().to_string(),
        "block_seq": rec.block_seq,
        "inner_hash": rec.txn.inner_hash.to_string(),
        "type": rec.txn.tx_type,
        "length": rec.txn.length,
        "sigs": rec.txn.sigs.len(),
        "inputs": rec.txn.inputs.iter().map(Hash::to_string).collect::<Vec<_>>(),
        "outputs": rec.txn.outputs.iter().map(|o| json!({
            "address": o.address.to_string(),
            "coins": o.coins,
            "hours": o.hours,
        })).collect::<Vec<_>>(),
    })
}

fn ux_json(rec: &UxRecord) -> Value {
    json!({
        "uxid": rec.hash().to_string(),
        "time": rec.out.head.time,
        "block_seq": rec.out.head.bk_seq,
        "src_tx": rec.out.body.src_transaction.to_string(),
        "address": rec.out.body.address.to_string(),
        "coins": rec.out.body.coins,
        "hours": rec.out.body.hours,
        "spent_tx": rec.spent.map(|s| s.txid.to_string()),
        "spent_block_seq": rec.spent.map(|s| s.block_seq),
    })
}

fn print_json(v: &Value) {
    match serde_json::to_string_pretty(v) {
        Ok(s) => println!("{}", s.bright_white()),
        Err(e) => fail(e),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        return;
    }

    let config = DbConfig::from_env();
    let db = match HistoryDb::open(&config) {
        Ok(db) => db,
        Err(e) => fail(format_args!("cannot open {}: {e}", config.path.display())),
    };

    let result = match args[1].as_str() {
        "status" => status(&db),
        "verify" => verify(&db),
        "reset" => reset(&db),
        "txn" => match args.get(2) {
            Some(h) => txn(&db, h),
            None => fail("usage: skyhistory txn <hash>"),
        },
        "address" => match args.get(2) {
            Some(a) => address(&db, a),
            None => fail("usage: skyhistory address <addr>"),
        },
        other => {
            eprintln!("{} unknown command {}", "error:".bright_red().bold(), other.bold());
            print_usage();
            std::process::exit(2);
        }
    };

    if let Err(e) = result {
        fail(e);
    }
}

fn status(db: &HistoryDb) -> skyhistory::Result<()> {
    let buckets: serde_json::Map<String, Value> = db
        .bucket_counts()?
        .into_iter()
        .map(|(name, n)| (name.to_string(), json!(n)))
        .collect();
    let needs_reset = db.store().view(|tx| db.needs_reset(tx))?;
    print_json(&json!({
        "parsed_height": db.parsed_height()?,
        "head_seq": db.head_seq()?,
        "needs_reset": needs_reset,
        "buckets": buckets,
    }));
    Ok(())
}

fn verify(db: &HistoryDb) -> skyhistory::Result<()> {
    let report = verify_codec(db.store(), &AtomicBool::new(false))?;
    for (bucket, n) in &report.buckets {
        println!("  {} {:<16} {}", "✔".bright_green(), bucket, n);
    }
    println!(
        "{} {} records verified",
        "[verify]".bright_green().bold(),
        report.total()
    );
    Ok(())
}

fn reset(db: &HistoryDb) -> skyhistory::Result<()> {
    db.erase()?;
    println!(
        "{} history erased; it is rebuilt on the next catch-up",
        "[reset]".bright_yellow().bold()
    );
    Ok(())
}

fn txn(db: &HistoryDb, arg: &str) -> skyhistory::Result<()> {
    let hash: Hash = arg
        .parse()
        .unwrap_or_else(|_| fail(format_args!("invalid transaction hash {arg}")));
    match db.transaction(&hash)? {
        Some(rec) => print_json(&txn_json(&rec)),
        None => fail(format_args!("transaction {hash} not found")),
    }
    Ok(())
}

fn address(db: &HistoryDb, arg: &str) -> skyhistory::Result<()> {
    let addr: Address = arg.parse()?;
    let txns = db.address_transactions(&addr)?;
    let uxouts = db.address_uxouts(&addr)?;
    let unspent: u64 = uxouts
        .iter()
        .filter(|u| !u.is_spent())
        .map(|u| u.out.body.coins)
        .sum();
    print_json(&json!({
        "address": addr.to_string(),
        "unspent_coins": unspent,
        "transactions": txns.iter().map(txn_json).collect::<Vec<_>>(),
        "uxouts": uxouts.iter().map(ux_json).collect::<Vec<_>>(),
    }));
    Ok(())
}
