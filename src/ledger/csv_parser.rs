use crate::ladder::RateLadder;
use crate::ledger::AssetLedgerEntry;
use crate::params::PRICE_DECIMALS;
use serde::Deserialize;
use std::error::Error;
use std::fs::File;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct CsvAsset {
    symbol: String,
    base_price: String,
    vip_loan_tiers: String,
    margin_tiers: String,
    portfolio_margin_tiers: String,
}

/// Reads a ledger snapshot of listed assets. Totals start at zero.
pub fn parse_csv_to_ledger<P: AsRef<Path>>(path: P) -> Result<Vec<AssetLedgerEntry>, Box<dyn Error>> {
    let mut ledger = Vec::new();
    let file = File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';') // tier strings use commas
        .from_reader(file);

    for result in rdr.deserialize() {
        let record: CsvAsset = result?;

        let base_price = parse_fixed_point(&record.base_price, PRICE_DECIMALS)
            .ok_or_else(|| format!("invalid base price for {}", record.symbol))?;

        let ladders = [
            RateLadder::parse(&record.vip_loan_tiers)?,
            RateLadder::parse(&record.margin_tiers)?,
            RateLadder::parse(&record.portfolio_margin_tiers)?,
        ];

        ledger.push(AssetLedgerEntry::new(record.symbol, base_price, ladders));
    }

    Ok(ledger)
}

/// Parses a decimal string keeping `decimals` fractional digits, extra digits are truncated
fn parse_fixed_point(value: &str, decimals: usize) -> Option<u64> {
    let (integer, fraction) = value.trim().split_once('.').unwrap_or((value.trim(), ""));

    let mut fraction: String = fraction.chars().take(decimals).collect();
    while fraction.len() < decimals {
        fraction.push('0');
    }

    let integer: u64 = if integer.is_empty() { 0 } else { integer.parse().ok()? };
    let fraction: u64 = if fraction.is_empty() { 0 } else { fraction.parse().ok()? };

    integer
        .checked_mul(10u64.checked_pow(decimals as u32)?)?
        .checked_add(fraction)
}
