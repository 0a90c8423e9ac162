#![warn(clippy::all, clippy::pedantic)]
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::path::{Path, PathBuf};

use clap::Parser;
use csv::Writer;
use num_bigint::BigUint;
use serde::Deserialize;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use trustflow::{
    BalanceFraction, RawTrustRecord, Router, ShortestAugmenting, Transaction, TransferRequest,
    TrustAdapter,
};

/// Route a transitive transfer through a trust network snapshot.
#[derive(Parser)]
#[command(name = "trustflow-cli", version, about)]
struct Args {
    /// CSV file of trust records: truster,trustee,limit_percentage
    #[arg(long)]
    trust: PathBuf,
    /// CSV file of balances: holder,currency_owner,balance
    #[arg(long)]
    balances: PathBuf,
    /// Sending account
    #[arg(long)]
    from: String,
    /// Receiving account
    #[arg(long)]
    to: String,
    /// Transfer value
    #[arg(long)]
    value: BigUint,
    /// Maximum hops explored around either endpoint
    #[arg(long, default_value_t = 3)]
    hops: u32,
    /// Output CSV file for the transfer plan
    #[arg(long)]
    output: PathBuf,
    /// Log verbosity
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Debug, Deserialize)]
struct BalanceRow {
    holder: String,
    currency_owner: String,
    balance: String,
}

/// Snapshot of the trust registry loaded from CSV files.
struct CsvLedger {
    records: Vec<RawTrustRecord<String>>,
    balances: BTreeMap<(String, String), BigUint>,
}

impl CsvLedger {
    fn load(trust: &Path, balances: &Path) -> Result<Self, Box<dyn Error>> {
        let mut rdr = csv::Reader::from_path(trust)?;
        let records = rdr.deserialize().collect::<Result<Vec<_>, _>>()?;

        let mut rdr = csv::Reader::from_path(balances)?;
        let balances = rdr
            .deserialize()
            .map(|row| -> Result<((String, String), BigUint), Box<dyn Error>> {
                let row: BalanceRow = row?;
                let balance = row.balance.parse::<BigUint>()?;
                Ok(((row.holder, row.currency_owner), balance))
            })
            .collect::<Result<BTreeMap<_, _>, Box<dyn Error>>>()?;

        Ok(Self { records, balances })
    }
}

impl TrustAdapter for CsvLedger {
    type AccountId = String;
    type Amount = BigUint;
    type Error = String;

    /// Undirected neighbourhood cut of the loaded snapshot: only records
    /// whose endpoints both lie within `hop_bound` hops of `node` are
    /// returned.
    fn trust_edges(
        &self,
        node: &Self::AccountId,
        hop_bound: u32,
    ) -> Result<Vec<RawTrustRecord<Self::AccountId>>, Self::Error> {
        let mut known = BTreeSet::from([node.clone()]);
        let mut frontier = known.clone();
        for _ in 0..hop_bound {
            let mut next = BTreeSet::new();
            for record in &self.records {
                if frontier.contains(&record.truster) {
                    next.insert(record.trustee.clone());
                }
                if frontier.contains(&record.trustee) {
                    next.insert(record.truster.clone());
                }
            }
            frontier = next.difference(&known).cloned().collect();
            known.extend(frontier.iter().cloned());
        }

        Ok(self
            .records
            .iter()
            .filter(|r| known.contains(&r.truster) && known.contains(&r.trustee))
            .cloned()
            .collect())
    }

    fn balance(
        &self,
        holder: &Self::AccountId,
        currency_owner: &Self::AccountId,
    ) -> Result<Self::Amount, Self::Error> {
        // an account without a recorded balance simply holds nothing
        Ok(self
            .balances
            .get(&(holder.clone(), currency_owner.clone()))
            .cloned()
            .unwrap_or_default())
    }
}

// Function to write the transfer plan
fn write_plan_csv(
    plan: &[Transaction<String, BigUint>],
    filepath: &Path,
) -> Result<(), Box<dyn Error>> {
    let mut wtr = Writer::from_path(filepath)?;
    wtr.write_record(["from", "to", "value", "currency_owner"])?;
    for tx in plan {
        let value = tx.value.to_string();
        wtr.write_record([
            tx.from.as_str(),
            tx.to.as_str(),
            value.as_str(),
            tx.currency_owner.as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    TermLogger::init(
        args.log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    let ledger = CsvLedger::load(&args.trust, &args.balances)?;
    let router = Router::new(ledger, BalanceFraction, ShortestAugmenting::default());

    let plan = router.route(&TransferRequest {
        from: args.from,
        to: args.to,
        value: args.value,
        hop_bound: args.hops,
    })?;

    write_plan_csv(&plan, &args.output)
}
