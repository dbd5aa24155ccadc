use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use fundme::ledger::{Address, Amount, NATIVE_SCALE};
use fundme::{Chain, ChainError, MockAggregator};

/// Local FundMe simulation: deploy the contract against a mock price
/// feed and drive it with a transaction transcript or a built-in demo.
#[derive(Parser)]
#[command(name = "fundme", version, about)]
struct Cli {
    /// Account that deploys the contract and becomes its owner.
    #[arg(long, default_value = "deployer", global = true)]
    owner: String,

    /// Initial feed answer (scaled to --decimals), default 2000 USD.
    #[arg(long, default_value_t = 200_000_000_000, global = true)]
    price: u128,

    /// Decimal precision of the feed answer.
    #[arg(long, default_value_t = 8, global = true)]
    decimals: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply a JSONL transcript of transactions and print the final
    /// contract snapshot.
    Run {
        transcript: PathBuf,
        /// Write the final snapshot to a file instead of stdout.
        #[arg(long)]
        snapshot_out: Option<PathBuf>,
    },
    /// Built-in scenario: five funders contribute, the owner withdraws.
    Demo {
        /// Number of distinct funding accounts.
        #[arg(long, default_value_t = 5)]
        funders: u32,
        /// Contribution per funder, in native minimal units.
        #[arg(long, default_value_t = NATIVE_SCALE)]
        value: Amount,
    },
}

/// One transcript line. `credit` and `update_answer` are host/feed
/// actions; the rest are contract calls.
#[derive(Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum TxRecord {
    Credit { account: Address, amount: Amount },
    Fund { from: Address, value: Amount },
    Send { from: Address, value: Amount },
    Withdraw { from: Address },
    CheaperWithdraw { from: Address },
    UpdateAnswer { answer: u128 },
}

fn main() {
    let cli = Cli::parse();
    let feed = MockAggregator::new(cli.decimals, cli.price);
    let mut chain = Chain::deploy(cli.owner.clone(), feed);

    match cli.command {
        Command::Run {
            transcript,
            snapshot_out,
        } => run_transcript(&mut chain, &transcript, snapshot_out.as_deref()),
        Command::Demo { funders, value } => demo(&mut chain, funders, value),
    }
}

fn run_transcript(
    chain: &mut Chain<MockAggregator>,
    transcript: &std::path::Path,
    snapshot_out: Option<&std::path::Path>,
) {
    let file = File::open(transcript).unwrap_or_else(|err| {
        eprintln!("error: cannot open {}: {err}", transcript.display());
        process::exit(2);
    });
    let reader = BufReader::new(file);

    let mut applied = 0usize;
    let mut reverted = 0usize;
    for (lineno, line) in reader.lines().enumerate() {
        let line = line.unwrap_or_else(|err| {
            eprintln!("error: read {}: {err}", transcript.display());
            process::exit(2);
        });
        if line.trim().is_empty() {
            continue;
        }
        let record: TxRecord = serde_json::from_str(&line).unwrap_or_else(|err| {
            eprintln!("error: line {}: {err}", lineno + 1);
            process::exit(2);
        });
        match apply(chain, record) {
            Ok(()) => applied += 1,
            Err(err) => {
                // a reverted transaction leaves state untouched; keep going
                eprintln!("tx {} reverted: {err}", lineno + 1);
                reverted += 1;
            }
        }
    }

    let snapshot = chain.snapshot();
    let json = serde_json::to_string_pretty(&snapshot).expect("snapshot json");
    match snapshot_out {
        Some(path) => {
            fs::write(path, &json).unwrap_or_else(|err| {
                eprintln!("error: write {}: {err}", path.display());
                process::exit(2);
            });
            println!(
                "applied {applied} tx, reverted {reverted} → {}",
                path.display()
            );
        }
        None => {
            eprintln!("applied {applied} tx, reverted {reverted}");
            println!("{json}");
        }
    }
}

fn apply(chain: &mut Chain<MockAggregator>, record: TxRecord) -> Result<(), ChainError> {
    match record {
        TxRecord::Credit { account, amount } => chain.credit(&account, amount),
        TxRecord::Fund { from, value } => chain.fund(&from, value),
        TxRecord::Send { from, value } => chain.send(&from, value),
        TxRecord::Withdraw { from } => chain.withdraw(&from).map(|_| ()),
        TxRecord::CheaperWithdraw { from } => chain.cheaper_withdraw(&from).map(|_| ()),
        TxRecord::UpdateAnswer { answer } => {
            chain.price_feed_mut().update_answer(answer);
            Ok(())
        }
    }
}

fn demo(chain: &mut Chain<MockAggregator>, funders: u32, value: Amount) {
    let owner = chain.contract().owner().clone();
    for idx in 0..funders {
        let account = format!("funder-{idx}");
        if let Err(err) = chain.credit(&account, value) {
            println!("{account} credit reverted: {err}");
            continue;
        }
        match chain.fund(&account, value) {
            Ok(()) => println!("{account} funded {value}"),
            Err(err) => println!("{account} reverted: {err}"),
        }
    }
    println!(
        "contract holds {} across {} funder entries",
        chain.contract().balance(),
        chain.contract().funder_count()
    );

    match chain.withdraw(&owner) {
        Ok(released) => println!("{owner} withdrew {released}"),
        Err(err) => println!("withdraw reverted: {err}"),
    }

    let json = serde_json::to_string_pretty(&chain.snapshot()).expect("snapshot json");
    println!("{json}");
}
