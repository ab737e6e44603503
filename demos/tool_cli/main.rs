//! A small command-line front end over Tool Mode, for exercising a
//! database directory without a directory-server front end attached.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ldif_backend::{Dn, Entry, LineSerializer, ToolSession};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ldif-tool", about = "Inspect and load a filesystem-mirrored directory database")]
struct Cli {
    /// Base directory the database mirrors its suffix under.
    #[arg(long)]
    directory: PathBuf,

    /// The suffix this database is responsible for, e.g. "dc=example,dc=com".
    #[arg(long)]
    suffix: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every entry's DN, depth-first in sibling order.
    Dump,
    /// Add one entry with the given attribute (`name=value`) pairs.
    Put {
        dn: String,
        #[arg(value_parser = parse_attr)]
        attrs: Vec<(String, String)>,
    },
}

fn parse_attr(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .ok_or_else(|| format!("expected name=value, got {s:?}"))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let suffix = Dn::parse(&cli.suffix);
    let serializer = LineSerializer;

    let mut session = ToolSession::open(suffix, cli.directory.clone(), &serializer)
        .unwrap_or_else(|e| panic!("failed to open {}: {e}", cli.directory.display()));

    match cli.command {
        Command::Dump => {
            let mut cursor = session.first().map(|e| e.dn().to_string());
            while let Some(dn) = cursor {
                println!("{dn}");
                cursor = session.next().map(|e| e.dn().to_string());
            }
        }
        Command::Put { dn, attrs } => {
            let mut entry = Entry::new(Dn::parse(&dn));
            for (name, value) in attrs {
                entry.add_values(&name, vec![value]);
            }
            session.put(&entry).unwrap_or_else(|e| panic!("put failed: {e}"));
            info!(%dn, "entry written");
        }
    }
}
