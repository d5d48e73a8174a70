//! imgstore CLI
//!
//! Thin command-line surface over the store: each subcommand maps onto one
//! engine call and any engine error becomes a one-line message plus a
//! non-zero exit code.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use imgstore::meta::parse_type;
use imgstore::{Color, Meta, Store, StoreError};

/// Embedded image store
#[derive(Parser, Debug)]
#[command(name = "imgstore", version)]
struct Args {
    /// Root directory of the store
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List stored keys with their shape and type
    List,

    /// Show the shape and type of one key
    Get {
        /// The key to inspect
        key: String,
    },

    /// Create a zero-filled image under a key
    Set {
        key: String,
        width: u64,
        height: u64,
        /// Color name, e.g. rgb, rgba, gray
        color: String,
        /// Scalar type name, e.g. u8, u16, f32, half
        r#type: String,
    },

    /// Remove a key
    Remove {
        key: String,
    },

    /// Import a raw payload file under a key
    Import {
        key: String,
        /// File holding exactly width*height*channels*(bits/8) bytes
        path: PathBuf,
        width: u64,
        height: u64,
        color: String,
        r#type: String,

        /// Overwrite an existing key
        #[arg(long)]
        force: bool,
    },

    /// Export a key's raw payload to a file
    Export {
        key: String,
        path: PathBuf,
    },
}

fn parse_meta(width: u64, height: u64, color: &str, ty: &str) -> Result<Meta, String> {
    let color: Color = color.parse()?;
    let (kind, bits) = parse_type(ty).ok_or_else(|| format!("unknown type: {ty}"))?;
    Meta::new(width, height, color, kind, bits).map_err(|e| e.to_string())
}

fn describe(key: &str, meta: &Meta) -> String {
    format!(
        "{key}\t{}x{}\t{}\t{}",
        meta.width,
        meta.height,
        meta.color,
        meta.type_name()
    )
}

fn run(args: Args) -> Result<(), String> {
    let store = Store::open_path(&args.root).map_err(|e| e.to_string())?;

    match args.command {
        Commands::List => {
            for (key, handle) in store.iter().map_err(|e| e.to_string())? {
                println!("{}", describe(&key, handle.meta()));
            }
        }

        Commands::Get { key } => {
            let handle = store.get(&key, false).map_err(|e| e.to_string())?;
            println!("{}", describe(&key, handle.meta()));
        }

        Commands::Set {
            key,
            width,
            height,
            color,
            r#type,
        } => {
            let meta = parse_meta(width, height, &color, &r#type)?;
            store.set(&key, &meta, None).map_err(|e| e.to_string())?;
            println!("OK");
        }

        Commands::Remove { key } => {
            store.remove(&key).map_err(|e| e.to_string())?;
            println!("OK");
        }

        Commands::Import {
            key,
            path,
            width,
            height,
            color,
            r#type,
            force,
        } => {
            let meta = parse_meta(width, height, &color, &r#type)?;
            if store.has_key(&key) && !force {
                return Err(StoreError::FileAlreadyExists(store.root().join(&key)).to_string());
            }
            let data = std::fs::read(&path).map_err(|e| e.to_string())?;
            if data.len() != meta.total_bytes() {
                return Err(format!(
                    "payload is {} bytes, metadata wants {}",
                    data.len(),
                    meta.total_bytes()
                ));
            }
            store
                .set(&key, &meta, Some(&data))
                .map_err(|e| e.to_string())?;
            println!("OK");
        }

        Commands::Export { key, path } => {
            let handle = store.get(&key, false).map_err(|e| e.to_string())?;
            std::fs::write(&path, handle.payload()).map_err(|e| e.to_string())?;
            println!("OK");
        }
    }

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(message) = run(args) {
        eprintln!("Error: {message}");
        process::exit(1);
    }
}
