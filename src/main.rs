use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use std::env;
use std::path::PathBuf;

mod error;
mod fetch;
mod firestore;
mod logging;
mod resize;
mod utils;

use firestore::{FirestoreClient, StoreConfig};
use resize::ResizeMode;
use utils::files::{expand_output_dir, resolve_folder};
use utils::http::build_client;

/// Download card artwork from Firestore and build resized copies of it
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Increase diagnostic output (-v, -vv, -vvv); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download the image of every card document in a Firestore collection
    Fetch {
        /// Firestore collection that stores card documents
        #[arg(long, default_value = "cards")]
        collection: String,

        /// Directory to save downloaded images (`~` is expanded)
        #[arg(long, default_value = "downloads/cards")]
        output: String,

        /// Service account key file; application default credentials otherwise
        #[arg(long)]
        cred: Option<PathBuf>,

        /// Google Cloud project id (defaults to the one in the credentials)
        #[arg(long, env = "GOOGLE_CLOUD_PROJECT")]
        project: Option<String>,
    },
    /// Resize PNG originals into 1024/512/256 folders and/or remove the copies
    Resize {
        /// Folder with the PNG originals
        folder: PathBuf,

        /// resize: create variants; cleanup: delete variants; both: resize, then cleanup
        #[arg(long, value_enum, default_value_t = ResizeMode::Resize)]
        mode: ResizeMode,

        /// Cleanup only: list what would be deleted without deleting anything
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_logging(args.verbose);

    match args.command {
        Commands::Fetch {
            collection,
            output,
            cred,
            project,
        } => {
            let output_dir = expand_output_dir(&output);
            let http = build_client()?;

            let config = StoreConfig {
                project_id: project.or_else(|| non_empty_env("GCLOUD_PROJECT")),
                credentials_path: cred,
                emulator_host: non_empty_env("FIRESTORE_EMULATOR_HOST"),
            };
            let store = FirestoreClient::connect(http.clone(), &config)
                .await
                .context("Failed to connect to Firestore")?;

            fetch::download_cards(&store, &http, &collection, &output_dir)
                .await
                .with_context(|| format!("Failed to download cards from '{}'", collection))?;
        }
        Commands::Resize {
            folder,
            mode,
            dry_run,
        } => {
            let folder = resolve_folder(&folder)?;
            resize::run(&folder, mode, dry_run)
                .with_context(|| format!("Failed to process {}", folder.display()))?;
        }
    }

    Ok(())
}
