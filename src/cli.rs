use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sunalert")]
#[command(about = "UV index checks with a synced history", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Mirror pending history records and list the history (default)
    Sync,

    /// Fetch the current UV index for a location and record it
    Check {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lng: f64,

        /// Human-readable place name stored with the record
        #[arg(long, default_value = "")]
        address: String,
    },

    /// List the local history, newest first
    History,

    /// Attach a photo to a history record
    Attach {
        id: i64,

        /// Local path or file:// URI of the photo
        photo: String,
    },

    /// Delete one history record
    Delete { id: i64 },

    /// Delete the whole local history (the mirror keeps its copies)
    Clear,
}
