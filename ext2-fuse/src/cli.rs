use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
pub struct Cli {
    /// Disk image
    pub image: PathBuf,

    /// Volume to operate on, e.g. `disk0`; defaults to the first one
    #[arg(long, short = 'V')]
    pub volume: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the volumes found on the image
    Parts,

    /// Write a new partition table
    Mkpart {
        /// Partition sizes, interpreted according to `--unit`
        ///
        /// Without sizes a single partition covers the whole disk.
        sizes: Vec<u32>,

        #[arg(long, short, value_enum, default_value_t = Unit::Sectors)]
        unit: Unit,

        /// Sectors reserved before the first partition
        #[arg(long, default_value_t = 0)]
        hidden: u32,

        /// Create (or truncate) the image with this many MiB first
        #[arg(long)]
        create_mib: Option<u64>,
    },

    /// Show the superblock of an ext2 volume
    Info,

    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },

    /// Print a file to stdout
    Cat { path: String },

    /// Show the attributes of a file
    Stat { path: String },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Unit {
    Sectors,
    Percent,
    Quota,
}
