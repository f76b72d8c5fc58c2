// CLI definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sdm4540_driver")]
#[command(
    author,
    version,
    about = "Extra-key driver for the Compaq Internet Keyboard (SDM4540UL)"
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file path (default: ~/.config/sdm4540/driver.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate keyboard reports into key events until interrupted (default)
    #[command(visible_alias = "r")]
    Run,

    /// List connected SDM4540UL keyboards and their HID interfaces
    #[command(visible_aliases = ["ls", "l"])]
    List {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Decode reports given as hex (e.g. "04 00 00 10 00 00 00 00"), or read from stdin
    #[command(visible_alias = "d")]
    Decode {
        /// Reports, one per argument
        reports: Vec<String>,

        /// Print one JSON object per report
        #[arg(long)]
        json: bool,
    },

    /// Decode keyboard reports from a USBPcap or usbmon capture
    Replay {
        /// pcap or pcapng file
        file: PathBuf,

        /// Only packets from this USB bus
        #[arg(long)]
        bus: Option<u16>,

        /// Only packets from this USB device address
        #[arg(long)]
        device: Option<u16>,

        /// Print one JSON object per report
        #[arg(long)]
        json: bool,

        /// Print packet statistics at the end
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show the vendor button signatures and their key codes
    #[command(visible_alias = "k")]
    Keymap {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Write a configuration file with all defaults spelled out
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
