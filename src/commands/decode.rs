//! Offline decoding: hex reports and capture files

use std::io::BufRead;
use std::path::Path;

use anyhow::Context;

use sdm4540_driver::capture::{self, ReplayFilter, ReplayRecord};
use sdm4540_driver::DriverConfig;
use sdm4540_keyboard::{Decoded, KeySource, RawReport, ReportDecoder};

use super::CommandResult;

fn describe(decoded: &Decoded) -> String {
    match decoded.source {
        KeySource::Special(key) => format!("{} ({})", decoded.code, key),
        KeySource::Passthrough => format!("{} (passthrough)", decoded.code),
    }
}

fn format_decoded(report: &RawReport, decoded: &Decoded, json: bool) -> String {
    if json {
        serde_json::json!({
            "report": report.to_string(),
            "code": decoded.code,
            "source": decoded.source,
            "events": decoded.events(),
        })
        .to_string()
    } else {
        format!("{report}  ->  {}  press+release", describe(decoded))
    }
}

/// Decode reports from the arguments, or from stdin (one per line) if none are given
pub fn decode(config: &DriverConfig, reports: &[String], json: bool) -> CommandResult {
    let decoder = ReportDecoder::new(config.key_mapping()?);

    let decode_one = |text: &str| -> CommandResult {
        let report: RawReport = text
            .parse()
            .with_context(|| format!("bad report {text:?}"))?;
        println!("{}", format_decoded(&report, &decoder.decode(&report), json));
        Ok(())
    };

    if !reports.is_empty() {
        for text in reports {
            decode_one(text)?;
        }
        return Ok(());
    }

    for line in std::io::stdin().lock().lines() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        decode_one(text)?;
    }
    Ok(())
}

fn print_record(record: &ReplayRecord, json: bool) {
    if json {
        match serde_json::to_string(record) {
            Ok(line) => println!("{line}"),
            Err(e) => eprintln!("Failed to serialize record: {e}"),
        }
    } else {
        println!(
            "[{:>10.6}] {}:{} ep{}  {}  ->  {}",
            record.timestamp,
            record.bus,
            record.device,
            record.endpoint,
            record.report,
            describe(&record.decoded)
        );
    }
}

/// Decode every keyboard report in a capture file
pub fn replay(
    config: &DriverConfig,
    path: &Path,
    filter: ReplayFilter,
    json: bool,
    verbose: bool,
) -> CommandResult {
    let decoder = ReportDecoder::new(config.key_mapping()?);
    let stats = capture::analyze_file(path, &decoder, &filter, |record| {
        print_record(record, json)
    })
    .with_context(|| format!("failed to replay {}", path.display()))?;

    eprintln!(
        "\n--- Analyzed {} packets, {} reports decoded ---",
        stats.packets, stats.reports
    );
    if verbose {
        stats.print_summary();
    }
    Ok(())
}
