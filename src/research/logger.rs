use colored::Colorize;

use std::fs::File;
use std::io::prelude::*;
use std::path::Path;

use crate::Result;


const WIDTH: usize = 8;
const STAT_WIDTH: usize = 24;
const PREC_WIDTH: usize = 5;
const HEADER: &str = "Round,Alpha,MR,Loss,Time\n";


/// The outcome of one boosting round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundRecord {
    /// Round number, starting at `1`.
    pub round: usize,
    /// Step of the round.
    pub alpha: f64,
    /// Training misclassification rate after the round.
    pub misclassification_rate: f64,
    /// Mean exponential loss after the round.
    pub loss: f64,
    /// Cumulative running time in milliseconds.
    pub time_acc: u128,
}


/// Struct `TrainingLog` records the rounds of one boosted classifier,
/// prints them as a colored table every `print_every` rounds,
/// and writes them to a CSV file.
#[derive(Debug, Clone)]
pub struct TrainingLog {
    label: String,
    print_every: usize,
    records: Vec<RoundRecord>,
}


impl TrainingLog {
    /// Construct a new log.
    /// `print_every == usize::MAX` disables printing.
    pub fn new<S: Into<String>>(label: S, print_every: usize) -> Self {
        Self { label: label.into(), print_every, records: Vec::new() }
    }


    /// Returns the label of the logged classifier.
    pub fn label(&self) -> &str {
        &self.label
    }


    /// Returns the recorded rounds.
    pub fn records(&self) -> &[RoundRecord] {
        &self.records
    }


    #[inline(always)]
    fn is_printing(&self) -> bool {
        self.print_every != usize::MAX && self.print_every > 0
    }


    /// Print the booster settings and the table header.
    pub fn print_header(&self, booster: &str, info: Option<Vec<(&str, String)>>) {
        if !self.is_printing() { return; }
        println!("\n{}", self.label.bold());
        println!(
            "+ {:<STAT_WIDTH$}\t{:>STAT_WIDTH$}",
            "Booster".bold(),
            booster.bold().green(),
        );
        if let Some(info) = info {
            println!("{}", info_lines(&info));
        }
        println!(
            "      {:>WIDTH$}\t{:>WIDTH$}\t{:>WIDTH$}\t{:>WIDTH$}\t{:>WIDTH$}\n",
            "ROUND".bold().red(),
            "MR".bold().green(),
            "LOSS".bold().yellow(),
            "ALPHA".bold().blue(),
            "TIME".bold().cyan(),
        );
    }


    /// Record a round and print it if `round` is a multiple of
    /// `print_every`.
    pub fn record(&mut self, record: RoundRecord) {
        if self.is_printing() && record.round % self.print_every == 0 {
            println!("{} {}", "[LOG]".bold().magenta(), line(&record, false));
        }
        self.records.push(record);
    }


    /// Print the last round.
    pub fn finish(&self) {
        if !self.is_printing() { return; }
        if let Some(record) = self.records.last() {
            println!(
                "{} {}\n",
                "[FIN]".bold().bright_green(),
                line(record, true),
            );
        }
    }


    /// Write every recorded round to `path` as CSV.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(HEADER.as_bytes())?;
        for r in &self.records {
            let line = format!(
                "{},{},{},{},{}\n",
                r.round, r.alpha, r.misclassification_rate, r.loss, r.time_acc,
            );
            file.write_all(line.as_bytes())?;
        }
        Ok(())
    }
}


/// One `+ key  value` line per setting.
fn info_lines(info: &[(&str, String)]) -> String {
    info.iter()
        .map(|(key, val)| {
            format!(
                "    + {:<STAT_WIDTH$}\t{:>width$}",
                key,
                val.bold().yellow(),
                width = STAT_WIDTH - 8,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}


fn line(r: &RoundRecord, bold: bool) -> String {
    let mr = format!("{:>WIDTH$.PREC_WIDTH$}", r.misclassification_rate);
    let loss = format!("{:>WIDTH$.PREC_WIDTH$}", r.loss);
    let alpha = format!("{:>WIDTH$.PREC_WIDTH$}", r.alpha);
    let (mr, loss, alpha) = if bold {
        (mr.bold().green(), loss.bold().yellow(), alpha.bold().blue())
    } else {
        (mr.green(), loss.yellow(), alpha.blue())
    };
    format!(
        "{}\t{mr}\t{loss}\t{alpha}\t{}",
        format!("{:>WIDTH$}", r.round).red(),
        time_format(r.time_acc).bold().cyan(),
    )
}


/// Format a duration given in milliseconds.
pub(crate) fn time_format(millisec: u128) -> String {
    if millisec < 1_000 {
        return format!("  0.{:0>3}s", millisec);
    }
    let sec = millisec / 1_000;
    let millisec = millisec % 1_000;
    if sec < 60 {
        return format!(" {:0>2}.{:0>3}s", sec, millisec);
    }
    let min = sec / 60;
    let sec = sec % 60;
    if min < 60 {
        return format!(" {:0>2}m {:0>2}s", min, sec);
    }
    let hours = min / 60;
    let min = min % 60;
    format!(" {:0>2}h {:0>2}m", hours, min)
}
