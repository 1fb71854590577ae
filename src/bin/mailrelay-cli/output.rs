use anyhow::{Result, bail};
use serde::Serialize;

use crate::args::Format;
use mailrelay_lib::counters::Series;
use mailrelay_lib::relay::{FollowupReport, InboundOutcome, ItemStatus};
use mailrelay_lib::{BatchReport, BatchSummary, SendReceipt, Verdict};

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn only_human_or_json(format: Format) -> Result<()> {
    if format == Format::Csv {
        bail!("--format csv is only supported by `validate` and `series`");
    }
    Ok(())
}

#[derive(Serialize)]
struct VerdictRow<'a> {
    email: &'a str,
    #[serde(flatten)]
    verdict: &'a Verdict,
}

fn reason_cell(verdict: &Verdict) -> (String, String) {
    match &verdict.reason {
        Some(reason) => (reason.code().into_owned(), reason.text()),
        None => (String::new(), String::new()),
    }
}

pub fn verdicts(format: Format, rows: &[(String, Verdict)]) -> Result<()> {
    match format {
        Format::Human => {
            for (email, verdict) in rows {
                let (_, text) = reason_cell(verdict);
                match (verdict.ok, verdict.reason.is_some()) {
                    (true, false) => println!("[OK]      {email}"),
                    (true, true) => println!("[OK]      {email} (warning: {text})"),
                    (false, _) => println!("[INVALID] {email} :: {text}"),
                }
                if let Some(summary) = verdict.scorer_summary() {
                    println!("          score: {summary}");
                }
            }
        }
        Format::Json => {
            let out: Vec<VerdictRow<'_>> = rows
                .iter()
                .map(|(email, verdict)| VerdictRow { email, verdict })
                .collect();
            print_json(&out)?;
        }
        Format::Csv => {
            let mut wtr = csv::Writer::from_writer(std::io::stdout());
            wtr.write_record(["email", "ok", "reason", "text"])?;
            for (email, verdict) in rows {
                let (code, text) = reason_cell(verdict);
                wtr.write_record([
                    email.as_str(),
                    if verdict.ok { "true" } else { "false" },
                    code.as_str(),
                    text.as_str(),
                ])?;
            }
            wtr.flush()?;
        }
    }
    Ok(())
}

pub fn send_receipt(format: Format, receipt: &SendReceipt) -> Result<()> {
    only_human_or_json(format)?;
    if format == Format::Json {
        return print_json(receipt);
    }
    println!("[SENT] #{} → {} (id {})", receipt.tag, receipt.to, receipt.id);
    if let Some(scorer) = &receipt.scorer {
        println!("       score: {scorer}");
    }
    if receipt.unknown_token {
        println!("       warning: unknown campaign token");
    }
    Ok(())
}

pub fn batch_report(format: Format, report: &BatchReport) -> Result<()> {
    only_human_or_json(format)?;
    if format == Format::Json {
        return print_json(report);
    }
    for item in &report.items {
        match &item.status {
            ItemStatus::Sent { tag } => println!("[SENT]    #{tag} → {}", item.email),
            ItemStatus::Skipped { reason } => println!("[SKIPPED] {} :: {reason}", item.email),
            ItemStatus::Failed { error } => println!("[FAILED]  {} :: {error}", item.email),
        }
    }
    println!(
        "{}: sent={} failed={} skipped={} blocklisted={} duplicates={}",
        if report.aborted { "stopped" } else { "done" },
        report.sent,
        report.failed,
        report.skipped,
        report.pre_blocked,
        report.pre_duplicate,
    );
    if report.unknown_token {
        println!("warning: unknown campaign token, counted anyway");
    }
    Ok(())
}

pub fn event_summary(format: Format, summary: &BatchSummary) -> Result<()> {
    only_human_or_json(format)?;
    if format == Format::Json {
        return print_json(summary);
    }
    println!(
        "events={} matched={} unmatched={} malformed={} opens: confirmed={} deferred={} ignored={}",
        summary.received,
        summary.matched,
        summary.unmatched,
        summary.malformed,
        summary.opens_confirmed,
        summary.opens_deferred,
        summary.opens_ignored,
    );
    Ok(())
}

pub fn inbound(format: Format, outcome: Option<&InboundOutcome>) -> Result<()> {
    only_human_or_json(format)?;
    if format == Format::Json {
        return print_json(&outcome);
    }
    match outcome {
        Some(o) if o.newly_recorded => println!("[REPLY] #{} ({:?})", o.tag, o.matched_by),
        Some(o) => println!("[REPLY] #{} already recorded", o.tag),
        None => println!("[REPLY] no matching message"),
    }
    Ok(())
}

pub fn followup(format: Format, report: &FollowupReport) -> Result<()> {
    only_human_or_json(format)?;
    if format == Format::Json {
        return print_json(report);
    }
    if !report.enabled {
        println!("followups disabled (enableFollowup=false)");
    }
    println!(
        "due={} sent={} failed={} opened_no_reply={}",
        report.due, report.sent, report.failed, report.opened_no_reply
    );
    Ok(())
}

pub fn series(format: Format, series: &Series) -> Result<()> {
    let rows = series
        .series
        .sent
        .iter()
        .zip(&series.series.delivered)
        .zip(&series.series.opens);
    match format {
        Format::Json => print_json(series)?,
        Format::Human => {
            println!("period {}", series.period);
            println!("{:<10}  {:>6}  {:>9}  {:>6}", "date", "sent", "delivered", "opens");
            for ((sent, delivered), opens) in rows {
                println!(
                    "{:<10}  {:>6}  {:>9}  {:>6}",
                    sent.date, sent.value, delivered.value, opens.value
                );
            }
        }
        Format::Csv => {
            let mut wtr = csv::Writer::from_writer(std::io::stdout());
            wtr.write_record(["date", "sent", "delivered", "opens"])?;
            for ((sent, delivered), opens) in rows {
                wtr.write_record([
                    sent.date.clone(),
                    sent.value.to_string(),
                    delivered.value.to_string(),
                    opens.value.to_string(),
                ])?;
            }
            wtr.flush()?;
        }
    }
    Ok(())
}
