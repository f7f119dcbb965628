//! `kessler promote` — field promotion with preview and confirmation.

use std::io::{self, BufRead, Write};

use kessler_store::{
    parse_filter, EnvelopeStore, Promoter, PromotionOutcome, PromotionRequest, CONFIRM_THRESHOLD,
};

use crate::CliError;

/// Default batch cap when `--all` is not given. Preview-sized so the
/// common case promotes exactly what the dry run showed.
const DEFAULT_LIMIT: u64 = 10;

pub struct PromoteArgs {
    pub source_field: String,
    pub target_field: String,
    pub dry_run: bool,
    pub filter: Option<String>,
    pub all: bool,
    pub yes: bool,
    pub reason: Option<String>,
    pub verbose: bool,
}

pub fn cmd_promote(store: &EnvelopeStore, args: PromoteArgs) -> Result<(), CliError> {
    let mut request = PromotionRequest::new(&args.source_field, &args.target_field);
    request.reason = args.reason;
    request.dry_run = args.dry_run;
    if !args.all {
        request.limit = Some(DEFAULT_LIMIT);
    }
    if let Some(spec) = &args.filter {
        request.filter = parse_filter(spec)
            .map_err(|e| CliError::usage(e.to_string()).with_hint("filter syntax: field=value[,field=value]"))?;
    }

    let promoter = Promoter::new(store);
    let plan = promoter.plan(&request)?;

    if plan.candidates == 0 {
        println!("nothing to promote: no envelope has a value at {}", args.source_field);
        return Ok(());
    }
    if plan.conflicts > 0 {
        eprintln!(
            "warning: {} envelope(s) already hold a value at {} and will be overwritten",
            plan.conflicts, args.target_field
        );
    }

    if !args.dry_run && !args.yes && plan.candidates > CONFIRM_THRESHOLD {
        if !confirm(plan.candidates, &args.target_field)? {
            println!("aborted, nothing written");
            return Ok(());
        }
    }

    let outcome = promoter.execute(&request)?;
    print_outcome(&outcome, &args.source_field, &args.target_field, args.verbose);

    if !outcome.errors.is_empty() {
        for err in &outcome.errors {
            eprintln!("error: {}", err);
        }
        return Err(CliError::error(format!(
            "{} envelope(s) could not be updated",
            outcome.errors.len()
        )));
    }
    Ok(())
}

fn print_outcome(outcome: &PromotionOutcome, source: &str, target: &str, verbose: bool) {
    if outcome.dry_run || verbose {
        if outcome.dry_run {
            println!("dry run: {} -> {}", source, target);
        } else {
            println!("{} -> {}", source, target);
        }
        for preview in &outcome.previews {
            match &preview.existing {
                Some(old) => println!(
                    "  {}: {} (replacing {})",
                    preview.identifier, preview.value, old
                ),
                None => println!("  {}: {}", preview.identifier, preview.value),
            }
        }
        let shown = outcome.previews.len() as u64;
        if outcome.promoted > shown {
            println!("  ... and {} more", outcome.promoted - shown);
        }
    }
    if outcome.dry_run {
        println!(
            "would promote {} envelope(s), {} skipped",
            outcome.promoted, outcome.skipped
        );
    } else {
        println!(
            "promoted {} envelope(s), {} skipped, {} overwritten",
            outcome.promoted, outcome.skipped, outcome.conflicts
        );
    }
}

fn confirm(candidates: u64, target: &str) -> Result<bool, CliError> {
    print!("promote {} envelope(s) into {}? [y/N] ", candidates, target);
    io::stdout()
        .flush()
        .map_err(|e| CliError::error(e.to_string()))?;
    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .map_err(|e| CliError::error(e.to_string()))?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}
