//! International designator notation conversion.
//!
//! Two encodings are in circulation: the long COSPAR form `YYYY-NNNX`
//! (launch year, 3-digit sequence, piece letter) and the compact TLE form
//! `YYNNNSSG` (2-digit year, zero-padded sequence, optional piece
//! letters). Sources disagree on which they carry, so matching tries both.

/// Convert between the two encodings. `1998-067A` → `98067A` and
/// `98067A` → `1998-067A`. Returns `None` on malformed input.
pub fn alternate_form(designator: &str) -> Option<String> {
    if designator.contains('-') {
        long_to_short(designator)
    } else {
        short_to_long(designator)
    }
}

/// `YYYY-NNNX` → `YYNNNSSG`. Sequence is re-padded to 3 digits.
fn long_to_short(designator: &str) -> Option<String> {
    let (year, rest) = designator.split_once('-')?;
    if rest.contains('-') || year.len() < 2 || !designator.is_ascii() {
        return None;
    }
    let yy = &year[year.len() - 2..];
    if !yy.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let last = rest.chars().last()?;
    let (seq, piece) = if last.is_ascii_alphabetic() {
        (&rest[..rest.len() - 1], &rest[rest.len() - 1..])
    } else {
        (rest, "")
    };
    let seq: u32 = seq.parse().ok()?;
    Some(format!("{yy}{seq:03}{piece}"))
}

/// `YYNNNSSG` → `YYYY-NNNX`. Two-digit years above 57 map to the 1900s,
/// the rest to the 2000s (Sputnik-era cutoff).
fn short_to_long(designator: &str) -> Option<String> {
    if designator.len() < 5 {
        return None;
    }
    let yy: u32 = designator.get(..2)?.parse().ok()?;
    let seq: u32 = designator.get(2..5)?.parse().ok()?;
    let piece = designator.get(5..).unwrap_or("");
    let year = if yy > 57 { 1900 + yy } else { 2000 + yy };
    Some(format!("{year}-{seq:03}{piece}"))
}

/// Lookup candidates for a designator, most specific first: the verbatim
/// string, the alternate encoding, then the `A`..`H` piece-letter variants
/// (in both encodings) of any form that lacks one. Multi-piece launches
/// (rocket body vs payload) make the bare designator ambiguous; the
/// letter-append pass recovers the registered piece.
pub fn candidates(designator: &str) -> Vec<String> {
    fn push(out: &mut Vec<String>, candidate: String) {
        if !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    let mut out = vec![designator.to_string()];
    if let Some(alt) = alternate_form(designator) {
        push(&mut out, alt);
    }
    let bases: Vec<String> = out
        .iter()
        .filter(|d| !d.contains('-') && d.chars().last().is_some_and(|c| c.is_ascii_digit()))
        .cloned()
        .collect();
    for base in bases {
        for letter in 'A'..='H' {
            let candidate = format!("{base}{letter}");
            if let Some(alt) = alternate_form(&candidate) {
                push(&mut out, alt);
            }
            push(&mut out, candidate);
        }
    }
    out
}
