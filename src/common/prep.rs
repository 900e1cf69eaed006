//! String preparation profiles.
//!
//! PLAIN and SCRAM identities and passwords go through SASLprep (RFC 4013).
//! The ANONYMOUS trace string uses its own profile from RFC 4505 section 3:
//! no mapping and no normalization, a reduced set of prohibited tables, and
//! the RFC 3454 section 6 bidirectional rules.

use stringprep::tables;

use crate::error::Error;

/// Run SASLprep on a string, turning preparation failure into this crate's
/// error type.
pub(crate) fn saslprep(s: &str) -> Result<String, Error> {
    Ok(stringprep::saslprep(s)?.into_owned())
}

/// Prepare an ANONYMOUS trace string.
///
/// Prohibits tables C.2.1, C.2.2, C.3, C.4, C.5, C.6, C.8 and C.9, and
/// enforces the bidirectional rules. The string itself is never modified.
pub(crate) fn trace_prep(s: &str) -> Result<String, Error> {
    for c in s.chars() {
        if prohibited_in_trace(c) {
            return Err(Error::StringPrep(format!(
                "prohibited character {:?} in trace string",
                c
            )));
        }
    }
    check_bidi(s)?;
    Ok(s.to_owned())
}

fn prohibited_in_trace(c: char) -> bool {
    tables::ascii_control_character(c)
        || tables::non_ascii_control_character(c)
        || tables::private_use(c)
        || tables::non_character_code_point(c)
        || tables::surrogate_code(c)
        || tables::inappropriate_for_plain_text(c)
        || tables::change_display_properties_or_deprecated(c)
        || tables::tagging_character(c)
}

/// RFC 3454 section 6: a string containing RandALCat characters may not
/// contain LCat characters, and must both start and end with a RandALCat
/// character.
fn check_bidi(s: &str) -> Result<(), Error> {
    if s.contains(tables::bidi_r_or_al) {
        let first = s.chars().next().unwrap();
        let last = s.chars().last().unwrap();
        if s.contains(tables::bidi_l) || !tables::bidi_r_or_al(first) || !tables::bidi_r_or_al(last)
        {
            return Err(Error::StringPrep(
                "trace string violates bidi rules".to_owned(),
            ));
        }
    }
    Ok(())
}
