use heapless::Vec;
use nom::{
    bytes::complete::take_till, character::complete::digit1, multi::fold_many_m_n, IResult,
};

// Only the first 24 runs carry data; anything past this bound is ignored.
pub const MAX_TOKENS: usize = 64;

/// Digit runs found in one raw record, in the order they appear.
#[derive(Debug, Default, Eq, PartialEq)]
pub struct Tokens<'a> {
    runs: Vec<&'a str, MAX_TOKENS>,
    signed: bool,
}

impl<'a> Tokens<'a> {
    pub fn as_slice(&self) -> &[&'a str] {
        &self.runs
    }

    /// True if any run was directly preceded by a `-`. The sign itself is
    /// not captured.
    pub fn signed(&self) -> bool {
        self.signed
    }
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

// Skips separator text and returns the next run along with whether the
// separator ended in a minus sign.
fn digit_run(i: &str) -> IResult<&str, (bool, &str)> {
    let (i, gap) = take_till(is_digit)(i)?;
    let (i, run) = digit1(i)?;

    Ok((i, (gap.ends_with('-'), run)))
}

fn runs(i: &str) -> IResult<&str, Tokens<'_>> {
    fold_many_m_n(
        0,
        MAX_TOKENS,
        digit_run,
        Tokens::default,
        |mut acc, (signed, run)| {
            // Ignore errors as we'll never collect more than MAX_TOKENS
            // runs due to the bound on fold_many_m_n.
            let _ = acc.runs.push(run);
            acc.signed |= signed;
            acc
        },
    )(i)
}

/// Splits `line` into maximal runs of ASCII digits. Every other character,
/// including `-` and `.`, is a separator.
pub fn tokenize(line: &str) -> Tokens<'_> {
    runs(line).map(|(_, tokens)| tokens).unwrap_or_default()
}
