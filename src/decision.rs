//! Operator prompts and the per-phase "always yes / always no" state.

use crate::error::{Error, Result};
use std::io::{BufRead, Write};

/// Answer to a single-file question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Yes,
    No,
    AlwaysYes,
    AlwaysNo,
}

impl Decision {
    /// Parse an operator token. An empty answer means `Yes`.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "" | "y" => Some(Self::Yes),
            "n" => Some(Self::No),
            "ay" => Some(Self::AlwaysYes),
            "an" => Some(Self::AlwaysNo),
            _ => None,
        }
    }
}

/// Answer to "which file of this group do you want to keep?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupDecision {
    KeepAll,
    /// 1-based position in the listing.
    Keep(usize),
    /// Keep the first listed file here and in every remaining group.
    AlwaysKeepFirst,
    /// Keep everything here and in every remaining group.
    AlwaysKeepAll,
}

impl GroupDecision {
    /// Parse an answer for a group of `len` files. An empty answer or `n`
    /// keeps all, `y` keeps the first listed file.
    pub fn parse(input: &str, len: usize) -> Option<Self> {
        let input = input.trim().to_lowercase();
        match input.as_str() {
            "" | "n" => Some(Self::KeepAll),
            "y" => Some(Self::Keep(1)),
            "ay" => Some(Self::AlwaysKeepFirst),
            "an" => Some(Self::AlwaysKeepAll),
            number => match number.parse::<usize>() {
                Ok(n) if (1..=len).contains(&n) => Some(Self::Keep(n)),
                _ => None,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StickyChoice {
    #[default]
    None,
    AlwaysYes,
    AlwaysNo,
}

/// What to do with one single-file finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Apply the proposed action. `auto` is set when no prompt was shown.
    Apply { auto: bool },
    Decline,
    /// Stop presenting findings for the rest of the phase.
    Stop,
}

/// What to do with one group finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupResolution {
    /// Keep the member at this 1-based position and delete the others.
    Keep { position: usize, auto: bool },
    KeepAll,
    Stop,
}

/// Decision state for one phase. A fresh value is created for every phase.
#[derive(Debug, Default)]
pub struct PhaseState {
    sticky: StickyChoice,
}

impl PhaseState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sticky(&self) -> StickyChoice {
        self.sticky
    }

    /// Resolve a single-file finding, prompting only when no sticky choice
    /// is in effect. `question` is shown before the prompt.
    pub fn resolve<R: BufRead, W: Write>(
        &mut self,
        prompter: &mut Prompter<R, W>,
        question: &str,
    ) -> Result<Resolution> {
        match self.sticky {
            StickyChoice::AlwaysNo => return Ok(Resolution::Stop),
            StickyChoice::AlwaysYes => return Ok(Resolution::Apply { auto: true }),
            StickyChoice::None => {}
        }

        let resolution = match prompter.ask_decision(question)? {
            Decision::Yes => Resolution::Apply { auto: false },
            Decision::No => Resolution::Decline,
            Decision::AlwaysYes => {
                self.sticky = StickyChoice::AlwaysYes;
                Resolution::Apply { auto: false }
            }
            Decision::AlwaysNo => {
                self.sticky = StickyChoice::AlwaysNo;
                Resolution::Stop
            }
        };
        Ok(resolution)
    }

    /// Resolve a group of `len` files whose listing has already been shown.
    pub fn resolve_group<R: BufRead, W: Write>(
        &mut self,
        prompter: &mut Prompter<R, W>,
        len: usize,
    ) -> Result<GroupResolution> {
        match self.sticky {
            StickyChoice::AlwaysNo => return Ok(GroupResolution::Stop),
            StickyChoice::AlwaysYes => return Ok(GroupResolution::Keep { position: 1, auto: true }),
            StickyChoice::None => {}
        }

        let resolution = match prompter.ask_keep(len)? {
            GroupDecision::KeepAll => GroupResolution::KeepAll,
            GroupDecision::Keep(position) => GroupResolution::Keep { position, auto: false },
            GroupDecision::AlwaysKeepFirst => {
                self.sticky = StickyChoice::AlwaysYes;
                GroupResolution::Keep { position: 1, auto: false }
            }
            GroupDecision::AlwaysKeepAll => {
                self.sticky = StickyChoice::AlwaysNo;
                GroupResolution::Stop
            }
        };
        Ok(resolution)
    }
}

/// Line-oriented operator console.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Write one line of operator-facing text.
    pub fn say(&mut self, message: impl std::fmt::Display) -> Result<()> {
        writeln!(self.output, "{}", message)?;
        Ok(())
    }

    pub fn ask_decision(&mut self, question: &str) -> Result<Decision> {
        self.ask(
            &format!("{} [Y]/n/ay/an? ", question),
            Decision::parse,
        )
    }

    pub fn ask_keep(&mut self, len: usize) -> Result<GroupDecision> {
        self.ask(
            &format!(
                "Enter number of the file to keep [1-{}] (rest of the files will be deleted), \
                 'y' to keep file 1, 'n' or Enter to keep all, \
                 'ay' to keep file 1 here and in all remaining groups, \
                 'an' to keep everything from now on: ",
                len
            ),
            |input| GroupDecision::parse(input, len),
        )
    }

    fn ask<T>(&mut self, prompt: &str, parse: impl Fn(&str) -> Option<T>) -> Result<T> {
        let mut line = String::new();

        loop {
            line.clear();
            write!(self.output, "{}", prompt)?;
            self.output.flush()?; // Make sure the prompt is immediately displayed

            if self.input.read_line(&mut line)? == 0 {
                writeln!(self.output)?;
                return Err(Error::InputClosed);
            }

            match parse(&line) {
                Some(answer) => return Ok(answer),
                None => writeln!(self.output, "Invalid input. Please enter your choice again.")?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn transcript(prompter: Prompter<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(prompter.into_output()).unwrap()
    }

    #[test]
    fn test_parse_decision_tokens() {
        assert_eq!(Decision::parse("y\n"), Some(Decision::Yes));
        assert_eq!(Decision::parse("\n"), Some(Decision::Yes));
        assert_eq!(Decision::parse("N"), Some(Decision::No));
        assert_eq!(Decision::parse(" AY "), Some(Decision::AlwaysYes));
        assert_eq!(Decision::parse("an"), Some(Decision::AlwaysNo));
        assert_eq!(Decision::parse("yes"), None);
        assert_eq!(Decision::parse("a"), None);
    }

    #[test]
    fn test_parse_group_tokens() {
        assert_eq!(GroupDecision::parse("\n", 3), Some(GroupDecision::KeepAll));
        assert_eq!(GroupDecision::parse("2\n", 3), Some(GroupDecision::Keep(2)));
        assert_eq!(GroupDecision::parse("0", 3), None);
        assert_eq!(GroupDecision::parse("4", 3), None);
        assert_eq!(GroupDecision::parse("y\n", 3), Some(GroupDecision::Keep(1)));
        assert_eq!(GroupDecision::parse(" N ", 3), Some(GroupDecision::KeepAll));
        assert_eq!(GroupDecision::parse("yes", 3), None);
        assert_eq!(GroupDecision::parse("AY", 3), Some(GroupDecision::AlwaysKeepFirst));
        assert_eq!(GroupDecision::parse("an", 3), Some(GroupDecision::AlwaysKeepAll));
    }

    #[test]
    fn test_invalid_input_reprompts() {
        let mut p = prompter("maybe\nsure\nn\n");
        assert_eq!(p.ask_decision("Delete?").unwrap(), Decision::No);
        let out = transcript(p);
        assert_eq!(out.matches("Invalid input").count(), 2);
        assert_eq!(out.matches("Delete? [Y]/n/ay/an? ").count(), 3);
    }

    #[test]
    fn test_closed_input_is_an_error() {
        let mut p = prompter("");
        assert!(matches!(p.ask_decision("Delete?"), Err(Error::InputClosed)));
        let mut p = prompter("bogus\n");
        assert!(matches!(p.ask_keep(2), Err(Error::InputClosed)));
    }

    #[test]
    fn test_always_yes_sticks_for_the_phase() {
        let mut p = prompter("n\nay\n");
        let mut phase = PhaseState::new();
        assert_eq!(phase.resolve(&mut p, "1?").unwrap(), Resolution::Decline);
        assert_eq!(phase.resolve(&mut p, "2?").unwrap(), Resolution::Apply { auto: false });
        for _ in 0..3 {
            assert_eq!(phase.resolve(&mut p, "n?").unwrap(), Resolution::Apply { auto: true });
        }
        assert_eq!(transcript(p).matches("[Y]/n/ay/an?").count(), 2);
    }

    #[test]
    fn test_always_no_stops_without_prompting() {
        let mut p = prompter("an\n");
        let mut phase = PhaseState::new();
        assert_eq!(phase.resolve(&mut p, "1?").unwrap(), Resolution::Stop);
        assert_eq!(phase.resolve(&mut p, "2?").unwrap(), Resolution::Stop);
        assert_eq!(phase.resolve_group(&mut p, 2).unwrap(), GroupResolution::Stop);
        assert_eq!(phase.sticky(), StickyChoice::AlwaysNo);
    }

    #[test]
    fn test_new_phase_starts_fresh() {
        let mut p = prompter("ay\nn\n");
        let mut first = PhaseState::new();
        first.resolve(&mut p, "1?").unwrap();
        let mut second = PhaseState::new();
        assert_eq!(second.resolve(&mut p, "1?").unwrap(), Resolution::Decline);
    }

    #[test]
    fn test_group_resolution() {
        let mut p = prompter("\n2\nay\n");
        let mut phase = PhaseState::new();
        assert_eq!(phase.resolve_group(&mut p, 3).unwrap(), GroupResolution::KeepAll);
        assert_eq!(
            phase.resolve_group(&mut p, 3).unwrap(),
            GroupResolution::Keep { position: 2, auto: false }
        );
        assert_eq!(
            phase.resolve_group(&mut p, 3).unwrap(),
            GroupResolution::Keep { position: 1, auto: false }
        );
        assert_eq!(
            phase.resolve_group(&mut p, 5).unwrap(),
            GroupResolution::Keep { position: 1, auto: true }
        );
    }
}
