// Copyright (c) netqasm-rs contributors.
// Licensed under the MIT License.

//! The pre-subroutine container and the non-anchored pattern matcher used to
//! inspect it in tests.

use std::fmt::{self, Display, Formatter};

use indenter::indented;

use crate::error::{Error, Result};
use crate::ir::{ArrayHandle, ICmd, Label, Opcode, Register};

/// One entry in a pre-subroutine: either an instruction or a label definition.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Cmd(ICmd),
    Label(Label),
}

impl Display for Item {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Item::Cmd(cmd) => write!(f, "{cmd}"),
            Item::Label(label) => write!(f, "{label}:"),
        }
    }
}

/// The linear, ordered output of the builder: instructions and labels in the
/// order they were emitted, plus the declared arrays and return declarations
/// that the downstream assembler needs alongside the command stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreSubroutine {
    pub commands: Vec<Item>,
    pub arrays: Vec<ArrayHandle>,
    pub return_registers: Vec<Register>,
    pub return_arrays: Vec<ArrayHandle>,
}

impl PreSubroutine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether any command in the stream has this opcode.
    #[must_use]
    pub fn contains(&self, opcode: Opcode) -> bool {
        self.commands
            .iter()
            .any(|item| matches!(item, Item::Cmd(cmd) if cmd.opcode == opcode))
    }

    /// Runs the pattern matcher against this subroutine's command stream.
    ///
    /// # Errors
    /// Returns [`Error::PatternInvalid`] if `pattern` places a wildcard at the
    /// start or end, or places `ANY_ZERO_OR_MORE` directly before another
    /// wildcard.
    pub fn match_pattern(&self, pattern: &[Pattern]) -> Result<bool> {
        PatternMatcher::new(&self.commands, pattern)?.run()
    }
}

impl Display for PreSubroutine {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "PreSubroutine {{")?;
        {
            let f = &mut indented(f);
            for item in &self.commands {
                writeln!(f, "{item}")?;
            }
        }
        write!(f, "}}")
    }
}

/// One element of a pattern passed to [`PreSubroutine::match_pattern`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// Matches an [`Item::Cmd`] with exactly this opcode.
    Op(Opcode),
    /// Matches any single item (command or label).
    AnyOne,
    /// Skips forward, greedy-minimal, until the next pattern element matches.
    /// Forbidden at the start or end of a pattern, and forbidden immediately
    /// before another wildcard.
    AnyZeroOrMore,
    /// Matches any [`Item::Label`].
    BranchLabel,
}

/// A small non-anchored matcher over a pattern of [`Pattern`] elements.
///
/// Matching starts at pattern index 0 and command index 0 and is *not*
/// anchored: failing a literal match resets the pattern cursor to the start
/// and advances the command cursor by one, which is equivalent to retrying the
/// match starting one command later. `ANY_ZERO_OR_MORE` does not reset on a
/// non-match; it simply holds its position while the command cursor advances,
/// which is what makes the skip greedy-minimal (it stops as soon as the next
/// literal matches).
struct PatternMatcher<'a> {
    commands: &'a [Item],
    pattern: &'a [Pattern],
    pat_idx: usize,
    cmd_idx: usize,
}

impl<'a> PatternMatcher<'a> {
    fn new(commands: &'a [Item], pattern: &'a [Pattern]) -> Result<Self> {
        validate_pattern(pattern)?;
        Ok(Self {
            commands,
            pattern,
            pat_idx: 0,
            cmd_idx: 0,
        })
    }

    fn run(mut self) -> Result<bool> {
        loop {
            if self.pat_idx == self.pattern.len() {
                return Ok(true);
            }
            if self.cmd_idx == self.commands.len() {
                return Ok(false);
            }

            match self.pattern[self.pat_idx] {
                Pattern::AnyOne => self.record_match(),
                Pattern::BranchLabel => self.match_branch_label(),
                Pattern::Op(opcode) => self.match_instr(opcode),
                Pattern::AnyZeroOrMore => self.match_any_zero_or_more(),
            }

            self.cmd_idx += 1;
        }
    }

    fn record_match(&mut self) {
        self.pat_idx += 1;
    }

    fn reset_match(&mut self) {
        self.pat_idx = 0;
    }

    fn match_branch_label(&mut self) {
        if matches!(self.commands[self.cmd_idx], Item::Label(_)) {
            self.record_match();
        } else {
            self.reset_match();
        }
    }

    fn match_instr(&mut self, opcode: Opcode) {
        if matches!(&self.commands[self.cmd_idx], Item::Cmd(cmd) if cmd.opcode == opcode) {
            self.record_match();
        } else {
            self.reset_match();
        }
    }

    fn match_any_zero_or_more(&mut self) {
        let next = self.pattern[self.pat_idx + 1];
        let advanced = match next {
            Pattern::BranchLabel => matches!(self.commands[self.cmd_idx], Item::Label(_)),
            Pattern::Op(opcode) => {
                matches!(&self.commands[self.cmd_idx], Item::Cmd(cmd) if cmd.opcode == opcode)
            }
            Pattern::AnyOne | Pattern::AnyZeroOrMore => {
                unreachable!("validated at construction")
            }
        };
        if advanced {
            self.pat_idx += 2;
        }
    }
}

fn validate_pattern(pattern: &[Pattern]) -> Result<()> {
    let Some(first) = pattern.first() else {
        return Ok(());
    };
    if *first == Pattern::AnyZeroOrMore {
        return Err(Error::PatternInvalid {
            reason: "wildcard at start of pattern not allowed",
        });
    }
    for (i, elem) in pattern.iter().enumerate() {
        if *elem != Pattern::AnyZeroOrMore {
            continue;
        }
        match pattern.get(i + 1) {
            None => {
                return Err(Error::PatternInvalid {
                    reason: "wildcard at end of pattern not allowed",
                });
            }
            Some(Pattern::Op(_) | Pattern::BranchLabel) => {}
            Some(Pattern::AnyOne | Pattern::AnyZeroOrMore) => {
                return Err(Error::PatternInvalid {
                    reason: "wildcard directly after ANY_ZERO_OR_MORE not allowed",
                });
            }
        }
    }
    Ok(())
}
