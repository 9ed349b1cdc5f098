// Copyright 2022 TiKV Project Authors. Licensed under Apache-2.0.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Placeholder rendered for a frame whose function could not be resolved.
pub(crate) const UNKNOWN_FUNCTION: &str = "??";

/// One resolved stack location.
///
/// `function` and `file` point into text interned by the capturing session's
/// [`SymbolCache`](crate::SymbolCache). The text is reference counted, so it
/// stays valid for as long as the frame does, even after the session closed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Frame {
    pub address: usize,
    pub function: Option<Arc<str>>,
    pub file: Option<Arc<str>>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl Frame {
    /// A frame carrying only its instruction pointer.
    pub fn unresolved(address: usize) -> Self {
        Frame {
            address,
            ..Default::default()
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.function.is_some()
    }
}

impl Display for Frame {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        write!(f, "{:#018x} ", self.address)?;
        match &self.function {
            Some(name) => write!(f, "{}", name)?,
            None => write!(f, "{}", UNKNOWN_FUNCTION)?,
        }

        if let Some(file) = &self.file {
            write!(f, " ({}", file)?;
            if let Some(line) = self.line {
                write!(f, ":{}", line)?;
                if let Some(column) = self.column {
                    write!(f, ":{}", column)?;
                }
            }
            write!(f, ")")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_resolved() {
        let frame = Frame {
            address: 0x1000,
            function: Some("rts::schedule".into()),
            file: Some("rts/Schedule.rs".into()),
            line: Some(42),
            column: Some(7),
        };

        assert_eq!(
            frame.to_string(),
            "0x0000000000001000 rts::schedule (rts/Schedule.rs:42:7)"
        );
    }

    #[test]
    fn display_unresolved() {
        let frame = Frame::unresolved(0xdead);

        assert!(!frame.is_resolved());
        assert_eq!(frame.to_string(), "0x000000000000dead ??");
    }

    #[test]
    fn display_partial_location() {
        let frame = Frame {
            address: 0x10,
            function: None,
            file: Some("main.rs".into()),
            line: None,
            column: Some(3),
        };
        assert_eq!(frame.to_string(), "0x0000000000000010 ?? (main.rs)");

        let frame = Frame {
            line: Some(9),
            column: None,
            ..frame
        };
        assert_eq!(frame.to_string(), "0x0000000000000010 ?? (main.rs:9)");
    }
}
