//! Status flags of an octagon.
//!
//! A zero-dimensional universe is tracked explicitly, because a `0 × 0`
//! matrix cannot tell it apart from the empty shape.

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub(crate) struct Status {
    flags: u8,
}

const ZERO_DIM_UNIV: u8 = 1;
const EMPTY: u8 = 1 << 1;
const STRONGLY_CLOSED: u8 = 1 << 2;
const STRONGLY_REDUCED: u8 = 1 << 3;

const TOKENS: [(u8, &str); 4] = [
    (ZERO_DIM_UNIV, "ZE"),
    (EMPTY, "EM"),
    (STRONGLY_CLOSED, "SC"),
    (STRONGLY_REDUCED, "SR"),
];

impl Status {
    pub(crate) fn test_zero_dim_univ(self) -> bool {
        self.flags & ZERO_DIM_UNIV != 0
    }
    pub(crate) fn set_zero_dim_univ(&mut self) {
        self.flags = ZERO_DIM_UNIV;
    }

    pub(crate) fn test_empty(self) -> bool {
        self.flags & EMPTY != 0
    }
    pub(crate) fn set_empty(&mut self) {
        self.flags = EMPTY;
    }

    /// The zero-dimensional universe counts as strongly closed.
    pub(crate) fn test_strongly_closed(self) -> bool {
        self.flags & (STRONGLY_CLOSED | ZERO_DIM_UNIV) != 0
    }
    pub(crate) fn set_strongly_closed(&mut self) {
        self.flags |= STRONGLY_CLOSED;
    }
    pub(crate) fn reset_strongly_closed(&mut self) {
        self.flags &= !STRONGLY_CLOSED;
    }

    /// Leave the zero-dimensional universe for a closed universe.
    pub(crate) fn reset_zero_dim_univ(&mut self) {
        if self.test_zero_dim_univ() {
            self.flags = STRONGLY_CLOSED;
        }
    }

    pub(crate) fn test_strongly_reduced(self) -> bool {
        self.flags & STRONGLY_REDUCED != 0
    }
    pub(crate) fn set_strongly_reduced(&mut self) {
        self.flags |= STRONGLY_REDUCED;
    }
    pub(crate) fn reset_strongly_reduced(&mut self) {
        self.flags &= !STRONGLY_REDUCED;
    }

    /// Flags are mutually consistent: an empty shape carries no other flag.
    pub(crate) fn ok(self) -> bool {
        !(self.test_empty() && self.flags != EMPTY)
    }

    /// Space-separated `+XX`/`-XX` tokens.
    pub(crate) fn ascii_dump(self) -> String {
        TOKENS
            .iter()
            .map(|&(bit, name)| format!("{}{}", if self.flags & bit != 0 { '+' } else { '-' }, name))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub(crate) fn ascii_load<'a, I>(tokens: &mut I) -> Option<Self>
    where
        I: Iterator<Item = &'a str>,
    {
        let mut flags = 0;
        for &(bit, name) in TOKENS.iter() {
            let token = tokens.next()?;
            if token.strip_prefix('+') == Some(name) {
                flags |= bit;
            } else if token.strip_prefix('-') != Some(name) {
                return None;
            }
        }
        let status = Self { flags };
        status.ok().then_some(status)
    }
}
