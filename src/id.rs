//! Time-ordered unique identifiers
//!
//! Every persisted row (servers, reachability events, heartbeats) is keyed by
//! an [`Id`] allocated from an [`IdGenerator`]. Ids are 63-bit integers laid out
//! as follows:
//!
//! ```text
//! | 41 bits: ms since 2024-01-01 | 10 bits: worker | 12 bits: sequence |
//! ```
//!
//! Values from one generator never repeat and never decrease, so sorting by id
//! is sorting by allocation time. On the wire ids travel as decimal strings.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::{Clock, SystemClock};

/// 2024-01-01T00:00:00Z in Unix milliseconds
pub const EPOCH_MILLIS: i64 = 1_704_067_200_000;

const WORKER_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const TIMESTAMP_SHIFT: u32 = WORKER_BITS + SEQUENCE_BITS;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

/// Largest worker id that fits the layout
pub const MAX_WORKER_ID: u16 = (1 << WORKER_BITS) - 1;

/// Errors raised while allocating identifiers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The clock reads earlier than the last allocation
    #[error("clock moved backwards: last id issued at {last} ms, clock now reads {now} ms")]
    ClockRewind { last: i64, now: i64 },

    #[error("clock reads {0} ms, which is before the id epoch")]
    BeforeEpoch(i64),

    #[error("worker id {0} exceeds the maximum of {MAX_WORKER_ID}")]
    InvalidWorkerId(u16),
}

/// Opaque row identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Id(u64);

impl Id {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Unix milliseconds at which this id was allocated
    pub const fn timestamp_millis(self) -> i64 {
        (self.0 >> TIMESTAMP_SHIFT) as i64 + EPOCH_MILLIS
    }

    pub const fn worker_id(self) -> u16 {
        ((self.0 >> SEQUENCE_BITS) & MAX_WORKER_ID as u64) as u16
    }

    pub const fn sequence(self) -> u16 {
        (self.0 & SEQUENCE_MASK) as u16
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Id {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Id)
    }
}

impl From<Id> for String {
    fn from(id: Id) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for Id {
    type Error = std::num::ParseIntError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug)]
struct State {
    last_millis: i64,
    sequence: u64,
}

/// Snowflake-style identifier allocator
///
/// The whole allocation (clock read, sequence bump, optional wait for the
/// next millisecond) runs under a single mutex and never touches I/O.
pub struct IdGenerator {
    worker_id: u16,
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
}

impl IdGenerator {
    /// Create a generator reading the system clock
    pub fn new(worker_id: u16) -> Result<Self, IdError> {
        Self::with_clock(worker_id, Arc::new(SystemClock))
    }

    pub fn with_clock(worker_id: u16, clock: Arc<dyn Clock>) -> Result<Self, IdError> {
        if worker_id > MAX_WORKER_ID {
            return Err(IdError::InvalidWorkerId(worker_id));
        }

        Ok(Self {
            worker_id,
            clock,
            state: Mutex::new(State {
                last_millis: -1,
                sequence: 0,
            }),
        })
    }

    pub fn worker_id(&self) -> u16 {
        self.worker_id
    }

    /// Allocate the next identifier
    pub fn next_id(&self) -> Result<Id, IdError> {
        // The state is two integers that are only written after all checks
        // pass, so a poisoned lock still holds a consistent value.
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let mut now = self.clock.now_millis();
        if now < state.last_millis {
            return Err(IdError::ClockRewind {
                last: state.last_millis,
                now,
            });
        }
        if now < EPOCH_MILLIS {
            return Err(IdError::BeforeEpoch(now));
        }

        if now == state.last_millis {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                // sequence exhausted for this millisecond
                while now <= state.last_millis {
                    std::hint::spin_loop();
                    now = self.clock.now_millis();
                }
            }
        } else {
            state.sequence = 0;
        }

        state.last_millis = now;

        let elapsed = (now - EPOCH_MILLIS) as u64;
        Ok(Id((elapsed << TIMESTAMP_SHIFT)
            | (u64::from(self.worker_id) << SEQUENCE_BITS)
            | state.sequence))
    }
}

impl fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdGenerator")
            .field("worker_id", &self.worker_id)
            .finish_non_exhaustive()
    }
}
