//! Short id generation
//!
//! Ids are the first six characters of an uppercase, separator-free random
//! (version 4) UUID. Sampling repeats until the candidate is not in the id
//! index, up to a per-collection ceiling.

use super::{Collection, RecordList};
use crate::schema::ID_LEN;
use crate::{Error, Result};
use rand::RngCore;
use uuid::{Builder, Uuid};

/// Default retry ceiling for id sampling
pub const DEFAULT_MAX_ID_ATTEMPTS: usize = 10_000;

/// Draw one six-character candidate from `rng`.
fn sample_id<R: RngCore + ?Sized>(rng: &mut R) -> String {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);

    let uuid = Builder::from_random_bytes(bytes).into_uuid();
    let mut buf = Uuid::encode_buffer();
    let hex = uuid.simple().encode_upper(&mut buf);
    hex[..ID_LEN].to_string()
}

impl RecordList {
    /// Retry ceiling used by id generation.
    #[must_use]
    pub const fn max_id_attempts(&self) -> usize {
        self.max_id_attempts
    }

    /// Change the retry ceiling used by id generation.
    pub fn set_max_id_attempts(&mut self, attempts: usize) {
        self.max_id_attempts = attempts;
    }

    /// Generate an id absent from the index using `rng`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IdSpaceExhausted`] if no free id was drawn within
    /// [`RecordList::max_id_attempts`] samples.
    pub fn generate_id_with<R: RngCore + ?Sized>(&self, rng: &mut R) -> Result<String> {
        for _ in 0..self.max_id_attempts {
            let candidate = sample_id(rng);
            if !self.contains_id(&candidate) {
                return Ok(candidate);
            }
        }

        Err(Error::IdSpaceExhausted {
            attempts: self.max_id_attempts,
        })
    }
}
