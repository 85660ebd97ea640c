//! Seats and per-seat storage.
//!
//! A seat is identified by a 0-based [`PlayerId`]. Card-driven games use the
//! seat index as the faction id. Sets of seats (submissions, eligibility,
//! reveal observers) are `u64` masks built with [`seat_mask`].

use serde::{Deserialize, Serialize};

/// Most seats a game can declare; one bit per seat in a `u64` mask.
pub const MAX_PLAYERS: usize = 64;

/// A seat at the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl PlayerId {
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Every seat of a `player_count`-seat game, in seat order.
    ///
    /// ```
    /// use game_kernel::core::PlayerId;
    ///
    /// let seats: Vec<_> = PlayerId::all(3).collect();
    /// assert_eq!(seats, vec![PlayerId(0), PlayerId(1), PlayerId(2)]);
    /// ```
    pub fn all(player_count: usize) -> impl Iterator<Item = PlayerId> {
        (0..player_count.min(MAX_PLAYERS) as u8).map(PlayerId)
    }

    /// The seat `offset` places after this one, wrapping around the table.
    /// Negative offsets count backwards.
    #[must_use]
    pub fn offset(self, offset: i64, player_count: usize) -> Self {
        let count = player_count.max(1) as i64;
        Self((i64::from(self.0) + offset).rem_euclid(count) as u8)
    }

    /// The next seat in round-robin order.
    #[must_use]
    pub fn next(self, player_count: usize) -> Self {
        self.offset(1, player_count)
    }

    /// This seat's bit in a seat mask.
    #[must_use]
    pub const fn bit(self) -> u64 {
        1u64 << self.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Player {}", self.0)
    }
}

/// Mask with a bit set for every given seat.
#[must_use]
pub fn seat_mask(seats: impl IntoIterator<Item = PlayerId>) -> u64 {
    seats.into_iter().fold(0, |mask, seat| mask | seat.bit())
}

/// One value per seat.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerMap<T> {
    seats: Vec<T>,
}

impl<T> PlayerMap<T> {
    /// Build a map for `player_count` seats, one `init(seat)` each.
    pub fn new(player_count: usize, init: impl Fn(PlayerId) -> T) -> Self {
        Self {
            seats: PlayerId::all(player_count).map(init).collect(),
        }
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.seats.len()
    }

    /// `None` for seats outside the table.
    #[must_use]
    pub fn get(&self, player: PlayerId) -> Option<&T> {
        self.seats.get(player.index())
    }

    pub fn get_mut(&mut self, player: PlayerId) -> Option<&mut T> {
        self.seats.get_mut(player.index())
    }

    /// Seats with their values, in seat order.
    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, &T)> {
        self.seats
            .iter()
            .enumerate()
            .map(|(i, v)| (PlayerId(i as u8), v))
    }
}
