use std::collections::BTreeMap;

use crate::UserId;

#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    bolero::generator::TypeGenerator,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn weight(self) -> i64 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VoteDirection::Up => "up",
            VoteDirection::Down => "down",
        }
    }

    pub fn parse(s: &str) -> Option<VoteDirection> {
        match s {
            "up" => Some(VoteDirection::Up),
            "down" => Some(VoteDirection::Down),
            _ => None,
        }
    }
}

pub type VoteMap = BTreeMap<UserId, VoteDirection>;

/// Score implied by a vote map
pub fn tally(votes: &VoteMap) -> i64 {
    votes.values().map(|v| v.weight()).sum()
}

/// What happens when a user clicks a vote arrow
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VoteChange {
    pub previous: Option<VoteDirection>,
    pub current: Option<VoteDirection>,

    /// Amount to add to the score
    pub delta: i64,
}

impl VoteChange {
    pub fn compute(previous: Option<VoteDirection>, requested: VoteDirection) -> VoteChange {
        match previous {
            // Clicking the same arrow again takes the vote back
            Some(p) if p == requested => VoteChange {
                previous,
                current: None,
                delta: -requested.weight(),
            },
            None => VoteChange {
                previous,
                current: Some(requested),
                delta: requested.weight(),
            },
            Some(_) => VoteChange {
                previous,
                current: Some(requested),
                delta: 2 * requested.weight(),
            },
        }
    }
}

/// Something carrying a score and the per-user votes that produced it
pub trait Votable {
    fn score(&self) -> i64;
    fn votes(&self) -> &VoteMap;
    fn score_mut(&mut self) -> &mut i64;
    fn votes_mut(&mut self) -> &mut VoteMap;

    fn vote_of(&self, user: &UserId) -> Option<VoteDirection> {
        self.votes().get(user).copied()
    }

    /// Applies `change` as done by `user` to the local copy
    fn record_vote(&mut self, user: &UserId, change: &VoteChange) {
        *self.score_mut() += change.delta;
        match change.current {
            Some(dir) => {
                self.votes_mut().insert(user.clone(), dir);
            }
            None => {
                self.votes_mut().remove(user);
            }
        }
    }
}
