//! Member directory.
//!
//! The directory is owned by the surrounding application; the ledger core only
//! reads it to validate member ids and to find shareholders.

use crate::types::{MemberId, Shares};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberCategory {
    Shareholder,
    Regular,
    Staff,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub category: MemberCategory,
    pub shares: Shares,
}

impl Member {
    pub fn shareholder(id: MemberId, name: impl Into<String>, shares: Shares) -> Self {
        Self {
            id,
            name: name.into(),
            category: MemberCategory::Shareholder,
            shares,
        }
    }

    pub fn regular(id: MemberId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            category: MemberCategory::Regular,
            shares: Shares::zero(),
        }
    }

    pub fn participates(&self) -> bool {
        self.category == MemberCategory::Shareholder && !self.shares.is_zero()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shareholder {
    pub member_id: MemberId,
    pub shares: Shares,
}

pub trait MemberDirectory: Send + Sync {
    fn member(&self, id: MemberId) -> Option<Member>;

    /// Members in the shareholder category, including zero holdings, ordered by id.
    fn shareholders(&self) -> Vec<Shareholder>;

    fn contains(&self, id: MemberId) -> bool {
        self.member(id).is_some()
    }

    fn total_shares(&self) -> Shares {
        self.shareholders().iter().map(|s| s.shares).sum()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    members: RwLock<BTreeMap<MemberId, Member>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_members(members: impl IntoIterator<Item = Member>) -> Self {
        let directory = Self::new();
        for member in members {
            directory.upsert(member);
        }
        directory
    }

    pub fn upsert(&self, member: Member) {
        let mut members = self.members.write().unwrap_or_else(|e| e.into_inner());
        members.insert(member.id, member);
    }

    pub fn remove(&self, id: MemberId) -> Option<Member> {
        let mut members = self.members.write().unwrap_or_else(|e| e.into_inner());
        members.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.members.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MemberDirectory for InMemoryDirectory {
    fn member(&self, id: MemberId) -> Option<Member> {
        let members = self.members.read().unwrap_or_else(|e| e.into_inner());
        members.get(&id).cloned()
    }

    fn shareholders(&self) -> Vec<Shareholder> {
        let members = self.members.read().unwrap_or_else(|e| e.into_inner());
        members
            .values()
            .filter(|m| m.category == MemberCategory::Shareholder)
            .map(|m| Shareholder {
                member_id: m.id,
                shares: m.shares,
            })
            .collect()
    }
}
